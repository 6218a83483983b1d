//! Error types for the catalog loader domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`StoreError`] - Persistent record store errors
//! - [`SourceError`] - Remote catalog API errors
//! - [`CatalogError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations, allowing `?`
//! to work across layer boundaries.
//!
//! Policy reminder: an individual record fetch failing is *not* an error at
//! the batch level — the reconciler drops the unit and moves on. These types
//! exist for the adapters to report precisely what went wrong, not to abort
//! the view.

use thiserror::Error;

// =============================================================================
// Store Errors
// =============================================================================

/// Persistent record store errors.
///
/// These errors originate from cache operations: connection handling,
/// queries, migrations, and payload (de)serialization.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to open or connect to the backing store.
    #[error("Store connection error: {0}")]
    ConnectionError(String),

    /// Query execution failed.
    #[error("Store query error: {0}")]
    QueryError(String),

    /// Schema migration failed.
    #[error("Store migration error: {0}")]
    MigrationError(String),

    /// Record payload could not be serialized for storage.
    #[error("Store serialization error: {0}")]
    SerializationError(String),

    /// A stored payload failed to parse.
    ///
    /// Callers treat the entry as absent; this variant exists so the
    /// adapter can log what it skipped.
    #[error("Corrupt cache entry for id {id}: {message}")]
    CorruptEntry { id: u32, message: String },
}

// =============================================================================
// Source Errors
// =============================================================================

/// Remote catalog API errors.
///
/// These errors occur when talking to the catalog service over HTTP.
/// A definitive "not found" is *not* an error — `fetch_record` reports it
/// as `Ok(None)`.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The request could not be sent or the connection dropped.
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The service answered with a non-success status on an index query.
    #[error("Index query returned status {status}")]
    IndexStatus { status: u16 },

    /// A response body could not be parsed.
    #[error("Response parse error: {0}")]
    ParseError(String),
}

// =============================================================================
// Catalog Errors
// =============================================================================

/// Top-level catalog view errors.
///
/// Wraps the adapter errors and adds orchestration-specific variants.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Persistent store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Remote catalog error.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for remote catalog operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for catalog view operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;

    // The conversion chain lets `?` cross layers without explicit mapping.
    #[test]
    fn error_conversion_chain() {
        let store_err = StoreError::QueryError("db failed".into());
        let catalog_err: CatalogError = store_err.into();
        assert!(catalog_err.to_string().contains("db failed"));

        let source_err = SourceError::RequestFailed("timeout".into());
        let catalog_err: CatalogError = source_err.into();
        assert!(catalog_err.to_string().contains("timeout"));
    }

    // Corrupt entries must carry the id so the skip can be traced back to
    // one cache row.
    #[test]
    fn corrupt_entry_includes_id() {
        let err = StoreError::CorruptEntry {
            id: 42,
            message: "unexpected end of input".into(),
        };
        assert!(err.to_string().contains("42"));
    }
}
