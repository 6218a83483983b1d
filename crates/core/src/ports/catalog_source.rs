//! Port trait for the remote catalog service.
//!
//! This trait defines the interface for fetching the minimal index and
//! individual full records. Implementations live in the infrastructure
//! layer (e.g. `digidex-client`).

use async_trait::async_trait;

use crate::error::SourceResult;
use crate::models::{CatalogId, FilterState, MinimalEntry, Record};

/// Remote source of the minimal index and of full catalog records.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the minimal index for the given filter criteria.
    ///
    /// With both criteria set the implementation first attempts a single
    /// combined-criteria query; an empty result (or a query error, which is
    /// treated identically) falls back to two single-criteria queries whose
    /// results are intersected by id. With one criterion set a single
    /// filtered query is issued; with none, an unfiltered one.
    async fn fetch_index(&self, filter: &FilterState) -> SourceResult<Vec<MinimalEntry>>;

    /// Fetch the full record for `id`.
    ///
    /// `Ok(None)` means the remote definitively reports the record missing —
    /// a terminal negative, not a transient failure. Transport and parse
    /// failures surface as `Err`; callers treat them like "no data yet",
    /// never as fatal for the whole view.
    async fn fetch_record(&self, id: CatalogId) -> SourceResult<Option<Record>>;
}
