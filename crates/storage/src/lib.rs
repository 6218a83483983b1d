//! Storage layer for the digidex catalog loader.
//!
//! This crate provides the SQLite implementation of the [`RecordStore`]
//! port defined in `digidex-core`. It handles connection pooling,
//! migrations, and the merge-on-put cache contract.
//!
//! # Architecture
//!
//! - [`sqlite::Database`] - Connection pool management
//! - [`sqlite::SqliteRecordStore`] - The record cache itself
//!
//! # Usage
//!
//! ```ignore
//! use digidex_storage::{Database, DatabaseConfig, SqliteRecordStore};
//!
//! let config = DatabaseConfig::from_env();
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let store = Arc::new(SqliteRecordStore::new(&db));
//! ```
//!
//! [`RecordStore`]: digidex_core::ports::RecordStore

pub mod sqlite;

pub use sqlite::{Database, DatabaseConfig, PurgeStats, SqliteRecordStore};
