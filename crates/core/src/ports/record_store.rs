//! Port trait for the persistent record store.
//!
//! This trait defines the cache interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g. `digidex-storage`).

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::models::{CatalogId, Record};

/// Durable key→value store of catalog records, surviving process restarts.
///
/// There is no delete operation, no capacity limit and no expiry: the cache
/// is unbounded and write-only-grows for the lifetime of the backing medium.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up the record stored for `id`.
    ///
    /// A stored entry that fails to parse is treated as absent: the
    /// implementation logs the skip and returns `Ok(None)` rather than
    /// failing the lookup.
    async fn get(&self, id: CatalogId) -> StoreResult<Option<Record>>;

    /// Persist a newly fetched record fragment.
    ///
    /// This is a merge, not an overwrite: the implementation reconciles the
    /// fragment with any existing entry for the same id via
    /// [`Record::merged_with`], so a full record is never downgraded by a
    /// later partial write.
    async fn put(&self, record: &Record) -> StoreResult<()>;

    /// Number of records currently cached.
    async fn len(&self) -> StoreResult<u64>;
}
