//! Cache reconciler - resolves identifier batches against cache-then-remote.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::metrics::{
    record_cache_hit, record_cache_miss, record_fetch_failure, record_record_fetched,
};
use crate::models::{CatalogId, Record};
use crate::ports::{CatalogSource, RecordStore};

/// Resolves batches of catalog identifiers, probing the persistent store
/// first and fanning out remote fetches for the misses.
///
/// Every successful remote fetch is written back to the store before being
/// returned (write-through). The reconciler is stateless across calls except
/// through the store; deduplication against the loaded set is the caller's
/// responsibility.
pub struct Reconciler {
    store: Arc<dyn RecordStore>,
    source: Arc<dyn CatalogSource>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn RecordStore>, source: Arc<dyn CatalogSource>) -> Self {
        Self { store, source }
    }

    /// Resolve a batch of identifiers into records, preserving input order.
    ///
    /// Store probes run first; all misses are then fetched concurrently.
    /// Units that come back absent or fail are dropped silently — an
    /// individual failure never aborts the batch. The id was never written,
    /// so the next trigger naturally re-attempts it.
    #[instrument(skip_all, fields(requested = ids.len()))]
    pub async fn resolve(&self, ids: &[CatalogId]) -> Vec<Record> {
        let mut resolved: HashMap<CatalogId, Record> = HashMap::with_capacity(ids.len());
        let mut misses: Vec<CatalogId> = Vec::new();

        for &id in ids {
            if resolved.contains_key(&id) || misses.contains(&id) {
                continue;
            }
            match self.store.get(id).await {
                Ok(Some(record)) => {
                    record_cache_hit();
                    resolved.insert(id, record);
                }
                Ok(None) => {
                    record_cache_miss();
                    misses.push(id);
                }
                Err(e) => {
                    warn!(%id, error = %e, "Cache probe failed, treating as miss");
                    record_cache_miss();
                    misses.push(id);
                }
            }
        }

        if !misses.is_empty() {
            debug!(
                hits = resolved.len(),
                misses = misses.len(),
                "Fetching missing records"
            );
            let fetched = join_all(misses.iter().map(|&id| self.fetch_and_store(id))).await;
            for record in fetched.into_iter().flatten() {
                resolved.insert(record.id, record);
            }
        }

        ids.iter().filter_map(|id| resolved.remove(id)).collect()
    }

    /// Detail-display path: return the stored record if it already carries
    /// every full-tier field; otherwise fetch the full record, merge it with
    /// whatever was cached, write the merge through and return it.
    ///
    /// On a failed fetch the cached fragment (if any) is still returned —
    /// a partial record beats nothing for the caller.
    #[instrument(skip(self))]
    pub async fn ensure_full(&self, id: CatalogId) -> Option<Record> {
        let cached = match self.store.get(id).await {
            Ok(found) => found,
            Err(e) => {
                warn!(%id, error = %e, "Cache probe failed, treating as miss");
                None
            }
        };

        if let Some(record) = &cached
            && record.is_full()
        {
            record_cache_hit();
            return cached;
        }
        record_cache_miss();

        match self.source.fetch_record(id).await {
            Ok(Some(fetched)) => {
                let merged = match cached {
                    Some(existing) => existing.merged_with(fetched),
                    None => fetched,
                };
                if let Err(e) = self.store.put(&merged).await {
                    warn!(%id, error = %e, "Write-back failed, returning record anyway");
                }
                record_record_fetched();
                Some(merged)
            }
            Ok(None) => {
                debug!(%id, "Remote reports record missing");
                record_fetch_failure("not_found");
                cached
            }
            Err(e) => {
                debug!(%id, error = %e, "Record fetch failed");
                record_fetch_failure("transient");
                cached
            }
        }
    }

    /// Fetch one record and write it through to the store.
    async fn fetch_and_store(&self, id: CatalogId) -> Option<Record> {
        match self.source.fetch_record(id).await {
            Ok(Some(record)) => {
                if let Err(e) = self.store.put(&record).await {
                    warn!(%id, error = %e, "Write-back failed, returning record anyway");
                }
                record_record_fetched();
                Some(record)
            }
            Ok(None) => {
                debug!(%id, "Remote reports record missing");
                record_fetch_failure("not_found");
                None
            }
            Err(e) => {
                debug!(%id, error = %e, "Record fetch failed, dropping unit");
                record_fetch_failure("transient");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::support::{full_record, source_with_records, MemoryStore, StubSource};
    use chrono::Utc;
    use crate::models::Record;

    fn ids(raw: &[u32]) -> Vec<CatalogId> {
        raw.iter().map(|&id| CatalogId(id)).collect()
    }

    #[tokio::test]
    async fn cached_records_are_not_refetched() {
        let store = Arc::new(MemoryStore::new());
        store.insert(full_record(1));
        let source = Arc::new(source_with_records(&[1, 2]));
        let reconciler = Reconciler::new(store, source.clone());

        let records = reconciler.resolve(&ids(&[1, 2])).await;

        assert_eq!(records.len(), 2);
        // Only the miss went to the remote.
        assert_eq!(source.record_calls(), 1);
    }

    #[tokio::test]
    async fn fetched_records_are_written_back() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(source_with_records(&[5]));
        let reconciler = Reconciler::new(store.clone(), source);

        reconciler.resolve(&ids(&[5])).await;

        let stored = store.get(CatalogId(5)).await.unwrap();
        assert!(stored.is_some_and(|r| r.name == "Mon-5"));
    }

    #[tokio::test]
    async fn failed_units_are_dropped_without_failing_the_batch() {
        let store = Arc::new(MemoryStore::new());
        let source = source_with_records(&[1, 3]);
        source.fail_record(CatalogId(2));
        let reconciler = Reconciler::new(store.clone(), Arc::new(source));

        let records = reconciler.resolve(&ids(&[1, 2, 3, 4])).await;

        // 2 failed transiently, 4 is definitively absent; both are dropped.
        let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Mon-1", "Mon-3"]);
        // Neither dropped id was written, so the next trigger re-attempts.
        assert!(store.get(CatalogId(2)).await.unwrap().is_none());
        assert!(store.get(CatalogId(4)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolve_preserves_input_order() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(source_with_records(&[8, 2, 5]));
        let reconciler = Reconciler::new(store, source);

        let records = reconciler.resolve(&ids(&[8, 2, 5])).await;

        let out: Vec<u32> = records.iter().map(|r| r.id.value()).collect();
        assert_eq!(out, vec![8, 2, 5]);
    }

    #[tokio::test]
    async fn ensure_full_upgrades_a_partial_record() {
        let store = Arc::new(MemoryStore::new());
        store.insert(Record::partial(
            CatalogId(5),
            "Mon-5",
            Some("grid.png".into()),
            Utc::now(),
        ));
        let source = Arc::new(source_with_records(&[5]));
        let reconciler = Reconciler::new(store.clone(), source.clone());

        let record = reconciler.ensure_full(CatalogId(5)).await.unwrap();

        assert!(record.is_full());
        assert_eq!(source.record_calls(), 1);
        // The merge was written through.
        let stored = store.get(CatalogId(5)).await.unwrap().unwrap();
        assert!(stored.is_full());
    }

    #[tokio::test]
    async fn ensure_full_serves_a_full_record_from_the_store() {
        let store = Arc::new(MemoryStore::new());
        store.insert(full_record(5));
        let source = Arc::new(StubSource::new());
        let reconciler = Reconciler::new(store, source.clone());

        let record = reconciler.ensure_full(CatalogId(5)).await.unwrap();

        assert!(record.is_full());
        assert_eq!(source.record_calls(), 0);
    }

    #[tokio::test]
    async fn ensure_full_falls_back_to_the_cached_fragment_on_failure() {
        let store = Arc::new(MemoryStore::new());
        store.insert(Record::partial(CatalogId(9), "Mon-9", None, Utc::now()));
        let source = StubSource::new();
        source.fail_record(CatalogId(9));
        let reconciler = Reconciler::new(store, Arc::new(source));

        let record = reconciler.ensure_full(CatalogId(9)).await.unwrap();

        assert_eq!(record.name, "Mon-9");
        assert!(!record.is_full());
    }
}
