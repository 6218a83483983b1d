//! Filter controller - recomputes the minimal index when criteria change.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::metrics::{record_index_fetch, record_stale_discarded};
use crate::models::FilterState;
use crate::ports::CatalogSource;
use crate::services::Paginator;

/// Recomputes the minimal index on filter changes and resets the pagination
/// engine with the result.
///
/// Concurrent changes are serialized by an epoch token: only the most
/// recently initiated index fetch may reset the paginator; a superseded
/// in-flight fetch discards its result.
pub struct FilterController {
    source: Arc<dyn CatalogSource>,
    pager: Arc<Paginator>,
    epoch: AtomicU64,
    in_flight: AtomicUsize,
}

impl FilterController {
    pub fn new(source: Arc<dyn CatalogSource>, pager: Arc<Paginator>) -> Self {
        Self {
            source,
            pager,
            epoch: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Apply new filter criteria: fetch the matching minimal index and,
    /// unless superseded meanwhile, reset the paginator with it.
    ///
    /// An index fetch failure is surfaced as an empty index — the loader
    /// lands in the exhausted state and the view shows no results, it never
    /// crashes.
    #[instrument(skip(self))]
    pub async fn apply(&self, filter: FilterState) {
        let token = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        record_index_fetch();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let index = match self.source.fetch_index(&filter).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Index fetch failed, presenting an empty index");
                Vec::new()
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.epoch.load(Ordering::SeqCst) != token {
            debug!(token, "Discarding superseded index result");
            record_stale_discarded("index");
            return;
        }

        debug!(entries = index.len(), "Applying new minimal index");
        self.pager.reset(index).await;
    }

    /// Number of index fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Attribute, Level};
    use crate::services::support::{entries, source_with_records, MemoryStore};
    use crate::services::Reconciler;
    use std::collections::HashSet;
    use std::time::Duration;

    fn filter(attribute: Option<Attribute>, level: Option<Level>) -> FilterState {
        FilterState { attribute, level }
    }

    fn controller(record_ids: &[u32]) -> (Arc<FilterController>, Arc<Paginator>, Arc<crate::services::support::StubSource>) {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(source_with_records(record_ids));
        let reconciler = Arc::new(Reconciler::new(store, source.clone()));
        let pager = Arc::new(Paginator::new(reconciler, 30));
        let controller = Arc::new(FilterController::new(source.clone(), Arc::clone(&pager)));
        (controller, pager, source)
    }

    #[tokio::test]
    async fn filter_change_clears_and_repopulates() {
        let (controller, pager, source) = controller(&[1, 2, 3, 4]);
        let data_only = filter(Some(Attribute::Data), None);
        let data_adult = filter(Some(Attribute::Data), Some(Level::Adult));
        source.set_index(data_only, entries(&[1, 2, 3]));
        source.set_index(data_adult, entries(&[4]));

        controller.apply(data_only).await;
        assert_eq!(pager.loaded().len(), 3);

        controller.apply(data_adult).await;

        let ids: HashSet<u32> = pager.loaded_ids().iter().map(|id| id.value()).collect();
        assert_eq!(ids, HashSet::from([4]));
        assert_eq!(pager.page(), 1);
        assert_eq!(source.index_calls(), 2);
    }

    #[tokio::test]
    async fn index_fetch_failure_presents_an_empty_index() {
        let (controller, pager, _source) = controller(&[]);
        // No scripted index: the stub fails the query.

        controller.apply(FilterState::default()).await;

        assert!(pager.is_exhausted());
        assert_eq!(pager.loaded().len(), 0);
    }

    // Filter change A then B: only B's index may ever reach the paginator,
    // regardless of network completion order.
    #[tokio::test(start_paused = true)]
    async fn superseded_index_fetch_never_resets_the_paginator() {
        let (controller, pager, source) = controller(&[1, 2, 9]);
        let slow = filter(Some(Attribute::Virus), None);
        let fast = filter(Some(Attribute::Data), None);
        source.set_index(slow, entries(&[1, 2]));
        source.set_index(fast, entries(&[9]));
        source.delay_index(slow, Duration::from_millis(200));

        let slow_apply = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move { controller.apply(slow).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.apply(fast).await;
        slow_apply.await.unwrap();

        let ids: HashSet<u32> = pager.loaded_ids().iter().map(|id| id.value()).collect();
        assert_eq!(ids, HashSet::from([9]));
    }
}
