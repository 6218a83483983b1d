//! Catalog view facade - the surface the presentation layer binds to.

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use crate::models::{CatalogId, FilterState, Record};
use crate::ports::{CatalogSource, NameIndex, RecordStore};
use crate::services::{
    FilterController, Paginator, Reconciler, SearchController, DEFAULT_DEBOUNCE,
    DEFAULT_PAGE_SIZE,
};

/// Tunables for one catalog view instance.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Minimal-index entries resolved per page.
    pub page_size: usize,
    /// Debounce window after the last search keystroke.
    pub debounce: Duration,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// One logical "catalog view": the loaded set, cursor, minimal index and
/// filter state live here and are recreated when the view is torn down.
/// The persistent record store outlives it.
///
/// # Flow
///
/// 1. [`CatalogView::init`] fetches the unfiltered index and eagerly loads
///    the first page
/// 2. A scroll-proximity signal calls [`CatalogView::load_next_page`]
/// 3. Keystrokes go to [`CatalogView::set_search_term`]; matches the
///    paginator has not reached yet merge in additively
/// 4. [`CatalogView::set_filter`] swaps the minimal index and restarts
///    pagination
/// 5. [`CatalogView::visible`] is the pure display projection over the
///    loaded set
pub struct CatalogView {
    reconciler: Arc<Reconciler>,
    pager: Arc<Paginator>,
    filter: FilterController,
    search: Arc<SearchController>,
}

impl CatalogView {
    /// Wire a view over its collaborators.
    pub fn new(
        store: Arc<dyn RecordStore>,
        source: Arc<dyn CatalogSource>,
        name_index: Arc<dyn NameIndex>,
        config: ViewConfig,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(store, Arc::clone(&source)));
        let pager = Arc::new(Paginator::new(Arc::clone(&reconciler), config.page_size));
        let filter = FilterController::new(source, Arc::clone(&pager));
        let search = Arc::new(SearchController::new(
            name_index,
            Arc::clone(&reconciler),
            Arc::clone(&pager),
            config.debounce,
        ));
        Self {
            reconciler,
            pager,
            filter,
            search,
        }
    }

    /// Load the unfiltered minimal index and the first page.
    #[instrument(skip(self))]
    pub async fn init(&self) {
        self.filter.apply(FilterState::default()).await;
    }

    /// Apply new filter criteria (clears the loaded set and cursor before
    /// repopulating from the recomputed index).
    pub async fn set_filter(&self, filter: FilterState) {
        self.filter.apply(filter).await;
    }

    /// Feed a search keystroke into the debouncer.
    pub fn set_search_term(&self, term: &str) {
        self.search.set_term(term);
    }

    /// Resolve a search term immediately, bypassing the debounce window
    /// (e.g. an explicit submit).
    pub async fn search_now(&self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            return;
        }
        self.search.run_query(term).await;
    }

    /// Scroll-proximity trigger. Returns true when a page was merged.
    pub async fn load_next_page(&self) -> bool {
        self.pager.load_next_page().await
    }

    /// Detail-display path for a single record.
    pub async fn detail(&self, id: CatalogId) -> Option<Record> {
        self.reconciler.ensure_full(id).await
    }

    /// The loaded set, unordered.
    pub fn loaded(&self) -> Vec<Record> {
        self.pager.loaded()
    }

    /// Display projection: entries matching `term` (case-insensitive
    /// substring on name, or exact stringified id), ordered by name
    /// case-insensitively. Recomputed from the full loaded set on every
    /// call; never mutates it.
    pub fn visible(&self, term: &str) -> Vec<Record> {
        let term = term.trim();
        let needle = term.to_lowercase();
        let mut records: Vec<Record> = self
            .pager
            .loaded()
            .into_iter()
            .filter(|r| {
                needle.is_empty()
                    || r.name.to_lowercase().contains(&needle)
                    || r.id.to_string() == term
            })
            .collect();
        records.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        records
    }

    /// True while any page or index fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.pager.is_fetching() || self.filter.in_flight() > 0
    }

    /// True when the current index has been fully paged through.
    pub fn is_exhausted(&self) -> bool {
        self.pager.is_exhausted()
    }

    /// Size of the current minimal index.
    pub fn index_len(&self) -> usize {
        self.pager.index_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NameIndexEntry;
    use crate::services::support::{entries, source_with_records, MemoryStore, StaticEntries};

    fn view(record_ids: &[u32], index_ids: &[u32]) -> CatalogView {
        let source = source_with_records(record_ids);
        source.set_index(FilterState::default(), entries(index_ids));
        let name_index = StaticEntries(
            record_ids
                .iter()
                .map(|&id| NameIndexEntry {
                    id: CatalogId(id),
                    name: format!("Mon-{id}"),
                })
                .collect(),
        );
        CatalogView::new(
            Arc::new(MemoryStore::new()),
            Arc::new(source),
            Arc::new(name_index),
            ViewConfig {
                page_size: 2,
                debounce: DEFAULT_DEBOUNCE,
            },
        )
    }

    #[tokio::test]
    async fn init_populates_the_first_page() {
        let view = view(&[1, 2, 3], &[1, 2, 3]);

        view.init().await;

        assert_eq!(view.loaded().len(), 2);
        assert!(!view.is_loading());
        assert_eq!(view.index_len(), 3);
    }

    #[tokio::test]
    async fn visible_is_a_sorted_projection_of_the_loaded_set() {
        let view = view(&[2, 10, 1], &[2, 10, 1]);
        view.init().await;
        view.load_next_page().await;

        let all = view.visible("");
        let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
        // "Mon-1" < "Mon-10" < "Mon-2" case-insensitively.
        assert_eq!(names, vec!["Mon-1", "Mon-10", "Mon-2"]);

        // Filtering hides without mutating.
        let by_id = view.visible("10");
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].id, CatalogId(10));
        assert_eq!(view.loaded().len(), 3);
    }

    #[tokio::test]
    async fn detail_returns_a_full_record() {
        let view = view(&[4], &[4]);

        let record = view.detail(CatalogId(4)).await.unwrap();

        assert!(record.is_full());
    }
}
