//! Pagination engine - owns the minimal index, the page cursor and the
//! loaded set.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument, trace};

use crate::metrics::{record_page_loaded, record_stale_discarded, PageLoadTimer};
use crate::models::{CatalogId, MinimalEntry, Record};
use crate::services::Reconciler;

/// Default number of minimal-index entries resolved per page.
pub const DEFAULT_PAGE_SIZE: usize = 30;

/// Mutable pagination state, guarded by one mutex that is never held
/// across an await.
struct PagerState {
    /// Read-only ordered minimal index for the current filter configuration.
    index: Arc<Vec<MinimalEntry>>,
    /// Bumped every time the index is replaced; a page load compares the
    /// generation it was issued against before merging.
    generation: u64,
    /// Next page to request. Monotonically non-decreasing within one
    /// generation; reset to 0 exactly when the index is replaced.
    page: usize,
    /// Fetch guard: at most one in-flight page load. A trigger arriving
    /// while held is dropped, not queued.
    fetching: bool,
    /// The loaded set. No duplicate identifiers; membership only grows
    /// within one generation.
    loaded: HashMap<CatalogId, Record>,
}

/// State machine `Idle -> Fetching -> Idle` advancing a cursor over the
/// minimal index and materializing records into the loaded set.
///
/// The engine does not own scroll detection; an external observer calls
/// [`Paginator::load_next_page`] when the viewport nears the bottom.
pub struct Paginator {
    reconciler: Arc<Reconciler>,
    page_size: usize,
    state: Mutex<PagerState>,
}

impl Paginator {
    pub fn new(reconciler: Arc<Reconciler>, page_size: usize) -> Self {
        Self {
            reconciler,
            page_size,
            state: Mutex::new(PagerState {
                index: Arc::new(Vec::new()),
                generation: 0,
                page: 0,
                fetching: false,
                loaded: HashMap::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the next page of the minimal index into the loaded set.
    ///
    /// Returns `false` without fetching when the guard is held or the index
    /// is exhausted. A completion whose generation was superseded by a
    /// reset discards its results and leaves the new state untouched.
    #[instrument(skip(self))]
    pub async fn load_next_page(&self) -> bool {
        let (generation, ids) = {
            let mut state = self.state();
            if state.fetching {
                trace!("Page fetch already in flight, dropping trigger");
                return false;
            }
            let start = state.page * self.page_size;
            if start >= state.index.len() {
                trace!("Minimal index exhausted");
                return false;
            }
            state.fetching = true;
            let end = (start + self.page_size).min(state.index.len());
            let ids: Vec<CatalogId> = state.index[start..end].iter().map(|e| e.id).collect();
            (state.generation, ids)
        };

        // Releases the guard if this future is dropped mid-flight, so a
        // cancelled load cannot wedge the engine in Fetching.
        let mut release = GuardRelease {
            pager: self,
            generation,
            armed: true,
        };

        let _timer = PageLoadTimer::new();
        let records = self.reconciler.resolve(&ids).await;

        release.armed = false;
        let mut state = self.state();
        if state.generation != generation {
            debug!(
                issued = generation,
                current = state.generation,
                "Discarding stale page result"
            );
            record_stale_discarded("page");
            return false;
        }

        let mut added = 0usize;
        for record in records {
            if let std::collections::hash_map::Entry::Vacant(slot) = state.loaded.entry(record.id)
            {
                slot.insert(record);
                added += 1;
            }
        }
        state.page += 1;
        state.fetching = false;
        record_page_loaded();
        debug!(
            page = state.page,
            added,
            loaded = state.loaded.len(),
            "Page merged into loaded set"
        );
        true
    }

    /// Replace the minimal index after a filter change.
    ///
    /// Clears the loaded set and cursor, releases the guard, bumps the
    /// generation (so any in-flight load lands stale) and eagerly loads the
    /// first page. Re-entrant safe: a later reset wins over this one's
    /// eager load through the same generation check.
    #[instrument(skip_all, fields(entries = index.len()))]
    pub async fn reset(&self, index: Vec<MinimalEntry>) {
        {
            let mut state = self.state();
            state.index = Arc::new(index);
            state.generation += 1;
            state.page = 0;
            state.fetching = false;
            state.loaded.clear();
            debug!(generation = state.generation, "Pagination state reset");
        }
        self.load_next_page().await;
    }

    /// Merge ad-hoc resolved records into the loaded set, skipping ids
    /// already present. Never removes entries and never touches the cursor.
    pub fn merge_additive(&self, records: Vec<Record>) {
        let mut state = self.state();
        for record in records {
            state.loaded.entry(record.id).or_insert(record);
        }
    }

    /// Snapshot of the loaded set, in no particular order.
    pub fn loaded(&self) -> Vec<Record> {
        self.state().loaded.values().cloned().collect()
    }

    /// Identifiers currently in the loaded set.
    pub fn loaded_ids(&self) -> HashSet<CatalogId> {
        self.state().loaded.keys().copied().collect()
    }

    pub fn contains(&self, id: CatalogId) -> bool {
        self.state().loaded.contains_key(&id)
    }

    /// True while a page fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        self.state().fetching
    }

    /// True when every index entry has been requested. Terminal for the
    /// current filter configuration until the index is replaced.
    pub fn is_exhausted(&self) -> bool {
        let state = self.state();
        state.page * self.page_size >= state.index.len()
    }

    pub fn page(&self) -> usize {
        self.state().page
    }

    pub fn index_len(&self) -> usize {
        self.state().index.len()
    }
}

/// Cancellation guard for an in-flight page load: clears the fetch flag on
/// drop unless the load completed normally or a reset already superseded
/// its generation.
struct GuardRelease<'a> {
    pager: &'a Paginator,
    generation: u64,
    armed: bool,
}

impl Drop for GuardRelease<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.pager.state();
        if state.generation == self.generation {
            state.fetching = false;
        }
    }
}
