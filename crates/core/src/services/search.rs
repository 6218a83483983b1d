//! Search controller - debounced free-text lookup against the static name
//! index.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace};

use crate::metrics::record_search_resolution;
use crate::models::CatalogId;
use crate::ports::NameIndex;
use crate::services::{Paginator, Reconciler};

/// Default debounce window after the last keystroke.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Debounces free-text input, computes candidate identifiers from the
/// static name index and surfaces matches the pagination engine has not
/// reached yet.
///
/// Search is strictly additive: resolved matches merge into the loaded set
/// and nothing is ever removed by typing or clearing the term. Hiding
/// non-matching entries is a display-time projection, not a mutation.
pub struct SearchController {
    name_index: Arc<dyn NameIndex>,
    reconciler: Arc<Reconciler>,
    pager: Arc<Paginator>,
    debounce: Duration,
    /// Handle of the pending debounced query, if any. Each keystroke aborts
    /// it and schedules a fresh one — a handle, not a boolean, so
    /// cancellation cannot race the firing.
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchController {
    pub fn new(
        name_index: Arc<dyn NameIndex>,
        reconciler: Arc<Reconciler>,
        pager: Arc<Paginator>,
        debounce: Duration,
    ) -> Self {
        Self {
            name_index,
            reconciler,
            pager,
            debounce,
            pending: Mutex::new(None),
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// React to a keystroke: cancel any pending query and, unless the term
    /// is blank, schedule a new one after the debounce window.
    ///
    /// Clearing the term performs no fetch and does not shrink the loaded
    /// set.
    pub fn set_term(self: &Arc<Self>, term: &str) {
        let mut pending = self.pending();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let term = term.trim().to_string();
        if term.is_empty() {
            trace!("Search term cleared, nothing scheduled");
            return;
        }

        let controller = Arc::clone(self);
        let debounce = self.debounce;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            controller.run_query(&term).await;
        }));
    }

    /// Resolve a search term immediately (the debounced task lands here).
    ///
    /// Candidates are name-index entries whose name contains the term
    /// case-insensitively, or whose stringified id equals it exactly.
    /// Identifiers already in the loaded set are excluded before resolving.
    #[instrument(skip(self))]
    pub async fn run_query(&self, term: &str) {
        record_search_resolution();
        let needle = term.to_lowercase();
        let already_loaded = self.pager.loaded_ids();

        let candidates: Vec<CatalogId> = self
            .name_index
            .entries()
            .iter()
            .filter(|e| e.name.to_lowercase().contains(&needle) || e.id.to_string() == term)
            .map(|e| e.id)
            .filter(|id| !already_loaded.contains(id))
            .collect();

        if candidates.is_empty() {
            trace!("No unseen candidates for term");
            return;
        }

        debug!(candidates = candidates.len(), "Resolving search candidates");
        let records = self.reconciler.resolve(&candidates).await;
        self.pager.merge_additive(records);
    }
}
