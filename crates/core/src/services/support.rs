//! In-memory port implementations shared by the service tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{SourceError, SourceResult, StoreResult};
use crate::models::{CatalogId, FilterState, MinimalEntry, NameIndexEntry, Record};
use crate::ports::{CatalogSource, NameIndex, RecordStore};

/// HashMap-backed [`RecordStore`] with the same merge-on-put contract as
/// the real adapter.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<CatalogId, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: Record) {
        self.records.lock().unwrap().insert(record.id, record);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: CatalogId) -> StoreResult<Option<Record>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn put(&self, record: &Record) -> StoreResult<()> {
        let mut records = self.records.lock().unwrap();
        let merged = match records.remove(&record.id) {
            Some(existing) => existing.merged_with(record.clone()),
            None => record.clone(),
        };
        records.insert(record.id, merged);
        Ok(())
    }

    async fn len(&self) -> StoreResult<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }
}

/// Scripted [`CatalogSource`] with per-filter index responses, a record
/// table, failure injection and call counters.
#[derive(Default)]
pub struct StubSource {
    index: Mutex<HashMap<FilterState, Vec<MinimalEntry>>>,
    records: Mutex<HashMap<CatalogId, Record>>,
    failing: Mutex<HashSet<CatalogId>>,
    index_delay: Mutex<HashMap<FilterState, Duration>>,
    record_delay: Mutex<Option<Duration>>,
    pub index_calls: AtomicUsize,
    pub record_calls: AtomicUsize,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_index(&self, filter: FilterState, entries: Vec<MinimalEntry>) {
        self.index.lock().unwrap().insert(filter, entries);
    }

    pub fn add_record(&self, record: Record) {
        self.records.lock().unwrap().insert(record.id, record);
    }

    /// Make `fetch_record` fail for `id` with a transient error.
    pub fn fail_record(&self, id: CatalogId) {
        self.failing.lock().unwrap().insert(id);
    }

    /// Delay index responses for one filter (paused-clock tests).
    pub fn delay_index(&self, filter: FilterState, delay: Duration) {
        self.index_delay.lock().unwrap().insert(filter, delay);
    }

    /// Delay every record response (paused-clock tests).
    pub fn delay_records(&self, delay: Duration) {
        *self.record_delay.lock().unwrap() = Some(delay);
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn record_calls(&self) -> usize {
        self.record_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for StubSource {
    async fn fetch_index(&self, filter: &FilterState) -> SourceResult<Vec<MinimalEntry>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.index_delay.lock().unwrap().get(filter).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.index.lock().unwrap().get(filter) {
            Some(entries) => Ok(entries.clone()),
            None => Err(SourceError::RequestFailed("no scripted index".into())),
        }
    }

    async fn fetch_record(&self, id: CatalogId) -> SourceResult<Option<Record>> {
        self.record_calls.fetch_add(1, Ordering::SeqCst);
        // Force a suspension point so concurrent callers interleave the way
        // they would against a real network.
        tokio::task::yield_now().await;
        let delay = *self.record_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(&id) {
            return Err(SourceError::RequestFailed(format!("injected failure for {id}")));
        }
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }
}

/// Fixed-content [`NameIndex`].
pub struct StaticEntries(pub Vec<NameIndexEntry>);

impl NameIndex for StaticEntries {
    fn entries(&self) -> &[NameIndexEntry] {
        &self.0
    }
}

/// Minimal entry with a derived name, e.g. `entry(7)` -> "Mon-7".
pub fn entry(id: u32) -> MinimalEntry {
    MinimalEntry {
        id: CatalogId(id),
        name: format!("Mon-{id}"),
        image: None,
    }
}

pub fn entries(ids: &[u32]) -> Vec<MinimalEntry> {
    ids.iter().map(|&id| entry(id)).collect()
}

/// Full record matching `entry(id)`'s name.
pub fn full_record(id: u32) -> Record {
    let mut record = Record::partial(
        CatalogId(id),
        format!("Mon-{id}"),
        Some(format!("https://img.example/{id}.png")),
        Utc::now(),
    );
    record.levels = Some(vec![]);
    record.types = Some(vec![]);
    record.attributes = Some(vec![]);
    record.fields = Some(vec![]);
    record.descriptions = Some(vec![]);
    record.skills = Some(vec![]);
    record.prior_evolutions = Some(vec![]);
    record.next_evolutions = Some(vec![]);
    record
}

/// A source pre-loaded with full records for every id in `ids`.
pub fn source_with_records(ids: &[u32]) -> StubSource {
    let source = StubSource::new();
    for &id in ids {
        source.add_record(full_record(id));
    }
    source
}
