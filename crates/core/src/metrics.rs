//! Metrics definitions for the catalog loader.
//!
//! This module defines all metrics used throughout the loader.
//! Metrics are collected using the `metrics` crate and can be exported
//! to Prometheus via `metrics-exporter-prometheus`.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Initialize all metric descriptions.
/// Call this once at startup before any metrics are recorded.
pub fn init_metrics() {
    describe_counter!(
        "cache_hits_total",
        "Total number of record lookups satisfied from the persistent store"
    );
    describe_counter!(
        "cache_misses_total",
        "Total number of record lookups that required a remote fetch"
    );
    describe_counter!(
        "records_fetched_total",
        "Total number of records successfully fetched from the remote catalog"
    );
    describe_counter!(
        "record_fetch_failures_total",
        "Total number of record fetches dropped (not found or transient failure)"
    );
    describe_counter!(
        "pages_loaded_total",
        "Total number of index pages merged into the loaded set"
    );
    describe_counter!(
        "index_fetches_total",
        "Total number of minimal index (re)computations"
    );
    describe_counter!(
        "stale_results_discarded_total",
        "Total number of superseded page or index results thrown away"
    );
    describe_counter!(
        "search_resolutions_total",
        "Total number of debounced search queries that fired"
    );
    describe_histogram!(
        "page_load_duration_seconds",
        "Time taken to resolve and merge one index page in seconds"
    );
}

/// Record a store hit during batch resolution.
pub fn record_cache_hit() {
    counter!("cache_hits_total").increment(1);
}

/// Record a store miss during batch resolution.
pub fn record_cache_miss() {
    counter!("cache_misses_total").increment(1);
}

/// Record a successful remote record fetch.
pub fn record_record_fetched() {
    counter!("records_fetched_total").increment(1);
}

/// Record a dropped record fetch.
///
/// # Arguments
/// * `reason` - Why the unit was dropped ("not_found" or "transient")
pub fn record_fetch_failure(reason: &str) {
    counter!("record_fetch_failures_total", "reason" => reason.to_string()).increment(1);
}

/// Record a page merged into the loaded set.
pub fn record_page_loaded() {
    counter!("pages_loaded_total").increment(1);
}

/// Record a minimal index (re)computation.
pub fn record_index_fetch() {
    counter!("index_fetches_total").increment(1);
}

/// Record a stale page or index result being discarded.
///
/// # Arguments
/// * `kind` - What was discarded ("page" or "index")
pub fn record_stale_discarded(kind: &str) {
    counter!("stale_results_discarded_total", "kind" => kind.to_string()).increment(1);
}

/// Record a debounced search query firing.
pub fn record_search_resolution() {
    counter!("search_resolutions_total").increment(1);
}

/// Record page load duration.
pub fn record_page_load_duration(duration_secs: f64) {
    histogram!("page_load_duration_seconds").record(duration_secs);
}

/// A timer that automatically records page load duration when dropped.
pub struct PageLoadTimer {
    start: Instant,
}

impl PageLoadTimer {
    /// Start a new page load timer.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for PageLoadTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PageLoadTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_page_load_duration(duration);
    }
}
