//! Remote catalog adapter for the digidex catalog loader.
//!
//! This crate implements the [`CatalogSource`] port against the catalog's
//! REST API over `reqwest`, and loads the static name-index asset that
//! backs offline search-candidate computation.
//!
//! # Architecture
//!
//! - [`HttpCatalogClient`] - Minimal index queries (with the combined-filter
//!   fallback intersection) and full-record fetches
//! - [`StaticNameIndex`] - The `{id, name}` directory loaded from disk
//!
//! [`CatalogSource`]: digidex_core::ports::CatalogSource

mod client;
mod name_index;

pub use client::{CatalogClientConfig, HttpCatalogClient};
pub use name_index::StaticNameIndex;
