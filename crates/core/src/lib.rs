//! Core domain layer for the digidex catalog loader.
//!
//! This crate contains the domain models, port traits (interfaces), and
//! business logic services for the incremental catalog loader and cache
//! reconciler. It follows hexagonal architecture principles - this is the
//! innermost layer with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     digidex (binary)                        │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │       digidex-client         │       digidex-storage        │
//! │   (remote API, name index)   │       (SQLite cache)         │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │                    digidex-core  ← YOU ARE HERE             │
//! │                 (models, ports, services)                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (Record, MinimalEntry, FilterState, etc.)
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Core business logic (reconciler, paginator, controllers)
//! - [`error`] - Domain error types
//! - [`metrics`] - Metric definitions
//!
//! # Key Concepts
//!
//! ## Ports
//!
//! Ports define interfaces that external adapters must implement:
//!
//! - [`ports::RecordStore`] - Durable key→value cache of catalog records
//! - [`ports::CatalogSource`] - Remote minimal index and full-record fetches
//! - [`ports::NameIndex`] - Static offline directory for search candidates
//!
//! ## Loader Lifecycle
//!
//! 1. A filter change recomputes the minimal index and resets pagination
//! 2. Scroll triggers advance the page cursor, one in-flight fetch at a time
//! 3. The cache reconciler resolves each identifier batch store-first,
//!    fanning out remote fetches for misses and writing them back
//! 4. Debounced search queries surface matches pagination has not reached
//! 5. Everything merges into one de-duplicated loaded set; display order
//!    and search filtering are pure projections over it

pub mod error;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
