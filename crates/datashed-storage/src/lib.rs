//! SQLite-backed storage for the datashed catalog index.
//!
//! This crate owns schema bootstrap, catalog item persistence with its
//! triggers-maintained FTS5 shadow, index bookkeeping metadata, ranked
//! search, and filter-value suggestion ranking.
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args
)]

pub mod connection;
pub mod items;
pub mod meta;
pub mod metrics;
pub mod schema;
pub mod search;
pub mod suggest;
pub mod usage;

pub use connection::{IndexStore, StoreConfig};
pub use items::{BulkUpsertStats, UpsertOutcome};
pub use meta::{META_LAST_FULL_INDEX, META_LAST_SYNC};
pub use metrics::{StoreMetrics, StoreMetricsSnapshot};
pub use schema::{SCHEMA_VERSION, bootstrap, current_version};
pub use search::QueryEngine;
pub use suggest::{Suggestion, SuggestionRanker};
pub use usage::UsageRow;
