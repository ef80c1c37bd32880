//! Core traits, types, and error types for the datashed catalog engine.
//!
//! This crate defines the shared interfaces (`CatalogSource`, `ReindexSignal`),
//! catalog item and query types (`CatalogItem`, `SearchRequest`, `FilterField`),
//! the error taxonomy (`CatalogError`), descriptor parsing, configuration, and
//! the clock abstraction used across all datashed crates.
//!
//! It has minimal external dependencies and is intended to be depended on by
//! every other crate in the workspace.

pub mod cache;
pub mod clock;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod query;
pub mod tracing_config;
pub mod traits;
pub mod types;

pub use cache::{DEFAULT_MAX_ENTRIES, TtlCache};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::EngineConfig;
pub use descriptor::DatasetDescriptor;
pub use error::{CatalogError, CatalogResult};
pub use query::{
    FilterField, MAX_QUERY_LENGTH, QuerySignature, SIZE_BUCKETS, SUGGESTIBLE_FIELDS, SearchRequest,
    SizeBucket, match_expression,
};
pub use traits::{
    CatalogFuture, CatalogSource, CountingReindexSignal, NoopReindexSignal, ReindexSignal,
    SharedCatalogSource,
};
pub use types::{CatalogItem, RemoteEntry, ScoredItem};
