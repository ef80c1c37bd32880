//! # datashed
//!
//! A local-first dataset catalog: a git-synced checkout of descriptor
//! files, indexed into SQLite FTS5, searched with ranked full-text plus
//! AND-ed field filters, and kept fresh by a background indexer.
//!
//! Three things happen here, and they stay decoupled:
//!
//! 1. **Indexing** walks the checkout's catalog directories, parses each
//!    dataset's descriptor document, and upserts the results into the
//!    index. Full rebuilds and incremental refreshes share one code path.
//! 2. **Search** runs synchronously against SQLite only: BM25-ranked
//!    full-text matching, byte-range size buckets, prefix-matched project
//!    filters, and a short-lived first-page cache that any write
//!    invalidates immediately.
//! 3. **Sync** pulls the catalog branch through a fixed safe-pull state
//!    machine (stash, divergence guard, fetch, merge, restore, reindex
//!    signal) over a subprocess git client that tests replace with a
//!    scripted fake.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use datashed::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> CatalogResult<()> {
//!     datashed::init_tracing();
//!
//!     let engine = CatalogEngine::open(EngineConfig::default())?;
//!     engine.start_background().await;
//!
//!     let results = engine.search(
//!         &SearchRequest::new("sea surface temperature")
//!             .with_filter(FilterField::Format, "netcdf"),
//!     )?;
//!     for scored in &results {
//!         println!("{}: {:.3}", scored.item.path, scored.score);
//!     }
//!
//!     let pulled = engine.trigger_pull().await?;
//!     println!("{}", pulled.message);
//!
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Crate Layout
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | [`datashed-core`](core) | Types, traits, errors, descriptor parsing, config, clock |
//! | [`datashed-storage`](storage) | SQLite index, ranked search, suggestion ranking |
//! | [`datashed-sync`](sync) | Git subprocess client and safe-pull coordinator |
//! | `datashed` | Indexer, filesystem source, engine wiring, debounce |
//!
//! ## Key Types
//!
//! - [`CatalogEngine`] — assembled engine exposing search, suggest, pull,
//!   and indexer lifecycle
//! - [`EngineConfig`] — every tuning knob, loadable from TOML plus
//!   environment overrides
//! - [`SearchRequest`] / [`ScoredItem`] — query in, ranked results out
//! - [`SuggestionRanker`] / [`Suggestion`] — usage-weighted autocomplete
//! - [`BackgroundIndexer`] / [`IndexerStatus`] — index passes and their
//!   status snapshot
//! - [`SyncCoordinator`] / [`PullReport`] — the safe-pull state machine
//! - [`GitClient`] — the seam a test fake implements
//!
//! # Logging
//!
//! Everything logs through [`tracing`] under the `datashed::*` targets
//! (`datashed::storage`, `datashed::search`, `datashed::sync`, ...). The
//! library never installs a subscriber on its own; call [`init_tracing`]
//! or install your own.

#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::uninlined_format_args
)]

// ─── Sub-crate module aliases (advanced access) ─────────────────────────────

/// Types, traits, errors, descriptor parsing, config, and the clock.
pub use datashed_core as core;
/// SQLite-backed index, ranked search, and suggestion ranking.
pub use datashed_storage as storage;
/// Git subprocess client and the safe-pull coordinator.
pub use datashed_sync as sync;

// ─── Core types (always available) ──────────────────────────────────────────

// Error types
pub use datashed_core::error::{CatalogError, CatalogResult};

// Configuration
pub use datashed_core::config::EngineConfig;

// Catalog records and search results
pub use datashed_core::types::{CatalogItem, RemoteEntry, ScoredItem};

// Query model
pub use datashed_core::query::{
    FilterField, MAX_QUERY_LENGTH, SIZE_BUCKETS, SUGGESTIBLE_FIELDS, SearchRequest, SizeBucket,
};

// Descriptor documents
pub use datashed_core::descriptor::DatasetDescriptor;

// Clock abstraction (tests drive cache expiry and timestamps through it)
pub use datashed_core::clock::{Clock, ManualClock, SharedClock, SystemClock};

// Traits
pub use datashed_core::traits::{
    CatalogFuture, CatalogSource, CountingReindexSignal, NoopReindexSignal, ReindexSignal,
    SharedCatalogSource,
};

// ─── Storage re-exports ─────────────────────────────────────────────────────

pub use datashed_storage::{
    BulkUpsertStats, IndexStore, QueryEngine, SCHEMA_VERSION, StoreConfig, StoreMetricsSnapshot,
    Suggestion, SuggestionRanker, UpsertOutcome, UsageRow,
};

// ─── Sync re-exports ────────────────────────────────────────────────────────

pub use datashed_sync::{
    GitClient, PullOutcome, PullReport, PullRequest, SharedGitClient, SubprocessGit,
    SyncCoordinator,
};

// ─── Facade modules ─────────────────────────────────────────────────────────

pub mod debounce;
pub mod engine;
pub mod fs_source;
pub mod indexer;

pub use debounce::SearchDebouncer;
pub use engine::{CatalogEngine, SyncResult, init_tracing};
pub use fs_source::FsCatalogSource;
pub use indexer::{BackgroundIndexer, IndexPassStats, IndexerHandle, IndexerStatus, PassKind};

// ─── Prelude ────────────────────────────────────────────────────────────────

/// Convenience re-exports for common usage.
///
/// ```rust,ignore
/// use datashed::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        CatalogEngine, CatalogError, CatalogResult, EngineConfig, FilterField, IndexerStatus,
        ScoredItem, SearchRequest, Suggestion, SyncResult,
    };
}
