//! Engine wiring and the public operation surface.
//!
//! [`CatalogEngine::open`] constructs the store, query engine, suggestion
//! ranker, indexer, and sync coordinator once and passes them into each
//! other explicitly. Nothing in the engine is a global; tests inject a
//! scripted git client through [`CatalogEngine::open_with_git`] and drive
//! every pull scenario without a repository.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use datashed_core::config::EngineConfig;
use datashed_core::error::CatalogResult;
use datashed_core::query::{FilterField, SearchRequest};
use datashed_core::types::ScoredItem;
use datashed_storage::{
    IndexStore, QueryEngine, StoreConfig, StoreMetricsSnapshot, Suggestion, SuggestionRanker,
};
use datashed_sync::{PullRequest, SharedGitClient, SubprocessGit, SyncCoordinator};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::debounce::SearchDebouncer;
use crate::fs_source::FsCatalogSource;
use crate::indexer::{BackgroundIndexer, IndexPassStats, IndexerHandle, IndexerStatus};

/// Installs a global tracing subscriber driven by `DATASHED_LOG`.
///
/// The variable takes either a bare level (`debug`) or a full filter
/// expression (`datashed=debug,datashed::git=trace`); unset or invalid
/// values fall back to `datashed=info`. Calling this more than once, or
/// after another subscriber is installed, is a no-op.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("DATASHED_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("datashed=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Result of a user-triggered pull, shaped for direct display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    pub success: bool,
    /// Actionable summary, including any stash-restore warning.
    pub message: String,
    pub old_commit: Option<String>,
    pub new_commit: Option<String>,
}

/// The assembled catalog engine.
pub struct CatalogEngine {
    config: EngineConfig,
    store: Arc<IndexStore>,
    queries: QueryEngine,
    suggestions: SuggestionRanker,
    coordinator: SyncCoordinator,
    indexer: Arc<BackgroundIndexer>,
    handle: Mutex<Option<IndexerHandle>>,
}

impl CatalogEngine {
    /// Opens the engine over the configured checkout with the production
    /// filesystem source and git subprocess client.
    pub fn open(config: EngineConfig) -> CatalogResult<Self> {
        let git: SharedGitClient = Arc::new(SubprocessGit::with_timeouts(
            config.catalog_root.clone(),
            config.git_timeout_secs,
            config.probe_timeout_secs,
        ));
        Self::open_with_git(config, git)
    }

    /// Opens the engine with an injected git client.
    pub fn open_with_git(config: EngineConfig, git: SharedGitClient) -> CatalogResult<Self> {
        config.validate()?;
        if let Some(parent) = config.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(IndexStore::open(StoreConfig {
            db_path: config.db_path.clone(),
            ..StoreConfig::default()
        })?);
        let queries = QueryEngine::new(Arc::clone(&store), config.query_cache_ttl_secs);
        let suggestions = SuggestionRanker::new(Arc::clone(&store));
        let source = Arc::new(FsCatalogSource::new(
            config.catalog_root.clone(),
            config.descriptor_filename.clone(),
        ));
        let indexer = Arc::new(BackgroundIndexer::new(
            Arc::clone(&store),
            source,
            config.clone(),
        ));
        let coordinator = SyncCoordinator::new(git, config.catalog_paths.clone(), indexer.signal());

        tracing::info!(
            target: "datashed::engine",
            db = %config.db_path.display(),
            catalog_root = %config.catalog_root.display(),
            "catalog engine opened"
        );

        Ok(Self {
            config,
            store,
            queries,
            suggestions,
            coordinator,
            indexer,
            handle: Mutex::new(None),
        })
    }

    // ─── Search and suggestions ─────────────────────────────────────────────

    /// Runs a catalog search on the caller's thread.
    ///
    /// Completes in local-only time: SQLite plus the in-process cache,
    /// never network or subprocess work. Filter terms the query exercised
    /// are recorded as suggestion usage afterward; a recording failure is
    /// logged and never fails the search.
    pub fn search(&self, request: &SearchRequest) -> CatalogResult<Vec<ScoredItem>> {
        let results = self.queries.search(request)?;
        self.track_filter_usage(request);
        Ok(results)
    }

    /// Autocomplete values for one filter field, or across every
    /// suggestible field when `field` is `None`.
    pub fn suggest(
        &self,
        field: Option<FilterField>,
        typed: &str,
    ) -> CatalogResult<Vec<Suggestion>> {
        self.suggestions
            .suggest(field, typed, self.config.suggestion_limit)
    }

    /// Fresh debouncer configured with the engine's keystroke window.
    #[must_use]
    pub fn search_debouncer(&self) -> SearchDebouncer {
        SearchDebouncer::new(Duration::from_millis(self.config.search_debounce_ms))
    }

    fn track_filter_usage(&self, request: &SearchRequest) {
        let mut seen = HashSet::new();
        for (field, values) in &request.filters {
            for value in values {
                let normalized = value.trim().to_lowercase();
                if normalized.is_empty() || !seen.insert((*field, normalized)) {
                    continue;
                }
                if let Err(err) = self.suggestions.track(*field, value) {
                    tracing::warn!(
                        target: "datashed::suggest",
                        field = field.as_str(),
                        error = %err,
                        "usage tracking failed"
                    );
                }
            }
        }
    }

    // ─── Sync ───────────────────────────────────────────────────────────────

    /// Pulls the configured branch from the configured remote.
    ///
    /// Failed terminal states (dirty tree, divergence, merge error) come
    /// back as an unsuccessful [`SyncResult`] with an actionable message;
    /// only infrastructure problems surface as `Err`.
    pub async fn trigger_pull(&self) -> CatalogResult<SyncResult> {
        let request = PullRequest::new(
            self.config.branch.clone(),
            self.config.remote_name.clone(),
        )
        .allow_merge(self.config.allow_merge)
        .auto_stash(self.config.auto_stash);
        self.pull_with(&request).await
    }

    /// Pulls with explicit parameters, overriding the configured defaults.
    pub async fn pull_with(&self, request: &PullRequest) -> CatalogResult<SyncResult> {
        let report = self.coordinator.pull(request).await?;
        Ok(SyncResult {
            success: report.success(),
            message: report.message(),
            old_commit: report.old_commit,
            new_commit: report.new_commit,
        })
    }

    // ─── Indexer lifecycle ──────────────────────────────────────────────────

    /// Runs one indexing pass immediately on the caller's task.
    pub async fn reindex_now(&self) -> CatalogResult<IndexPassStats> {
        self.indexer.run_pass().await
    }

    /// Starts the periodic background indexer; a no-op when already
    /// running. The startup pass fires immediately.
    pub async fn start_background(&self) {
        let mut slot = self.handle.lock().await;
        if slot.is_none() {
            *slot = Some(Arc::clone(&self.indexer).spawn());
            tracing::info!(target: "datashed::engine", "background indexer started");
        }
    }

    /// Stops the background indexer and waits for the loop to wind down.
    pub async fn shutdown(&self) {
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
            tracing::info!(target: "datashed::engine", "background indexer stopped");
        }
    }

    /// Indexer state snapshot for UI progress display.
    pub async fn indexer_status(&self) -> CatalogResult<IndexerStatus> {
        let running = self
            .handle
            .lock()
            .await
            .as_ref()
            .is_some_and(IndexerHandle::is_running);
        self.indexer.status(running)
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Direct store access for advanced callers (drafts, raw queries).
    #[must_use]
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Counter snapshot of everything the store has done so far.
    #[must_use]
    pub fn metrics(&self) -> StoreMetricsSnapshot {
        self.store.metrics_snapshot()
    }
}

impl std::fmt::Debug for CatalogEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogEngine")
            .field("db_path", &self.config.db_path)
            .field("catalog_root", &self.config.catalog_root)
            .finish_non_exhaustive()
    }
}
