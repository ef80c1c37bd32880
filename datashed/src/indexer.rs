//! Background catalog indexing.
//!
//! [`BackgroundIndexer`] keeps the SQLite index in step with whatever the
//! catalog source currently lists. Every pass is a fresh enumeration; there
//! is no change feed to consume, so an incremental pass simply re-upserts
//! everything listed and prunes rows whose datasets vanished. The store's
//! no-op upsert detection keeps that cheap.
//!
//! A pass is **full** when the index has never been fully built, is empty,
//! or the last full build has aged out; a full pass replaces every
//! remote-sourced row in a single store transaction, so renamed datasets
//! leave no ghosts and searches never observe a half-rebuilt catalog.
//! Local draft rows are never touched by either pass.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use datashed_core::config::EngineConfig;
use datashed_core::error::CatalogResult;
use datashed_core::traits::{ReindexSignal, SharedCatalogSource};
use datashed_core::types::{CatalogItem, RemoteEntry};
use datashed_storage::IndexStore;
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const SECONDS_PER_DAY: i64 = 86_400;

// ─── Pass reporting ─────────────────────────────────────────────────────────

/// Which kind of indexing pass ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    /// Clear and rebuild every remote-sourced row.
    Full,
    /// Re-upsert the current listing and prune vanished datasets.
    Incremental,
}

impl PassKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for PassKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one indexing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPassStats {
    pub kind: PassKind,
    /// Entries written to the store (including unchanged re-upserts).
    pub indexed: usize,
    /// Remote-sourced rows removed because their dataset vanished.
    pub deleted: usize,
    /// Entries indexed from listing data because their descriptor failed.
    pub soft_errors: usize,
    pub total_ms: u64,
}

/// Snapshot of indexer state for UI progress display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexerStatus {
    /// Whether the background loop is currently spawned.
    pub running: bool,
    /// Whether at least one indexing pass has completed.
    pub ready: bool,
    pub item_count: u64,
    /// Unix seconds of the last successful pass of any kind.
    pub last_sync: Option<i64>,
}

// ─── Indexer ────────────────────────────────────────────────────────────────

/// Drives full and incremental index passes against one store.
pub struct BackgroundIndexer {
    store: Arc<IndexStore>,
    source: SharedCatalogSource,
    config: EngineConfig,
    reindex: Arc<Notify>,
}

impl BackgroundIndexer {
    pub fn new(store: Arc<IndexStore>, source: SharedCatalogSource, config: EngineConfig) -> Self {
        Self {
            store,
            source,
            config,
            reindex: Arc::new(Notify::new()),
        }
    }

    /// Signal handle the sync coordinator uses to request an extra pass.
    ///
    /// Requests are coalesced: several signals while a pass is running
    /// collapse into one follow-up pass.
    #[must_use]
    pub fn signal(&self) -> Arc<dyn ReindexSignal> {
        Arc::new(NotifySignal(Arc::clone(&self.reindex)))
    }

    /// Current indexer state; `running` is supplied by whoever owns the
    /// spawned loop handle.
    pub fn status(&self, running: bool) -> CatalogResult<IndexerStatus> {
        let item_count = self.store.item_count()?;
        let last_sync = self.store.last_sync()?;
        Ok(IndexerStatus {
            running,
            ready: last_sync.is_some(),
            item_count,
            last_sync,
        })
    }

    /// Runs one indexing pass, choosing full or incremental by freshness.
    ///
    /// A systemic failure (listing unreachable, storage error) aborts the
    /// pass with the bookkeeping timestamps untouched, so the next pass
    /// re-assesses from scratch.
    pub async fn run_pass(&self) -> CatalogResult<IndexPassStats> {
        let kind = if self.needs_full_index()? {
            PassKind::Full
        } else {
            PassKind::Incremental
        };
        let started = std::time::Instant::now();
        tracing::info!(
            target: "datashed::indexer",
            op = "run_pass",
            pass = %kind,
            source = self.source.id(),
            "index pass started"
        );

        let result = match kind {
            PassKind::Full => self.full_pass().await,
            PassKind::Incremental => self.incremental_pass().await,
        };
        match result {
            Ok((indexed, deleted, soft_errors)) => {
                let stats = IndexPassStats {
                    kind,
                    indexed,
                    deleted,
                    soft_errors,
                    total_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                };
                tracing::info!(
                    target: "datashed::indexer",
                    op = "run_pass",
                    pass = %kind,
                    indexed,
                    deleted,
                    soft_errors,
                    total_ms = stats.total_ms,
                    "index pass finished"
                );
                Ok(stats)
            }
            Err(err) => {
                tracing::warn!(
                    target: "datashed::indexer",
                    op = "run_pass",
                    pass = %kind,
                    error = %err,
                    "index pass aborted"
                );
                Err(err)
            }
        }
    }

    /// Starts the periodic loop. The first tick fires immediately, so the
    /// startup pass needs no separate call.
    #[must_use]
    pub fn spawn(self: Arc<Self>) -> IndexerHandle {
        let indexer = self;
        let handle_notify = Arc::clone(&indexer.reindex);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let running = Arc::new(AtomicBool::new(true));
        let loop_running = Arc::clone(&running);
        let notify = Arc::clone(&indexer.reindex);

        let task = tokio::spawn(async move {
            let interval = Duration::from_secs(indexer.config.sync_interval_secs.max(1));
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => indexer.run_swallowed().await,
                    () = notify.notified() => indexer.run_swallowed().await,
                    _ = shutdown_rx.changed() => break,
                }
            }
            loop_running.store(false, Ordering::SeqCst);
        });

        IndexerHandle {
            notify: handle_notify,
            shutdown: shutdown_tx,
            task,
            running,
        }
    }

    async fn run_swallowed(&self) {
        // run_pass logs its own failures; the loop keeps ticking.
        let _ = self.run_pass().await;
    }

    fn needs_full_index(&self) -> CatalogResult<bool> {
        let Some(last_full) = self.store.last_full_index()? else {
            return Ok(true);
        };
        if self.store.item_count()? == 0 {
            return Ok(true);
        }
        let age = self.store.clock().unix_seconds() - last_full;
        Ok(age > self.config.full_index_max_age_days * SECONDS_PER_DAY)
    }

    async fn full_pass(&self) -> CatalogResult<(usize, usize, usize)> {
        let entries = self.source.list().await?;
        let (items, soft_errors) = self.collect_items(&entries).await;

        let known: HashSet<String> = self.store.remote_paths()?.into_iter().collect();
        let listed: HashSet<&str> = items.iter().map(|item| item.path.as_str()).collect();
        let deleted = known
            .iter()
            .filter(|path| !listed.contains(path.as_str()))
            .count();

        self.store.replace_remote_items(&items)?;

        let now = self.store.clock().unix_seconds();
        self.store.set_last_full_index(now)?;
        self.store.set_last_sync(now)?;
        Ok((items.len(), deleted, soft_errors))
    }

    async fn incremental_pass(&self) -> CatalogResult<(usize, usize, usize)> {
        let entries = self.source.list().await?;
        let (items, soft_errors) = self.collect_items(&entries).await;
        self.store.upsert_items(&items)?;

        let listed: HashSet<&str> = items.iter().map(|item| item.path.as_str()).collect();
        let mut deleted = 0;
        for path in self.store.remote_paths()? {
            if !listed.contains(path.as_str()) && self.store.delete_item(&path)? {
                deleted += 1;
            }
        }

        self.store
            .set_last_sync(self.store.clock().unix_seconds())?;
        Ok((items.len(), deleted, soft_errors))
    }

    /// Builds catalog items for every directory entry, degrading entries
    /// whose descriptor cannot be read to bare listing data.
    async fn collect_items(&self, entries: &[RemoteEntry]) -> (Vec<CatalogItem>, usize) {
        let mut items = Vec::with_capacity(entries.len());
        let mut soft_errors = 0;
        for entry in entries {
            if !entry.is_directory {
                continue;
            }
            let item = match self.source.descriptor(entry).await {
                Ok(Some(descriptor)) => descriptor.into_item(entry),
                Ok(None) => CatalogItem::bare(entry),
                Err(err) => {
                    soft_errors += 1;
                    tracing::warn!(
                        target: "datashed::indexer",
                        path = %entry.name,
                        error = %err,
                        "descriptor unreadable, indexing bare entry"
                    );
                    CatalogItem::bare(entry)
                }
            };
            items.push(item);
        }
        (items, soft_errors)
    }
}

impl std::fmt::Debug for BackgroundIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundIndexer")
            .field("source", &self.source.id())
            .field("sync_interval_secs", &self.config.sync_interval_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct NotifySignal(Arc<Notify>);

impl ReindexSignal for NotifySignal {
    fn request_reindex(&self) {
        self.0.notify_one();
    }
}

// ─── Loop handle ────────────────────────────────────────────────────────────

/// Handle to a spawned indexer loop.
#[derive(Debug)]
pub struct IndexerHandle {
    notify: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    running: Arc<AtomicBool>,
}

impl IndexerHandle {
    /// Queues an extra incremental pass on the running loop.
    pub fn request_reindex(&self) {
        self.notify.notify_one();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.task.is_finished()
    }

    /// Signals the loop to stop and waits for it to wind down.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if self.task.await.is_err() {
            tracing::warn!(
                target: "datashed::indexer",
                "indexer loop ended abnormally during shutdown"
            );
        }
    }
}
