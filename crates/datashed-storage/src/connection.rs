use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use datashed_core::clock::{SharedClock, SystemClock};
use datashed_core::{CatalogError, CatalogResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::metrics::{StoreMetrics, StoreMetricsSnapshot};
use crate::schema;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub wal_mode: bool,
    pub busy_timeout_ms: u64,
    pub cache_size_pages: i32,
}

impl StoreConfig {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            db_path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }

    fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == ":memory:"
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".datashed/index.db"),
            wal_mode: true,
            busy_timeout_ms: 5_000,
            cache_size_pages: 2_000,
        }
    }
}

/// SQLite-backed catalog index.
///
/// Owns the items table, its full-text shadow, the bookkeeping map, and the
/// suggestion usage counters; no other component writes these tables. The
/// connection lives behind a mutex so one store can be shared across the
/// search and indexing paths (`Arc<IndexStore>`).
///
/// Every successful write to the items table advances `write_generation`,
/// which the query cache uses to drop results that predate the write.
pub struct IndexStore {
    conn: Mutex<Connection>,
    config: StoreConfig,
    metrics: StoreMetrics,
    clock: SharedClock,
    generation: AtomicU64,
}

impl std::fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexStore")
            .field("path", &self.config.db_path)
            .field("wal_mode", &self.config.wal_mode)
            .field("generation", &self.generation.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl IndexStore {
    /// Opens (creating if needed) the index database and migrates its
    /// schema to the current version.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be opened or its schema was written
    /// by a newer build.
    pub fn open(config: StoreConfig) -> CatalogResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Opens the store with an injected clock (tests drive timestamps and
    /// cache expiry through `ManualClock`).
    pub fn open_with_clock(config: StoreConfig, clock: SharedClock) -> CatalogResult<Self> {
        tracing::debug!(
            target: "datashed::storage",
            path = %config.db_path.display(),
            wal_mode = config.wal_mode,
            busy_timeout_ms = config.busy_timeout_ms,
            "opening index store"
        );

        let conn = if config.is_in_memory() {
            Connection::open_in_memory().map_err(storage_error("open"))?
        } else {
            if let Some(parent) = config.db_path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(&config.db_path).map_err(storage_error("open"))?
        };

        let store = Self {
            conn: Mutex::new(conn),
            config,
            metrics: StoreMetrics::default(),
            clock,
            generation: AtomicU64::new(0),
        };

        store.metrics.record_open();
        store.apply_pragmas()?;
        schema::bootstrap(&store.lock_conn())?;
        store.metrics.record_schema_bootstrap();

        if let Ok(version) = schema::current_version(&store.lock_conn()) {
            tracing::debug!(
                target: "datashed::storage",
                schema_version = version,
                "index store bootstrap complete"
            );
        }

        Ok(store)
    }

    /// In-memory store for tests and ephemeral sessions.
    pub fn open_in_memory() -> CatalogResult<Self> {
        Self::open(StoreConfig::in_memory())
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    #[must_use]
    pub fn metrics_snapshot(&self) -> StoreMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub(crate) fn metrics(&self) -> &StoreMetrics {
        &self.metrics
    }

    /// Monotonic counter advanced by every successful write to the items
    /// table. Cached query results stamped with an older generation are
    /// stale and must not be served.
    #[must_use]
    pub fn write_generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn now(&self) -> i64 {
        self.clock.unix_seconds()
    }

    /// Mutex poisoning only happens after a panic in another holder; the
    /// connection itself is still usable, so recover rather than propagate.
    pub(crate) fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` inside a single write transaction. The closure's error (or
    /// panic) rolls the transaction back; commit failures roll back too.
    pub fn transaction<F, T>(&self, f: F) -> CatalogResult<T>
    where
        F: FnOnce(&Connection) -> CatalogResult<T>,
    {
        let conn = self.lock_conn();
        conn.execute_batch("BEGIN IMMEDIATE;")
            .map_err(storage_error("begin"))?;

        let outcome = catch_unwind(AssertUnwindSafe(|| f(&conn)));

        match outcome {
            Ok(Ok(value)) => {
                conn.execute_batch("COMMIT;").map_err(|commit_err| {
                    let _ = conn.execute_batch("ROLLBACK;");
                    storage_error("commit")(commit_err)
                })?;
                self.metrics.record_commit();
                Ok(value)
            }
            Ok(Err(err)) => {
                let _ = conn.execute_batch("ROLLBACK;");
                self.metrics.record_rollback();
                tracing::debug!(
                    target: "datashed::storage",
                    error = %err,
                    "transaction rolled back due to closure error"
                );
                Err(err)
            }
            Err(payload) => {
                let _ = conn.execute_batch("ROLLBACK;");
                self.metrics.record_rollback();
                tracing::error!(
                    target: "datashed::storage",
                    "transaction rolled back after panic"
                );
                resume_unwind(payload);
            }
        }
    }

    fn apply_pragmas(&self) -> CatalogResult<()> {
        let conn = self.lock_conn();

        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(storage_error("pragma"))?;

        if self.config.wal_mode && !self.config.is_in_memory() {
            conn.pragma_update(None, "journal_mode", "WAL")
                .map_err(storage_error("pragma"))?;
        }

        conn.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(storage_error("pragma"))?;

        conn.pragma_update(None, "cache_size", i64::from(self.config.cache_size_pages))
            .map_err(storage_error("pragma"))?;

        Ok(())
    }
}

pub(crate) fn storage_error(op: &'static str) -> impl FnOnce(rusqlite::Error) -> CatalogError {
    move |source| CatalogError::Storage {
        op,
        source: Box::new(source),
    }
}

/// Same shape as [`storage_error`] for non-SQLite causes (invalid payloads,
/// conversion failures) surfaced through the storage taxonomy.
pub(crate) fn storage_invalid(op: &'static str, message: impl Into<String>) -> CatalogError {
    CatalogError::Storage {
        op,
        source: Box::new(std::io::Error::other(message.into())),
    }
}
