use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free operation counters for the index store.
///
/// Counters are monotonic for the lifetime of the store; snapshot for a
/// consistent point-in-time view.
#[derive(Debug, Default)]
pub struct StoreMetrics {
    opens: AtomicU64,
    schema_bootstraps: AtomicU64,
    tx_commits: AtomicU64,
    tx_rollbacks: AtomicU64,
    items_inserted: AtomicU64,
    items_updated: AtomicU64,
    items_unchanged: AtomicU64,
    items_deleted: AtomicU64,
    searches: AtomicU64,
    search_cache_hits: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetricsSnapshot {
    pub opens: u64,
    pub schema_bootstraps: u64,
    pub tx_commits: u64,
    pub tx_rollbacks: u64,
    pub items_inserted: u64,
    pub items_updated: u64,
    pub items_unchanged: u64,
    pub items_deleted: u64,
    pub searches: u64,
    pub search_cache_hits: u64,
}

impl StoreMetrics {
    pub fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_schema_bootstrap(&self) {
        self.schema_bootstraps.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commit(&self) {
        self.tx_commits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rollback(&self) {
        self.tx_rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_inserted(&self, count: u64) {
        self.items_inserted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_updated(&self, count: u64) {
        self.items_updated.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_unchanged(&self, count: u64) {
        self.items_unchanged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_deleted(&self, count: u64) {
        self.items_deleted.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_search(&self) {
        self.searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search_cache_hit(&self) {
        self.search_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot {
            opens: self.opens.load(Ordering::Relaxed),
            schema_bootstraps: self.schema_bootstraps.load(Ordering::Relaxed),
            tx_commits: self.tx_commits.load(Ordering::Relaxed),
            tx_rollbacks: self.tx_rollbacks.load(Ordering::Relaxed),
            items_inserted: self.items_inserted.load(Ordering::Relaxed),
            items_updated: self.items_updated.load(Ordering::Relaxed),
            items_unchanged: self.items_unchanged.load(Ordering::Relaxed),
            items_deleted: self.items_deleted.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            search_cache_hits: self.search_cache_hits.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_into_snapshot() {
        let metrics = StoreMetrics::default();
        metrics.record_open();
        metrics.record_schema_bootstrap();
        metrics.record_commit();
        metrics.record_commit();
        metrics.record_rollback();
        metrics.record_inserted(3);
        metrics.record_updated(2);
        metrics.record_unchanged(5);
        metrics.record_deleted(1);
        metrics.record_search();
        metrics.record_search_cache_hit();

        let snap = metrics.snapshot();
        assert_eq!(snap.opens, 1);
        assert_eq!(snap.schema_bootstraps, 1);
        assert_eq!(snap.tx_commits, 2);
        assert_eq!(snap.tx_rollbacks, 1);
        assert_eq!(snap.items_inserted, 3);
        assert_eq!(snap.items_updated, 2);
        assert_eq!(snap.items_unchanged, 5);
        assert_eq!(snap.items_deleted, 1);
        assert_eq!(snap.searches, 1);
        assert_eq!(snap.search_cache_hits, 1);
    }

    #[test]
    fn snapshot_serializes() {
        let metrics = StoreMetrics::default();
        metrics.record_search();
        let json = serde_json::to_string(&metrics.snapshot()).unwrap();
        assert!(json.contains("\"searches\":1"));
    }
}
