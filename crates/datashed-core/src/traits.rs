//! Core traits for the datashed catalog pipeline.
//!
//! - [`CatalogSource`]: Catalog listing backend interface (filesystem checkout,
//!   test fixtures).
//! - [`ReindexSignal`]: Fire-and-forget reindex requests from the sync layer.
//!
//! Async operations are represented as boxed futures so the traits remain
//! dyn-compatible for runtime polymorphism (`Arc<dyn CatalogSource>`, etc.).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::descriptor::DatasetDescriptor;
use crate::error::CatalogResult;
use crate::types::RemoteEntry;

/// Boxed future carrying a `CatalogResult<T>`.
pub type CatalogFuture<'a, T> = Pin<Box<dyn Future<Output = CatalogResult<T>> + Send + 'a>>;

// ─── Catalog Source ─────────────────────────────────────────────────────────

/// A browsable catalog of dataset entries.
///
/// The indexer is written against this trait so catalog layout concerns
/// (checkout directory walking, descriptor file names) stay out of the
/// indexing passes themselves.
///
/// # Contract
///
/// - `list()` returns every top-level dataset entry currently present.
///   An error here is systemic: the caller must abort the whole pass.
/// - `descriptor()` failures are per-entry: the caller degrades that one
///   entry to listing data and continues.
pub trait CatalogSource: Send + Sync {
    /// Stable identifier for logging (`"fs"`, `"static"`).
    fn id(&self) -> &'static str;

    /// Lists all dataset entries in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error when the catalog root itself cannot be enumerated.
    fn list(&self) -> CatalogFuture<'_, Vec<RemoteEntry>>;

    /// Loads and parses the descriptor document for one entry.
    ///
    /// Returns `Ok(None)` when the entry has no descriptor file. A present
    /// but unreadable descriptor is an error scoped to this entry only.
    ///
    /// # Errors
    ///
    /// Returns an error when the descriptor exists but cannot be read.
    fn descriptor<'a>(
        &'a self,
        entry: &'a RemoteEntry,
    ) -> CatalogFuture<'a, Option<DatasetDescriptor>>;
}

/// Shared, thread-safe handle to a catalog source.
pub type SharedCatalogSource = Arc<dyn CatalogSource>;

// ─── Reindex Signal ─────────────────────────────────────────────────────────

/// Receiver for reindex requests raised outside the indexer loop.
///
/// The sync coordinator calls [`request_reindex`](Self::request_reindex)
/// after a pull touches catalog paths; implementations wake the background
/// indexer without blocking the caller.
pub trait ReindexSignal: Send + Sync {
    /// Requests an incremental reindex at the next opportunity.
    fn request_reindex(&self);
}

/// No-op signal for contexts without a running indexer.
#[derive(Debug, Default)]
pub struct NoopReindexSignal;

impl ReindexSignal for NoopReindexSignal {
    fn request_reindex(&self) {}
}

/// Counting signal for tests and for probing coordinator behavior.
#[derive(Debug, Default)]
pub struct CountingReindexSignal {
    requests: AtomicU64,
}

impl CountingReindexSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reindex requests observed so far.
    #[must_use]
    pub fn count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl ReindexSignal for CountingReindexSignal {
    fn request_reindex(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource {
        entries: Vec<RemoteEntry>,
    }

    impl CatalogSource for StaticSource {
        fn id(&self) -> &'static str {
            "static"
        }

        fn list(&self) -> CatalogFuture<'_, Vec<RemoteEntry>> {
            Box::pin(async move { Ok(self.entries.clone()) })
        }

        fn descriptor<'a>(
            &'a self,
            entry: &'a RemoteEntry,
        ) -> CatalogFuture<'a, Option<DatasetDescriptor>> {
            Box::pin(async move {
                if entry.name == "with-descriptor" {
                    Ok(Some(DatasetDescriptor::parse("name: Described\n")))
                } else {
                    Ok(None)
                }
            })
        }
    }

    #[tokio::test]
    async fn catalog_source_is_object_safe() {
        let source: SharedCatalogSource = Arc::new(StaticSource {
            entries: vec![
                RemoteEntry::directory("with-descriptor"),
                RemoteEntry::directory("bare"),
            ],
        });

        let entries = source.list().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(source.id(), "static");

        let described = source.descriptor(&entries[0]).await.unwrap();
        assert_eq!(
            described.and_then(|d| d.name).as_deref(),
            Some("Described")
        );
        let bare = source.descriptor(&entries[1]).await.unwrap();
        assert!(bare.is_none());
    }

    #[test]
    fn counting_signal_accumulates() {
        let signal = CountingReindexSignal::new();
        signal.request_reindex();
        signal.request_reindex();
        assert_eq!(signal.count(), 2);

        // Usable through the trait object too.
        let boxed: Arc<dyn ReindexSignal> = Arc::new(CountingReindexSignal::new());
        boxed.request_reindex();
    }

    #[test]
    fn noop_signal_is_inert() {
        NoopReindexSignal.request_reindex();
    }
}
