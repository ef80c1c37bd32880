//! Keystroke coalescing for interactive search.
//!
//! Each keystroke schedules a search a short delay into the future; the
//! next keystroke supersedes it. Only the most recent job in a burst ever
//! runs, so a fast typist issues one query instead of one per character,
//! and superseded searches can never deliver results out of order.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Delays and coalesces search jobs.
///
/// Must be used inside a tokio runtime; [`schedule`](Self::schedule) spawns
/// the delayed job as a task.
#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SearchDebouncer {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    /// Schedules `job` to run once the debounce delay elapses.
    ///
    /// Scheduling again before then supersedes the pending job, which never
    /// runs. The abort usually wins; the generation ticket closes the race
    /// where the pending task's sleep already completed when the abort
    /// lands.
    pub fn schedule<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let generation = Arc::clone(&self.generation);
        let ticket = generation.fetch_add(1, Ordering::SeqCst) + 1;
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) == ticket {
                job().await;
            }
        });

        if let Some(previous) = self.swap_pending(Some(handle)) {
            previous.abort();
        }
    }

    /// Discards any pending job without scheduling a new one.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.swap_pending(None) {
            previous.abort();
        }
    }

    fn swap_pending(&self, next: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, next)
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
