//! Injectable time source.
//!
//! Cache expiry, suggestion recency, and the full-reindex staleness policy all
//! depend on wall-clock time. Components take a [`SharedClock`] instead of
//! calling `SystemTime::now()` directly so tests can drive time explicitly
//! without real sleeps.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock abstraction with unix-seconds resolution.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Seconds since the unix epoch.
    fn unix_seconds(&self) -> i64;
}

/// Shared handle to a clock implementation.
pub type SharedClock = Arc<dyn Clock>;

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> i64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
            // Clock set before 1970; treat as epoch rather than panic.
            Err(_) => 0,
        }
    }
}

/// A clock that only moves when told to. Test-oriented, but exported so
/// consumers can replay recorded sessions deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    /// Create a manual clock starting at the given unix timestamp.
    #[must_use]
    pub fn starting_at(seconds: i64) -> Self {
        Self {
            seconds: AtomicI64::new(seconds),
        }
    }

    /// Move the clock forward by `delta` seconds.
    pub fn advance(&self, delta: i64) {
        self.seconds.fetch_add(delta, Ordering::SeqCst);
    }

    /// Set the clock to an absolute unix timestamp.
    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_seconds(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}
