//! In-process TTL cache for first-page query results.
//!
//! Entries expire two ways: a wall-clock TTL (the accepted 60s staleness
//! window) and a store write-generation stamp. Every successful write to the
//! index bumps the store's generation, so a cached page from before the
//! write misses immediately — reads never have to race a background pass.
//! The clock is injected so expiry tests drive time explicitly.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::SharedClock;

/// Entry capacity used by [`TtlCache::new`].
pub const DEFAULT_MAX_ENTRIES: usize = 256;

struct CacheEntry<V> {
    value: V,
    inserted_at: i64,
    generation: u64,
}

/// Clock- and generation-aware TTL cache.
pub struct TtlCache<K, V> {
    ttl_secs: i64,
    max_entries: usize,
    clock: SharedClock,
    state: Mutex<HashMap<K, CacheEntry<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    /// Creates a cache whose entries live for `ttl_secs` seconds.
    #[must_use]
    pub fn new(ttl_secs: u64, clock: SharedClock) -> Self {
        Self {
            ttl_secs: i64::try_from(ttl_secs).unwrap_or(i64::MAX),
            max_entries: DEFAULT_MAX_ENTRIES,
            clock,
            state: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Overrides the entry cap (entries beyond it evict oldest-first).
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Looks up a value inserted under the same key and store generation.
    /// Expired or superseded entries are removed on the way out.
    pub fn get(&self, key: &K, generation: u64) -> Option<V> {
        let now = self.clock.unix_seconds();
        let mut state = lock_recover(&self.state);
        let live = match state.get(key) {
            Some(entry) => entry.generation == generation && !self.expired(entry, now),
            None => false,
        };
        if live {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return state.get(key).map(|entry| entry.value.clone());
        }
        state.remove(key);
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores a value under the current store generation.
    pub fn insert(&self, key: K, value: V, generation: u64) {
        let now = self.clock.unix_seconds();
        let mut state = lock_recover(&self.state);
        if state.len() >= self.max_entries {
            state.retain(|_, entry| entry.generation == generation && !self.expired(entry, now));
        }
        if state.len() >= self.max_entries {
            // Still full after pruning: drop the oldest entry.
            if let Some(oldest) = state
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone())
            {
                state.remove(&oldest);
            }
        }
        state.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                generation,
            },
        );
    }

    /// Drops every entry.
    pub fn invalidate_all(&self) {
        lock_recover(&self.state).clear();
    }

    /// Number of resident entries, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        lock_recover(&self.state).len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of lookups served from cache since construction.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        hits as f64 / total as f64
    }

    fn expired(&self, entry: &CacheEntry<V>, now: i64) -> bool {
        now.saturating_sub(entry.inserted_at) >= self.ttl_secs
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl_secs", &self.ttl_secs)
            .field("max_entries", &self.max_entries)
            .finish_non_exhaustive()
    }
}

fn lock_recover<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    // A panic while holding the lock leaves plain data behind; recover it
    // rather than poisoning every later search.
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
