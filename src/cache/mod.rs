//! Result cache.
//!
//! [`ResultCache`] maps a `(session, command)` [`CacheKey`] to the last
//! successful executor result. Entries carry their creation time; a
//! lookup older than the TTL reports [`CacheLookup::Expired`] instead of
//! a hit, and a periodic sweep ([`spawn_sweeper`]) removes them.
//!
//! # Concurrency
//!
//! Backed by a moka LRU cache, so readers and writers on distinct keys
//! never block each other. Concurrent stores to the same key race and the
//! last write wins. Identical in-flight computations are *not* coalesced:
//! two first-time requests for the same key both execute.
//!
//! moka's own TTL is deliberately not used, since an entry evicted by
//! moka could never be reported as expired.

use std::sync::Arc;
use std::time::Duration;

use moka::ops::compute::{CompResult, Op};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::telemetry;
use crate::types::CacheKey;

/// Default time-to-live for cached results. Default: 15 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(15 * 60);

/// Default interval between expiry sweeps. Default: 5 minutes.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default maximum number of cached results.
pub const DEFAULT_MAX_ENTRIES: u64 = 1_000;

/// A previously computed result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Value,
    pub created_at: Instant,
}

impl CacheEntry {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            created_at: Instant::now(),
        }
    }

    /// Whether the entry is older than `ttl`.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Fresh entry found.
    Hit(Value),
    /// Entry found but older than the TTL. Treated as a miss by callers.
    Expired,
    /// No entry.
    Miss,
}

impl CacheLookup {
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}

/// Thread-safe result store with per-entry expiry.
pub struct ResultCache {
    entries: Cache<CacheKey, Arc<CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    /// Create a cache with the given TTL and capacity bound.
    ///
    /// Eviction is plain LRU: a fresh store is always admitted, and the
    /// least recently used entry makes room for it.
    pub fn new(ttl: Duration, max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { entries, ttl }
    }

    /// Configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a result. Emits cache hit/miss metrics.
    pub fn lookup(&self, key: &CacheKey) -> CacheLookup {
        match self.entries.get(key) {
            Some(entry) if !entry.is_expired(self.ttl) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                CacheLookup::Hit(entry.payload.clone())
            }
            Some(_) => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                CacheLookup::Expired
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                CacheLookup::Miss
            }
        }
    }

    /// Insert (or overwrite) a result, stamped with the current time.
    pub fn store(&self, key: CacheKey, value: Value) {
        self.entries.insert(key, Arc::new(CacheEntry::new(value)));
    }

    /// Remove a single entry.
    pub fn remove(&self, key: &CacheKey) {
        self.entries.invalidate(key);
    }

    /// Remove every expired entry, returning how many were removed.
    ///
    /// The expiry check and removal happen atomically per key, so an
    /// entry refreshed while the sweep runs is kept.
    pub fn sweep(&self) -> usize {
        let ttl = self.ttl;
        let candidates: Vec<Arc<CacheKey>> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key)
            .collect();

        let mut removed = 0;
        for key in candidates {
            let result = self.entries.entry_by_ref(key.as_ref()).and_compute_with(|current| {
                match current {
                    Some(entry) if entry.value().is_expired(ttl) => Op::Remove,
                    _ => Op::Nop,
                }
            });
            if matches!(result, CompResult::Removed(_)) {
                removed += 1;
            }
        }

        if removed > 0 {
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL).increment(removed as u64);
        }
        removed
    }

    /// Number of entries currently in the cache (expired ones included
    /// until swept).
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

/// Spawn the periodic expiry sweep.
///
/// The first sweep runs one `interval` after spawning. Requires a tokio
/// runtime context.
pub fn spawn_sweeper(cache: Arc<ResultCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let count = cache.sweep();
            if count > 0 {
                debug!(count, "cleaned cache entries");
            }
        }
    })
}
