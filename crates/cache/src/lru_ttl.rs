//! Generic bounded LRU cache with lazy TTL expiry.
//!
//! - TTL is checked on read only; a stale entry is dropped and reported as a
//!   miss. Nothing is ever evicted proactively because of age.
//! - Eviction is capacity-triggered: inserting past capacity removes exactly
//!   the least-recently-used entry.
//! - The lock is held only for the map update, never across a fetch, so two
//!   concurrent misses on different keys fetch in parallel. Two concurrent
//!   misses on the same key may both fetch; the last insert wins.
//!
//! Time comes from [`tokio::time::Instant`], so tests can pause and advance
//! the clock.

use lru::LruCache;
use serde::Serialize;
use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// A cached value plus its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Instant,
    pub last_accessed: Instant,
    pub hits: u64,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            last_accessed: now,
            hits: 0,
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.duration_since(self.inserted_at) > ttl
    }
}

/// Counters for one cache instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    /// Hits over lookups, 0.0 when nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    stats: CacheStats,
}

/// Bounded LRU cache whose entries expire `ttl` after insertion.
pub struct LruTtlCache<K: Hash + Eq, V> {
    name: String,
    ttl: Duration,
    inner: Mutex<Inner<K, V>>,
}

impl<K, V> LruTtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Create a cache. A capacity of 0 is treated as 1.
    pub fn new(name: impl Into<String>, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name: name.into(),
            ttl,
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats {
                    capacity: capacity.get(),
                    ..CacheStats::default()
                },
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a live entry, promoting it to most-recently-used.
    ///
    /// An expired entry is dropped and counted as a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let Inner { entries, stats } = &mut *inner;

        let expired = entries.peek(key).map(|e| e.is_expired(now, self.ttl));
        match expired {
            None => {
                stats.misses += 1;
                None
            }
            Some(true) => {
                entries.pop(key);
                stats.expirations += 1;
                stats.misses += 1;
                debug!(cache = %self.name, "Cache entry expired");
                None
            }
            Some(false) => {
                let entry = entries.get_mut(key)?;
                entry.last_accessed = now;
                entry.hits += 1;
                stats.hits += 1;
                Some(entry.value.clone())
            }
        }
    }

    /// Insert (or replace) a value. Returns the evicted key if capacity forced one out.
    pub async fn insert(&self, key: K, value: V) -> Option<K> {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let Inner { entries, stats } = &mut *inner;

        let replaced = entries.contains(&key);
        let evicted = match entries.push(key, CacheEntry::new(value, now)) {
            Some((old_key, _)) if !replaced => Some(old_key),
            _ => None,
        };
        if evicted.is_some() {
            stats.evictions += 1;
            debug!(cache = %self.name, "Evicted least-recently-used entry");
        }
        evicted
    }

    /// Return the cached value, or run `fetch`, store its result, and return it.
    ///
    /// The boolean is `true` when the value came from the cache.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, fetch: F) -> (V, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        if let Some(value) = self.get(&key).await {
            return (value, true);
        }

        let value = fetch().await;
        self.insert(key, value.clone()).await;
        (value, false)
    }

    /// Like [`get_or_fetch`](Self::get_or_fetch) for fallible fetches.
    /// Errors are returned to the caller and never cached.
    pub async fn try_get_or_fetch<F, Fut, E>(&self, key: K, fetch: F) -> Result<(V, bool), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key).await {
            return Ok((value, true));
        }

        let value = fetch().await?;
        self.insert(key, value.clone()).await;
        Ok((value, false))
    }

    /// Remove an entry regardless of age.
    pub async fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().await.entries.pop(key).map(|e| e.value)
    }

    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
        debug!(cache = %self.name, "Cache cleared");
    }

    /// Entries currently stored, including ones that are stale but not yet read.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            size: inner.entries.len(),
            ..inner.stats
        }
    }
}
