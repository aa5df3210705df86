//! Read-through cache with a fixed time-to-live per table.

use dashmap::DashMap;
use metrics::counter;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for cache freshness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    start: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.start + offset
    }
}

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// One cache table.
///
/// Each entry is replaced whole on write, so a reader sees either the old or
/// the new value. Map guards are never held across an await.
pub struct TtlCache<K, V> {
    name: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<K, CacheEntry<V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(name: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            entries: DashMap::new(),
        }
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.entries.get(key).and_then(|entry| {
            if now.saturating_duration_since(entry.fetched_at) < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Store `value` under `key`, dropping every entry that has gone stale.
    pub fn insert(&self, key: K, value: V) {
        let now = self.clock.now();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.fetched_at) < self.ttl);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    /// Return the fresh value for `key` or run `fetch` and store its result.
    ///
    /// Failed fetches store nothing. Concurrent misses on the same key each
    /// run their own fetch.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            counter!("catalog_cache_hits_total", "table" => self.name).increment(1);
            return Ok(value);
        }
        counter!("catalog_cache_misses_total", "table" => self.name).increment(1);

        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
