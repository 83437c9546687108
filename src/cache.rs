//! Time-boxed, size-bounded response cache keyed by page title.
//!
//! Keys are compared case-insensitively. Expired entries are dropped lazily when
//! they are looked up. When full, inserting a new key evicts the oldest-inserted
//! entry; reads do not refresh an entry's position.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: Instant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate_percent: f64,
    pub ttl_seconds: u64,
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

pub struct ResponseCache<V> {
    ttl: Duration,
    max_size: usize,
    inner: Mutex<Inner<V>>,
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration, max_size: usize) -> Self {
        Self {
            ttl,
            max_size,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn lock(&self) -> MutexGuard<'_, Inner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let key = normalize(key);
        let mut inner = self.lock();

        let expired = match inner.entries.get(&key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => entry.stored_at.elapsed() > self.ttl,
        };

        if expired {
            inner.entries.remove(&key);
            inner.order.retain(|k| k != &key);
            inner.misses += 1;
            tracing::debug!(key = %key, "cache entry expired");
            return None;
        }

        inner.hits += 1;
        inner.entries.get(&key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V) {
        if self.max_size == 0 {
            return;
        }

        let key = normalize(key);
        let mut inner = self.lock();
        let entry = CacheEntry {
            value,
            stored_at: Instant::now(),
        };

        if let Some(existing) = inner.entries.get_mut(&key) {
            *existing = entry;
            return;
        }

        if inner.entries.len() >= self.max_size {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                tracing::debug!(key = %oldest, "cache full, evicted oldest entry");
            }
        }

        inner.order.push_back(key.clone());
        inner.entries.insert(key, entry);
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry and resets the hit/miss counters.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let lookups = inner.hits + inner.misses;
        let hit_rate_percent = if lookups == 0 {
            0.0
        } else {
            (inner.hits as f64 / lookups as f64 * 10_000.0).round() / 100.0
        };

        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate_percent,
            ttl_seconds: self.ttl.as_secs(),
        }
    }
}

impl<V: Clone> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cache: ResponseCache<String> = ResponseCache::default();
        assert_eq!(cache.ttl(), Duration::from_secs(3600));
        assert_eq!(cache.max_size(), 100);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (0, 0));
    }

    #[test]
    fn set_then_get_counts_hit() {
        let cache = ResponseCache::default();
        cache.set("test_key", "test_value".to_string());

        assert_eq!(cache.get("test_key").as_deref(), Some("test_value"));
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 0));
    }

    #[test]
    fn miss_counts_miss() {
        let cache: ResponseCache<String> = ResponseCache::default();
        assert!(cache.get("nonexistent_key").is_none());
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (0, 1));
    }

    #[test]
    fn keys_are_case_insensitive() {
        let cache = ResponseCache::default();
        cache.set("TestKey", 1);
        assert_eq!(cache.get("testkey"), Some(1));
        assert_eq!(cache.get("TESTKEY"), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let ttl = Duration::from_secs(10);
        let cache = ResponseCache::new(ttl, 10);
        cache.set("key", 7);

        tokio::time::advance(ttl - Duration::from_millis(1)).await;
        assert_eq!(cache.get("key"), Some(7));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert_eq!(cache.get("key"), None);
        assert_eq!(cache.len(), 0, "expired entry is purged on access");
    }

    #[test]
    fn overflow_evicts_first_inserted() {
        let cache = ResponseCache::new(DEFAULT_TTL, 3);
        cache.set("key1", 1);
        cache.set("key2", 2);
        cache.set("key3", 3);

        // reads do not change eviction order
        assert_eq!(cache.get("key1"), Some(1));

        cache.set("key4", 4);
        assert_eq!(cache.get("key1"), None);
        assert_eq!(cache.get("key2"), Some(2));
        assert_eq!(cache.get("key3"), Some(3));
        assert_eq!(cache.get("key4"), Some(4));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn overwriting_existing_key_does_not_evict() {
        let cache = ResponseCache::new(DEFAULT_TTL, 2);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("A", 10);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = ResponseCache::new(DEFAULT_TTL, 0);
        cache.set("a", 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn stats_report_hit_rate() {
        let cache = ResponseCache::new(Duration::from_secs(3600), 100);
        cache.set("key1", "value1");
        cache.get("key1");
        cache.get("key2");

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate_percent, 50.0);
        assert_eq!(stats.ttl_seconds, 3600);
        assert_eq!(stats.max_size, 100);
    }

    #[test]
    fn clear_resets_everything() {
        let cache = ResponseCache::default();
        cache.set("a", 1);
        cache.get("a");
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.stats().hits, 0);
    }
}
