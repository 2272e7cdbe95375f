//! In-process response cache with TTL
//!
//! A `DashMap`-backed store for single-process deployments and tests.
//! Expired entries are evicted lazily on read, and in bulk when the map
//! reaches its capacity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::CacheStore;

/// Thread-safe response cache with TTL expiry
pub struct MemoryCache {
    entries: DashMap<String, CachedResponse>,
    max_entries: usize,
    stats: CacheStats,
}

struct CachedResponse {
    value: Value,
    expires_at: Instant,
}

impl CachedResponse {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Cache statistics tracked atomically
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
}

impl MemoryCache {
    /// Create a cache holding at most `max_entries` live entries
    #[must_use]
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            stats: CacheStats::default(),
        }
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired() {
                drop(entry);
                // A concurrent set may have replaced the entry since the read
                if self.entries.remove_if(key, |_, e| e.is_expired()).is_some() {
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                }
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            } else {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
        } else {
            self.stats.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    fn insert(&self, key: &str, value: &Value, ttl: Duration) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
            self.evict_expired();
            if self.entries.len() >= self.max_entries {
                self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, max_entries = self.max_entries, "Memory cache full, entry dropped");
                return;
            }
        }

        self.entries.insert(
            key.to_string(),
            CachedResponse {
                value: value.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Evict expired entries
    pub fn evict_expired(&self) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.stats
                .evictions
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStatsSnapshot {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if hits + misses == 0 {
            0.0
        } else {
            hits as f64 / (hits + misses) as f64
        };
        CacheStatsSnapshot {
            hits,
            misses,
            evictions: self.stats.evictions.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
            size: self.entries.len(),
            hit_rate,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key)
    }

    async fn set(&self, key: &str, payload: &Value, ttl: Duration) {
        self.insert(key, payload, ttl);
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStatsSnapshot {
    /// Total cache hits
    pub hits: u64,
    /// Total cache misses
    pub misses: u64,
    /// Total evictions
    pub evictions: u64,
    /// Writes dropped because the cache was full
    pub rejected: u64,
    /// Current number of entries
    pub size: usize,
    /// Hit rate (0.0-1.0)
    pub hit_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_cache_hit() {
        let cache = MemoryCache::with_capacity(16);
        let value = json!({"Page": {"media": []}});

        cache.set("trending:anime:1:10", &value, Duration::from_secs(60)).await;

        assert_eq!(cache.get("trending:anime:1:10").await, Some(value));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 0);
    }

    #[tokio::test]
    async fn test_cache_miss() {
        let cache = MemoryCache::with_capacity(16);

        assert_eq!(cache.get("nonexistent").await, None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test]
    async fn test_cache_expiry() {
        let cache = MemoryCache::with_capacity(16);
        cache.set("key", &json!(1), Duration::from_millis(1)).await;

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get("key").await, None);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_overwrite_is_last_writer_wins() {
        let cache = MemoryCache::with_capacity(16);
        cache.set("key", &json!(1), Duration::from_secs(60)).await;
        cache.set("key", &json!(2), Duration::from_secs(60)).await;

        assert_eq!(cache.get("key").await, Some(json!(2)));
        assert_eq!(cache.stats().size, 1);
    }

    #[tokio::test]
    async fn test_full_cache_drops_new_keys() {
        let cache = MemoryCache::with_capacity(1);
        cache.set("a", &json!(1), Duration::from_secs(60)).await;
        cache.set("b", &json!(2), Duration::from_secs(60)).await;

        assert_eq!(cache.get("a").await, Some(json!(1)));
        assert_eq!(cache.get("b").await, None);
        assert_eq!(cache.stats().rejected, 1);
    }

    #[tokio::test]
    async fn test_full_cache_reclaims_expired_slots() {
        let cache = MemoryCache::with_capacity(1);
        cache.set("a", &json!(1), Duration::from_millis(1)).await;
        std::thread::sleep(Duration::from_millis(5));
        cache.set("b", &json!(2), Duration::from_secs(60)).await;

        assert_eq!(cache.get("b").await, Some(json!(2)));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_expired_read_keeps_concurrent_refresh() {
        use std::sync::Arc;

        for _ in 0..50 {
            let cache = Arc::new(MemoryCache::with_capacity(16));
            cache.insert("key", &json!("stale"), Duration::ZERO);

            let reader = {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache.lookup("key");
                    }
                })
            };
            cache.insert("key", &json!("fresh"), Duration::from_secs(60));
            reader.join().unwrap();

            assert_eq!(cache.lookup("key"), Some(json!("fresh")));
        }
    }

    #[tokio::test]
    async fn test_hit_rate() {
        let cache = MemoryCache::with_capacity(16);
        cache.set("key1", &json!(1), Duration::from_secs(60)).await;
        cache.set("key2", &json!(2), Duration::from_secs(60)).await;

        cache.get("key1").await;
        cache.get("key2").await;
        cache.get("key3").await;

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.666).abs() < 0.01);
    }
}
