//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::stats::CacheCounters;
use crate::cache::{CacheEntry, CacheStats, LruTracker};

/// Number of key characters shown in log lines.
const LOG_KEY_CHARS: usize = 20;

// == TTL-LRU Cache ==
/// Key/value store bounded by both capacity and per-entry TTL.
///
/// Expired entries are removed lazily when read, or in bulk by
/// [`TtlLruCache::sweep_expired`]. Until then they still occupy capacity.
/// The store is a plain `&mut self` structure; callers sharing it across
/// tasks wrap it in a lock, as [`crate::cache::ResponseCache`] does.
#[derive(Debug)]
pub struct TtlLruCache<V> {
    name: String,
    entries: HashMap<String, CacheEntry<V>>,
    lru: LruTracker,
    counters: CacheCounters,
    capacity: usize,
    default_ttl: Duration,
}

impl<V: Clone> TtlLruCache<V> {
    // == Constructor ==
    /// Creates an empty cache. A capacity of zero is raised to one.
    pub fn new(name: impl Into<String>, capacity: usize, default_ttl: Duration) -> Self {
        Self {
            name: name.into(),
            entries: HashMap::new(),
            lru: LruTracker::new(),
            counters: CacheCounters::default(),
            capacity: capacity.max(1),
            default_ttl,
        }
    }

    // == Get ==
    /// Returns a copy of the value if present and not expired.
    ///
    /// A hit promotes the key to most recently used. An expired entry is
    /// removed and counted as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.counters.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.counters.record_miss();
            self.counters.record_expirations(1);
            debug!("[{}] Expired: {}", self.name, short(key));
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.record_hit();
        let value = entry.value().clone();
        let hits = entry.hit_count();
        self.lru.touch(key);
        self.counters.record_hit();
        debug!("[{}] Hit: {} (hits={})", self.name, short(key), hits);
        Some(value)
    }

    // == Set ==
    /// Stores a value with the default TTL.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.set_with_ttl(key, value, ttl);
    }

    /// Stores a value with an explicit TTL.
    ///
    /// Writing a new key into a full cache evicts the least recently used
    /// entry first. Overwriting an existing key never evicts. A zero TTL
    /// stores nothing and drops any previous value for the key.
    pub fn set_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();

        if ttl.is_zero() {
            self.remove_entry(&key);
            debug!("[{}] Zero TTL, not stored: {}", self.name, short(&key));
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.counters.record_eviction();
                debug!("[{}] Evicted: {}", self.name, short(&evicted));
            }
        }

        self.lru.touch(&key);
        debug!("[{}] Set: {}", self.name, short(&key));
        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    // == Delete ==
    /// Removes an entry by key. Absent keys are not an error.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Clear ==
    /// Removes every entry and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.lru.clear();
        info!("[{}] Cleared {} entries", self.name, count);
        count
    }

    // == Sweep Expired ==
    /// Removes all expired entries without waiting for them to be read.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_expired(&mut self) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.remove_entry(key);
        }

        self.counters.record_expirations(expired.len());
        if !expired.is_empty() {
            debug!("[{}] Swept {} expired entries", self.name, expired.len());
        }
        expired.len()
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.counters
            .snapshot(&self.name, self.entries.len(), self.capacity)
    }

    /// Whether a live (unexpired) entry exists. Does not affect recency or counters.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Keys in eviction order, least recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.lru.iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        self.lru.remove(key);
        self.entries.remove(key).is_some()
    }
}

fn short(key: &str) -> &str {
    match key.char_indices().nth(LOG_KEY_CHARS) {
        Some((idx, _)) => &key[..idx],
        None => key,
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    fn store(capacity: usize) -> TtlLruCache<String> {
        TtlLruCache::new("test", capacity, Duration::from_secs(300))
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let store = store(0);
        assert_eq!(store.capacity(), 1);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store(100);

        store.set("key1", "value1".to_string());

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store(100);
        assert_eq!(store.get("nonexistent"), None);
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_delete() {
        let mut store = store(100);

        store.set("key1", "value1".to_string());

        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store(100);

        store.set("key1", "value1".to_string());
        store.set("key1", "value2".to_string());

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let mut store = store(2);

        store.set("a", "1".to_string());
        store.set("b", "2".to_string());
        for i in 0..10 {
            store.set("b", i.to_string());
        }

        assert_eq!(store.len(), 2);
        assert!(store.contains("a"));
        assert_eq!(store.stats().evictions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_expiration() {
        let mut store = store(100);

        store.set_with_ttl("key1", "value1".to_string(), Duration::from_secs(1));
        assert!(store.get("key1").is_some());

        advance(Duration::from_millis(1100)).await;

        assert_eq!(store.get("key1"), None);
        // the expired read removed the entry; it does not come back
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_is_readable_at_exact_ttl() {
        let mut store = store(10);

        store.set_with_ttl("k", "v".to_string(), Duration::from_secs(1));
        advance(Duration::from_secs(1)).await;
        assert_eq!(store.get("k"), Some("v".to_string()));
        assert_eq!(store.sweep_expired(), 0);

        advance(Duration::from_millis(1)).await;
        assert_eq!(store.get("k"), None);
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_occupies_capacity_until_read() {
        let mut store = store(3);

        store.set_with_ttl("short", "x".to_string(), Duration::from_secs(1));
        advance(Duration::from_secs(2)).await;

        assert_eq!(store.len(), 1);
        assert!(!store.contains("short"));
    }

    #[test]
    fn test_zero_ttl_is_uncacheable() {
        let mut store = store(2);

        store.set("a", "1".to_string());
        store.set("b", "2".to_string());
        store.set_with_ttl("c", "3".to_string(), Duration::ZERO);

        assert_eq!(store.get("c"), None);
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = store(2);

        store.set("a", "1".to_string());
        store.set("b", "2".to_string());
        store.set("c", "3".to_string());

        assert_eq!(store.keys(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = store(2);

        store.set("a", "1".to_string());
        store.set("b", "2".to_string());
        store.get("a");
        store.set("c", "3".to_string());

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_capacity_one_evicts_then_inserts() {
        let mut store = store(1);

        store.set("a", "1".to_string());
        store.set("b", "2".to_string());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get("b"), Some("2".to_string()));
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(100);

        store.set("key1", "value1".to_string());
        store.get("key1");
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.capacity, 100);
        assert!((stats.hit_rate - 2.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_store_clear() {
        let mut store = store(100);
        store.set("a", "1".to_string());
        store.set("b", "2".to_string());

        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert!(store.keys().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_sweep_expired() {
        let mut store = store(100);

        store.set_with_ttl("key1", "value1".to_string(), Duration::from_secs(1));
        store.set_with_ttl("key2", "value2".to_string(), Duration::from_secs(10));

        advance(Duration::from_millis(1100)).await;

        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys(), vec!["key2".to_string()]);
        assert!(store.get("key2").is_some());
    }

    #[test]
    fn test_short_key_truncates_on_char_boundary() {
        let key = "ключ-ключ-ключ-ключ-ключ";
        assert_eq!(short(key).chars().count(), LOG_KEY_CHARS);
        assert_eq!(short("abc"), "abc");
    }
}
