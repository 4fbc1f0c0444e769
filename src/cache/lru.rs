//! LRU Tracker Module
//!
//! Implements Least Recently Used tracking for cache eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// Every touch stamps the key with a fresh, strictly increasing tick.
/// `order` is keyed by tick, so its first entry is the least recently used
/// key and iteration runs in eviction order.
#[derive(Debug, Default)]
pub struct LruTracker {
    ticks: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl LruTracker {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if unknown.
    pub fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;

        match self.ticks.get_mut(key) {
            Some(slot) => {
                let previous = std::mem::replace(slot, tick);
                if let Some(owned) = self.order.remove(&previous) {
                    self.order.insert(tick, owned);
                }
            }
            None => {
                self.ticks.insert(key.to_string(), tick);
                self.order.insert(tick, key.to_string());
            }
        }
    }

    // == Remove ==
    /// Removes a key from the tracker. Returns whether it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.ticks.remove(key) {
            Some(tick) => {
                self.order.remove(&tick);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    // == Peek Oldest ==
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    /// Keys from least to most recently used.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.values().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ticks.contains_key(key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(keys: &[&str]) -> LruTracker {
        let mut lru = LruTracker::new();
        for key in keys {
            lru.touch(key);
        }
        lru
    }

    #[test]
    fn test_empty_tracker() {
        let mut lru = LruTracker::new();
        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
        assert_eq!(lru.evict_oldest(), None);
    }

    #[test]
    fn test_insertion_order_is_eviction_order() {
        let mut lru = tracker(&["vacancy:1", "vacancy:2", "vacancy:3"]);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("vacancy:1"));
        assert_eq!(lru.evict_oldest().as_deref(), Some("vacancy:1"));
        assert!(!lru.contains("vacancy:1"));
        assert_eq!(lru.peek_oldest(), Some("vacancy:2"));
    }

    #[test]
    fn test_touch_promotes_to_most_recent() {
        // touches a, c, b leave recency a < c < b
        let mut lru = tracker(&["a", "b", "c", "a", "c", "b"]);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.iter().collect::<Vec<_>>(), vec!["a", "c", "b"]);
        while lru.evict_oldest().is_some() {}
        assert!(lru.is_empty());
    }

    #[test]
    fn test_repeated_touch_keeps_one_slot() {
        let lru = tracker(&["resume", "resume", "resume"]);
        assert_eq!(lru.len(), 1);
        assert_eq!(lru.peek_oldest(), Some("resume"));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut lru = tracker(&["x", "y", "z"]);

        assert!(lru.remove("y"));
        assert!(!lru.remove("missing"));
        assert_eq!(lru.iter().collect::<Vec<_>>(), vec!["x", "z"]);

        lru.clear();
        assert!(lru.is_empty());
        assert!(!lru.contains("x"));
    }
}
