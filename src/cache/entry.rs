//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A stored value plus the metadata needed for expiry and hit accounting.
///
/// `created_at` is fixed at construction; overwriting a key builds a new entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            hit_count: 0,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Time elapsed since the entry was written.
    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry whose age equals its TTL is still live;
    /// it expires only once the age exceeds the TTL.
    pub fn is_expired(&self) -> bool {
        self.age() > self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, `Duration::ZERO` once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }

    // == Record Hit ==
    pub(crate) fn record_hit(&mut self) {
        self.hit_count = self.hit_count.saturating_add(1);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_entry_creation() {
        let entry = CacheEntry::new("test_value", Duration::from_secs(60));

        assert_eq!(*entry.value(), "test_value");
        assert_eq!(entry.hit_count(), 0);
        assert_eq!(entry.ttl(), Duration::from_secs(60));
        assert!(!entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new("test_value", Duration::from_secs(1));
        assert!(!entry.is_expired());

        advance(Duration::from_millis(1100)).await;

        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining() {
        let entry = CacheEntry::new("test_value", Duration::from_secs(10));

        advance(Duration::from_secs(4)).await;
        assert_eq!(entry.ttl_remaining(), Duration::from_secs(6));

        advance(Duration::from_secs(10)).await;
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_live_at_exact_ttl() {
        let entry = CacheEntry::new(1u32, Duration::from_secs(2));

        advance(Duration::from_secs(2)).await;
        assert!(!entry.is_expired(), "Entry should still be live at boundary");

        advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_expires_after_any_elapsed_time() {
        let entry = CacheEntry::new(1u32, Duration::ZERO);
        assert!(!entry.is_expired());

        advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_count_and_created_at() {
        let mut entry = CacheEntry::new(7u32, Duration::from_secs(5));
        let created = entry.created_at();

        advance(Duration::from_secs(1)).await;
        entry.record_hit();
        entry.record_hit();

        assert_eq!(entry.hit_count(), 2);
        assert_eq!(entry.created_at(), created);
        assert_eq!(entry.age(), Duration::from_secs(1));
    }
}
