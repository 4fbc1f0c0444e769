//! Cache Module
//!
//! In-memory caching with TTL expiration and LRU eviction, plus the keyed
//! response cache placed in front of expensive model calls.

mod entry;
mod lru;
mod response;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use response::{derive_key, CategoryTtls, RequestCategory, ResponseCache, KEY_PREFIX_CHARS};
pub use stats::CacheStats;
pub use store::TtlLruCache;
