//! Response Cache Module
//!
//! Caches expensive model responses under keys derived from the request
//! inputs, with a separate TTL per request category.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, TtlLruCache};
use crate::config::Config;

/// Only this many leading characters of each input take part in the key.
pub const KEY_PREFIX_CHARS: usize = 500;

// == Request Category ==
/// Kind of expensive request; each kind has its own TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestCategory {
    VacancyAnalysis,
    RecruiterAnalysis,
    ResumeImprovement,
    ResumeParse,
}

impl RequestCategory {
    pub const ALL: [RequestCategory; 4] = [
        RequestCategory::VacancyAnalysis,
        RequestCategory::RecruiterAnalysis,
        RequestCategory::ResumeImprovement,
        RequestCategory::ResumeParse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RequestCategory::VacancyAnalysis => "vacancy_analysis",
            RequestCategory::RecruiterAnalysis => "recruiter_analysis",
            RequestCategory::ResumeImprovement => "resume_improvement",
            RequestCategory::ResumeParse => "resume_parse",
        }
    }

    /// Built-in TTL: 1 h, 30 min, 15 min and 2 h respectively.
    pub fn default_ttl(self) -> Duration {
        match self {
            RequestCategory::VacancyAnalysis => Duration::from_secs(3600),
            RequestCategory::RecruiterAnalysis => Duration::from_secs(1800),
            RequestCategory::ResumeImprovement => Duration::from_secs(900),
            RequestCategory::ResumeParse => Duration::from_secs(7200),
        }
    }
}

impl fmt::Display for RequestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Category TTLs ==
/// TTL table, one entry per [`RequestCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTtls {
    pub vacancy_analysis: Duration,
    pub recruiter_analysis: Duration,
    pub resume_improvement: Duration,
    pub resume_parse: Duration,
}

impl CategoryTtls {
    pub fn ttl_for(&self, category: RequestCategory) -> Duration {
        match category {
            RequestCategory::VacancyAnalysis => self.vacancy_analysis,
            RequestCategory::RecruiterAnalysis => self.recruiter_analysis,
            RequestCategory::ResumeImprovement => self.resume_improvement,
            RequestCategory::ResumeParse => self.resume_parse,
        }
    }
}

impl Default for CategoryTtls {
    fn default() -> Self {
        Self {
            vacancy_analysis: RequestCategory::VacancyAnalysis.default_ttl(),
            recruiter_analysis: RequestCategory::RecruiterAnalysis.default_ttl(),
            resume_improvement: RequestCategory::ResumeImprovement.default_ttl(),
            resume_parse: RequestCategory::ResumeParse.default_ttl(),
        }
    }
}

// == Key Derivation ==
/// Builds `"<category>:<model>:<sha256 hex>"` from the request inputs.
///
/// Each input is cut to [`KEY_PREFIX_CHARS`] characters and hashed with its
/// byte length in front, so `["ab", "c"]` and `["a", "bc"]` differ and two
/// inputs only collide when their prefixes are identical.
pub fn derive_key(category: RequestCategory, model: &str, inputs: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for input in inputs {
        let prefix = truncate_chars(input, KEY_PREFIX_CHARS);
        hasher.update((prefix.len() as u64).to_le_bytes());
        hasher.update(prefix.as_bytes());
    }
    format!("{}:{}:{:x}", category, model, hasher.finalize())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

// == Response Cache ==
/// Shared, lock-protected [`TtlLruCache`] addressed by request inputs.
///
/// Cloning is cheap and every clone sees the same entries. Values are
/// cloned out on read; mutating a returned value does not touch the cache.
#[derive(Debug)]
pub struct ResponseCache<V> {
    inner: Arc<Mutex<TtlLruCache<V>>>,
    ttls: CategoryTtls,
}

impl<V> Clone for ResponseCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttls: self.ttls,
        }
    }
}

impl<V: Clone + Send> ResponseCache<V> {
    pub fn new(capacity: usize, ttls: CategoryTtls) -> Self {
        Self::with_default_ttl(capacity, ttls.vacancy_analysis, ttls)
    }

    /// `default_ttl` is the fallback of the underlying store; every
    /// categorized write uses its category's TTL.
    pub fn with_default_ttl(capacity: usize, default_ttl: Duration, ttls: CategoryTtls) -> Self {
        Self {
            inner: Arc::new(Mutex::new(TtlLruCache::new("ai_cache", capacity, default_ttl))),
            ttls,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::with_default_ttl(
            config.cache_capacity,
            config.cache_default_ttl(),
            config.category_ttls(),
        )
    }

    pub async fn default_ttl(&self) -> Duration {
        self.inner.lock().await.default_ttl()
    }

    pub fn ttl_for(&self, category: RequestCategory) -> Duration {
        self.ttls.ttl_for(category)
    }

    pub async fn get(&self, category: RequestCategory, model: &str, inputs: &[&str]) -> Option<V> {
        let key = derive_key(category, model, inputs);
        self.inner.lock().await.get(&key)
    }

    pub async fn set(&self, category: RequestCategory, model: &str, inputs: &[&str], value: V) {
        let key = derive_key(category, model, inputs);
        let ttl = self.ttls.ttl_for(category);
        self.inner.lock().await.set_with_ttl(key, value, ttl);
    }

    // == Get Or Compute ==
    /// Returns the cached value, or runs `compute` and caches its result.
    ///
    /// `None` from `compute` is passed through and not cached, so a failed
    /// call is retried on the next request. The lock is not held while
    /// `compute` runs; concurrent misses on one key may each compute.
    pub async fn get_or_compute<F, Fut>(
        &self,
        category: RequestCategory,
        model: &str,
        inputs: &[&str],
        compute: F,
    ) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        let key = derive_key(category, model, inputs);

        if let Some(cached) = self.inner.lock().await.get(&key) {
            return Some(cached);
        }

        debug!("Cache miss for {} ({}), computing", category, model);
        let computed = compute().await?;

        let ttl = self.ttls.ttl_for(category);
        self.inner
            .lock()
            .await
            .set_with_ttl(key, computed.clone(), ttl);
        Some(computed)
    }

    pub async fn delete(&self, category: RequestCategory, model: &str, inputs: &[&str]) -> bool {
        let key = derive_key(category, model, inputs);
        self.inner.lock().await.delete(&key)
    }

    pub async fn clear(&self) -> usize {
        self.inner.lock().await.clear()
    }

    pub async fn sweep_expired(&self) -> usize {
        self.inner.lock().await.sweep_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.lock().await.stats()
    }
}
