//! Configuration Module
//!
//! Loads the scalar settings consumed by the cache, pool and coordinator
//! from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{CategoryTtls, RequestCategory};

/// Runtime configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of cached model responses
    pub cache_capacity: usize,
    /// TTL in seconds for entries written without a category
    pub cache_default_ttl: u64,
    /// Per-category TTLs in seconds
    pub ttl_vacancy_analysis: u64,
    pub ttl_recruiter_analysis: u64,
    pub ttl_resume_improvement: u64,
    pub ttl_resume_parse: u64,
    /// Number of pooled resources
    pub pool_size: usize,
    /// Seconds to wait for a pooled resource before giving up
    pub pool_acquire_timeout: u64,
    /// Finished background tasks kept for status polling
    pub task_retention: usize,
    /// Seconds between expiry sweeps and task pruning
    pub maintenance_interval: u64,
    /// HTTP port of the status API
    pub server_port: u16,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_CAPACITY` (default: 200)
    /// - `CACHE_DEFAULT_TTL` (default: 3600)
    /// - `TTL_VACANCY_ANALYSIS` (default: 3600)
    /// - `TTL_RECRUITER_ANALYSIS` (default: 1800)
    /// - `TTL_RESUME_IMPROVEMENT` (default: 900)
    /// - `TTL_RESUME_PARSE` (default: 7200)
    /// - `POOL_SIZE` (default: 5)
    /// - `POOL_ACQUIRE_TIMEOUT` (default: 30)
    /// - `TASK_RETENTION` (default: 100)
    /// - `MAINTENANCE_INTERVAL` (default: 60)
    /// - `SERVER_PORT` (default: 3000)
    ///
    /// Missing, unparsable and zero values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_capacity: positive_var("CACHE_CAPACITY", defaults.cache_capacity),
            cache_default_ttl: positive_var("CACHE_DEFAULT_TTL", defaults.cache_default_ttl),
            ttl_vacancy_analysis: positive_var("TTL_VACANCY_ANALYSIS", defaults.ttl_vacancy_analysis),
            ttl_recruiter_analysis: positive_var(
                "TTL_RECRUITER_ANALYSIS",
                defaults.ttl_recruiter_analysis,
            ),
            ttl_resume_improvement: positive_var(
                "TTL_RESUME_IMPROVEMENT",
                defaults.ttl_resume_improvement,
            ),
            ttl_resume_parse: positive_var("TTL_RESUME_PARSE", defaults.ttl_resume_parse),
            pool_size: positive_var("POOL_SIZE", defaults.pool_size),
            pool_acquire_timeout: positive_var("POOL_ACQUIRE_TIMEOUT", defaults.pool_acquire_timeout),
            task_retention: positive_var("TASK_RETENTION", defaults.task_retention),
            maintenance_interval: positive_var("MAINTENANCE_INTERVAL", defaults.maintenance_interval),
            server_port: positive_var("SERVER_PORT", defaults.server_port),
        }
    }

    pub fn category_ttls(&self) -> CategoryTtls {
        CategoryTtls {
            vacancy_analysis: Duration::from_secs(self.ttl_vacancy_analysis),
            recruiter_analysis: Duration::from_secs(self.ttl_recruiter_analysis),
            resume_improvement: Duration::from_secs(self.ttl_resume_improvement),
            resume_parse: Duration::from_secs(self.ttl_resume_parse),
        }
    }

    pub fn cache_default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_default_ttl)
    }

    pub fn pool_acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_acquire_timeout)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        let ttls = CategoryTtls::default();
        Self {
            cache_capacity: 200,
            cache_default_ttl: RequestCategory::VacancyAnalysis.default_ttl().as_secs(),
            ttl_vacancy_analysis: ttls.vacancy_analysis.as_secs(),
            ttl_recruiter_analysis: ttls.recruiter_analysis.as_secs(),
            ttl_resume_improvement: ttls.resume_improvement.as_secs(),
            ttl_resume_parse: ttls.resume_parse.as_secs(),
            pool_size: 5,
            pool_acquire_timeout: 30,
            task_retention: 100,
            maintenance_interval: 60,
            server_port: 3000,
        }
    }
}

fn positive_var<T>(name: &str, default: T) -> T
where
    T: FromStr + PartialEq + Default,
{
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .filter(|v: &T| *v != T::default())
        .unwrap_or(default)
}
