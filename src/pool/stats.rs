//! Pool Statistics Module

use serde::Serialize;

// == Pool Stats ==
/// Point-in-time view of a pool's accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub pool_size: usize,
    /// Resources idle in the pool
    pub available: usize,
    /// Resources currently borrowed
    pub in_use: usize,
    pub initialized: bool,
}

// == Shutdown Report ==
/// Outcome of a pool shutdown. Destructor failures are collected here
/// instead of aborting the teardown of the remaining resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    /// Resources whose destructor succeeded
    pub destroyed: usize,
    /// Messages of destructors that failed
    pub failures: Vec<String>,
    /// Borrows still outstanding when shutdown gave up waiting; they are
    /// dropped instead of readmitted when returned
    pub abandoned: usize,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.abandoned == 0
    }
}

/// Object-safe view of a pool's stats, for callers that do not know its resource type.
pub trait PoolStatus: Send + Sync {
    fn pool_stats(&self) -> PoolStats;
}
