//! Resource Pool Module
//!
//! Bounded pool of expensive handles (e.g. database connections) with
//! timeout-bounded, guard-scoped borrowing.

mod manager;
mod resource_pool;
mod stats;

pub use manager::{from_fn, FnManager, ManageResource};
pub use resource_pool::{PooledResource, ResourcePool};
pub use stats::{PoolStats, PoolStatus, ShutdownReport};
