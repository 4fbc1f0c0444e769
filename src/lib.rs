//! Jobwatch Core - cache and resource coordination for an LLM-filtered message watcher
//!
//! Provides a TTL-LRU cache, a keyed response cache for model calls, a
//! bounded resource pool, and the state coordinator that owns all shared
//! runtime state.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod pool;
pub mod state;
pub mod tasks;

pub use api::{create_router, AppState};
pub use cache::{RequestCategory, ResponseCache, TtlLruCache};
pub use config::Config;
pub use error::{CoreError, Result};
pub use pool::{ManageResource, PooledResource, ResourcePool};
pub use state::Coordinator;
pub use tasks::spawn_maintenance_task;
