//! Shared runtime state
//!
//! Everything the orchestration layer reads or mutates concurrently is
//! routed through [`Coordinator`].

mod background;
mod coordinator;
mod stats;
mod subscribers;

pub use background::{TaskSnapshot, TaskStatus};
pub use coordinator::{default_settings, Coordinator};
pub use stats::{PipelineStats, StatsDelta, StatsUpdate};
pub use subscribers::{Event, Subscriber, SubscriberId};
