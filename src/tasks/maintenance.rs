//! Maintenance Task
//!
//! Periodically reclaims memory the core never frees on its own: expired
//! response-cache entries, finished background-task records and
//! subscribers whose transport has gone away.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::state::Coordinator;

/// What one maintenance pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub expired_entries: usize,
    pub pruned_tasks: usize,
    pub pruned_subscribers: usize,
}

/// Runs a single pass.
pub async fn run_maintenance<V: Clone + Send>(
    cache: &ResponseCache<V>,
    coordinator: &Coordinator,
    keep_max: usize,
) -> MaintenanceReport {
    let report = MaintenanceReport {
        expired_entries: cache.sweep_expired().await,
        pruned_tasks: coordinator.prune_completed_background_tasks(keep_max).await,
        pruned_subscribers: coordinator.prune_closed_subscribers().await,
    };

    if report == MaintenanceReport::default() {
        debug!("Maintenance: nothing to reclaim");
    } else {
        info!(
            "Maintenance: removed {} expired entries, {} task records, {} subscribers",
            report.expired_entries, report.pruned_tasks, report.pruned_subscribers
        );
    }
    report
}

/// Spawns a task that calls [`run_maintenance`] every `period`.
///
/// The first pass runs one period after spawning. The returned handle is
/// meant to be tracked by the coordinator so shutdown cancels it.
pub fn spawn_maintenance_task<V>(
    cache: ResponseCache<V>,
    coordinator: Coordinator,
    period: Duration,
    keep_max: usize,
) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting maintenance task with interval of {} seconds",
            period.as_secs()
        );

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            run_maintenance(&cache, &coordinator, keep_max).await;
        }
    })
}
