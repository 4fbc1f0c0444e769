//! State Coordinator Module
//!
//! Single writer of record for the process' shared runtime state: the
//! monitoring gate, pipeline counters, the settings snapshot, live
//! subscribers, background-task bookkeeping and tracked task handles.
//! Each region has its own lock so unrelated operations never queue
//! behind each other.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};

use serde_json::{json, Map, Value};
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::state::background::{CancelOutcome, TaskRegistry};
use crate::state::subscribers::SubscriberRegistry;
use crate::state::{
    Event, PipelineStats, StatsDelta, StatsUpdate, Subscriber, SubscriberId, TaskSnapshot,
    TaskStatus,
};

/// Settings every fresh coordinator starts from.
pub fn default_settings() -> Map<String, Value> {
    let defaults = json!({
        "model_type": "mistral",
        "days_back": 7,
        "custom_prompt": "",
        "resume_summary": "",
        "channels": [],
        "enable_stage2": false,
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[derive(Debug, Default)]
struct Monitoring {
    active: bool,
    handle: Option<AbortHandle>,
}

/// A tracked task: the handle used to cancel it, the watcher that
/// observes it finishing and its registry id, if it has one.
#[derive(Debug)]
struct Tracked {
    abort: AbortHandle,
    watcher: JoinHandle<()>,
    task_id: Option<String>,
}

#[derive(Debug, Default)]
struct TrackedTasks {
    next_id: u64,
    entries: HashMap<u64, Tracked>,
}

#[derive(Debug)]
struct Inner {
    monitoring: Mutex<Monitoring>,
    stats: Mutex<PipelineStats>,
    settings: RwLock<Map<String, Value>>,
    subscribers: Mutex<SubscriberRegistry>,
    tasks: Mutex<TaskRegistry>,
    tracked: Mutex<TrackedTasks>,
}

// == Coordinator ==
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new() -> Self {
        Self::with_settings(default_settings())
    }

    pub fn with_settings(settings: Map<String, Value>) -> Self {
        Self {
            inner: Arc::new(Inner {
                monitoring: Mutex::new(Monitoring::default()),
                stats: Mutex::new(PipelineStats::default()),
                settings: RwLock::new(settings),
                subscribers: Mutex::new(SubscriberRegistry::default()),
                tasks: Mutex::new(TaskRegistry::default()),
                tracked: Mutex::new(TrackedTasks::default()),
            }),
        }
    }

    /// Returns the coordinator stored in `slot`, constructing it on first
    /// use. Concurrent first callers all receive the same instance.
    pub async fn new_or_attach(slot: &OnceCell<Coordinator>) -> Coordinator {
        slot.get_or_init(|| async {
            info!("Creating state coordinator");
            Coordinator::new()
        })
        .await
        .clone()
    }

    /// True when both handles share the same state.
    pub fn ptr_eq(&self, other: &Coordinator) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // == Monitoring ==

    /// Records the monitoring loop's handle. Returns false and leaves the
    /// current loop in place if monitoring is already active.
    pub async fn start_monitoring(&self, handle: AbortHandle) -> bool {
        let mut monitoring = self.inner.monitoring.lock().await;
        if monitoring.active {
            debug!("Monitoring already active");
            return false;
        }
        monitoring.active = true;
        monitoring.handle = Some(handle);
        info!("Monitoring started");
        true
    }

    /// Clears the flag and hands back the loop's handle so the caller can cancel it.
    pub async fn stop_monitoring(&self) -> Option<AbortHandle> {
        let mut monitoring = self.inner.monitoring.lock().await;
        if monitoring.active {
            info!("Monitoring stopped");
        }
        monitoring.active = false;
        monitoring.handle.take()
    }

    pub async fn is_monitoring_active(&self) -> bool {
        self.inner.monitoring.lock().await.active
    }

    // == Statistics ==

    pub async fn update_stats(&self, update: StatsUpdate) -> PipelineStats {
        let mut stats = self.inner.stats.lock().await;
        stats.apply_update(update);
        *stats
    }

    pub async fn increment_stats(&self, delta: StatsDelta) -> PipelineStats {
        let mut stats = self.inner.stats.lock().await;
        stats.apply_delta(delta);
        *stats
    }

    pub async fn reset_stats(&self) {
        *self.inner.stats.lock().await = PipelineStats::default();
        info!("Pipeline stats reset");
    }

    pub async fn stats(&self) -> PipelineStats {
        *self.inner.stats.lock().await
    }

    // == Settings ==

    pub async fn settings(&self) -> Map<String, Value> {
        self.inner.settings.read().await.clone()
    }

    pub async fn setting(&self, key: &str) -> Option<Value> {
        self.inner.settings.read().await.get(key).cloned()
    }

    /// Merges `partial` into the snapshot and returns the result.
    pub async fn update_settings(&self, partial: Map<String, Value>) -> Map<String, Value> {
        let mut settings = self.inner.settings.write().await;
        settings.extend(partial);
        settings.clone()
    }

    pub async fn replace_settings(&self, settings: Map<String, Value>) {
        *self.inner.settings.write().await = settings;
    }

    // == Subscribers ==

    pub async fn add_subscriber(&self, subscriber: Subscriber) -> bool {
        let added = self.inner.subscribers.lock().await.add(subscriber);
        if added {
            debug!("Subscriber added");
        }
        added
    }

    pub async fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.inner.subscribers.lock().await.remove(id)
    }

    /// Snapshot copy, safe to iterate while others add or remove.
    pub async fn list_subscribers(&self) -> Vec<Subscriber> {
        self.inner.subscribers.lock().await.snapshot()
    }

    pub async fn prune_subscribers(&self, dead: &[SubscriberId]) -> usize {
        if dead.is_empty() {
            return 0;
        }
        let pruned = self.inner.subscribers.lock().await.prune(dead);
        if pruned > 0 {
            info!("Pruned {} dead subscribers", pruned);
        }
        pruned
    }

    pub async fn prune_closed_subscribers(&self) -> usize {
        let pruned = self.inner.subscribers.lock().await.prune_closed();
        if pruned > 0 {
            info!("Pruned {} closed subscribers", pruned);
        }
        pruned
    }

    pub async fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().await.len()
    }

    /// Sends `event` to every subscriber and drops the ones whose transport
    /// is gone. Returns how many received it.
    pub async fn publish(&self, event: Event) -> usize {
        let subscribers = self.list_subscribers().await;
        let mut dead = Vec::new();
        let mut delivered = 0;

        for subscriber in &subscribers {
            if subscriber.send(event.clone()) {
                delivered += 1;
            } else {
                dead.push(subscriber.id());
            }
        }

        self.prune_subscribers(&dead).await;
        delivered
    }

    // == Background Tasks ==

    /// Registers an externally spawned task as running. A record with the
    /// same id is replaced; if that task was still running it is aborted.
    pub async fn register_background_task(&self, id: impl Into<String>, handle: AbortHandle) {
        let id = id.into();
        if let Some(previous) = self.inner.tasks.lock().await.register(id.clone(), handle) {
            if previous.status == TaskStatus::Running {
                warn!("Background task {} re-registered while running, previous run aborted", id);
            }
        }
    }

    /// Returns false if the task is unknown or already finished.
    pub async fn update_background_task(
        &self,
        id: &str,
        status: TaskStatus,
        result: Option<Value>,
    ) -> bool {
        self.inner.tasks.lock().await.update(id, status, result)
    }

    pub async fn get_background_task(&self, id: &str) -> Option<TaskSnapshot> {
        self.inner.tasks.lock().await.get(id)
    }

    /// Keeps the `keep_max` most recent finished records of each kind;
    /// running tasks are never removed.
    pub async fn prune_completed_background_tasks(&self, keep_max: usize) -> usize {
        let pruned = self.inner.tasks.lock().await.prune(keep_max);
        if pruned > 0 {
            info!("Pruned {} finished background tasks", pruned);
        }
        pruned
    }

    pub async fn background_task_count(&self) -> usize {
        self.inner.tasks.lock().await.len()
    }

    /// Cancels one running background task. Returns false if it had
    /// already finished.
    pub async fn cancel_background_task(&self, id: &str) -> Result<bool> {
        let outcome = self.inner.tasks.lock().await.cancel(id);
        match outcome {
            CancelOutcome::Unknown => Err(CoreError::TaskNotFound(id.to_string())),
            CancelOutcome::AlreadyFinished => Ok(false),
            CancelOutcome::Cancelled => {
                info!("Background task {} cancelled", id);
                self.publish(Event::TaskCancelled {
                    task_id: id.to_string(),
                })
                .await;
                Ok(true)
            }
        }
    }

    /// Runs `future` as a tracked background task under `id`. Its outcome is
    /// recorded in the registry and published to subscribers once.
    pub async fn spawn_background_task<F, E>(&self, id: impl Into<String>, future: F) -> Result<()>
    where
        F: Future<Output = std::result::Result<Value, E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let id = id.into();

        // registered before the task can report back
        let job = {
            let mut tasks = self.inner.tasks.lock().await;
            if tasks.get(&id).is_some_and(|t| t.status == TaskStatus::Running) {
                return Err(CoreError::InvalidRequest(format!(
                    "background task {} is already running",
                    id
                )));
            }
            let job = tokio::spawn(future);
            tasks.register(id.clone(), job.abort_handle());
            job
        };

        let abort = job.abort_handle();
        let id_for_shutdown = id.clone();
        let coordinator = self.clone();
        let mut tracked = self.inner.tracked.lock().await;
        let tracked_id = tracked.next_id;
        tracked.next_id += 1;

        let watcher = tokio::spawn(async move {
            let outcome = job.await;
            coordinator.settle_background_task(&id, outcome).await;
            coordinator.untrack(tracked_id).await;
        });
        tracked.entries.insert(
            tracked_id,
            Tracked {
                abort,
                watcher,
                task_id: Some(id_for_shutdown),
            },
        );
        Ok(())
    }

    async fn settle_background_task<E: fmt::Display>(
        &self,
        id: &str,
        outcome: std::result::Result<std::result::Result<Value, E>, JoinError>,
    ) {
        let task_id = id.to_string();
        let (status, result, event) = match outcome {
            Ok(Ok(value)) => (
                TaskStatus::Completed,
                Some(value.clone()),
                Event::TaskFinished {
                    task_id,
                    result: value,
                },
            ),
            Ok(Err(e)) => {
                let error = e.to_string();
                warn!("Background task {} failed: {}", id, error);
                (
                    TaskStatus::Error,
                    Some(Value::String(error.clone())),
                    Event::TaskFailed { task_id, error },
                )
            }
            Err(e) if e.is_cancelled() => {
                (TaskStatus::Cancelled, None, Event::TaskCancelled { task_id })
            }
            Err(e) => {
                let error = e.to_string();
                warn!("Background task {} panicked: {}", id, error);
                (
                    TaskStatus::Error,
                    Some(Value::String(error.clone())),
                    Event::TaskFailed { task_id, error },
                )
            }
        };

        if self.update_background_task(id, status, result).await {
            self.publish(event).await;
        }
    }

    // == Tracked Tasks ==

    /// Registers a task for bulk cancellation. It leaves the tracked set on
    /// its own once it finishes. Returns its tracking id.
    pub async fn track_task<T: Send + 'static>(&self, handle: JoinHandle<T>) -> u64 {
        self.track(handle, None).await
    }

    /// Like [`Coordinator::track_task`] for a task already registered under
    /// `task_id`. If bulk cancellation stops it before it reports, its
    /// record is marked cancelled.
    pub async fn track_background_task<T: Send + 'static>(
        &self,
        task_id: impl Into<String>,
        handle: JoinHandle<T>,
    ) -> u64 {
        self.track(handle, Some(task_id.into())).await
    }

    async fn track<T: Send + 'static>(&self, handle: JoinHandle<T>, task_id: Option<String>) -> u64 {
        let abort = handle.abort_handle();
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        // the watcher cannot remove the entry before it is inserted
        let mut tracked = self.inner.tracked.lock().await;
        let id = tracked.next_id;
        tracked.next_id += 1;

        let watcher = tokio::spawn(async move {
            let _ = handle.await;
            if let Some(inner) = weak.upgrade() {
                inner.tracked.lock().await.entries.remove(&id);
            }
        });
        tracked.entries.insert(
            id,
            Tracked {
                abort,
                watcher,
                task_id,
            },
        );
        id
    }

    async fn untrack(&self, id: u64) {
        self.inner.tracked.lock().await.entries.remove(&id);
    }

    /// Requests cancellation of one tracked task. Returns false if it is no
    /// longer tracked.
    pub async fn cancel_tracked(&self, id: u64) -> bool {
        match self.inner.tracked.lock().await.entries.get(&id) {
            Some(tracked) => {
                tracked.abort.abort();
                true
            }
            None => false,
        }
    }

    /// Cancels every tracked task and waits for all of them to settle.
    /// Individual outcomes are swallowed. Returns how many were cancelled.
    pub async fn cancel_all_tracked(&self) -> usize {
        let drained: Vec<Tracked> = {
            let mut tracked = self.inner.tracked.lock().await;
            tracked.entries.drain().map(|(_, t)| t).collect()
        };
        let count = drained.len();
        if count > 0 {
            info!("Cancelling {} tracked tasks", count);
        }

        let mut task_ids = Vec::new();
        for tracked in &drained {
            tracked.abort.abort();
        }
        for tracked in drained {
            let _ = tracked.watcher.await;
            task_ids.extend(tracked.task_id);
        }

        let stopped = self.inner.tasks.lock().await.settle_stopped(&task_ids);
        for task_id in stopped {
            self.publish(Event::TaskCancelled { task_id }).await;
        }
        count
    }

    pub async fn tracked_task_count(&self) -> usize {
        self.inner.tracked.lock().await.entries.len()
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator").finish_non_exhaustive()
    }
}
