//! Background Task Registry Module
//!
//! Status and result of named background jobs, kept for later polling.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::task::AbortHandle;

// == Task Status ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Error,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

// == Task Snapshot ==
/// Copy of a registry entry handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    pub result: Option<Value>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct TaskRecord {
    handle: Option<AbortHandle>,
    status: TaskStatus,
    result: Option<Value>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    /// Order in which records reached a terminal status.
    finished_seq: u64,
}

impl TaskRecord {
    fn snapshot(&self, id: &str) -> TaskSnapshot {
        TaskSnapshot {
            id: id.to_string(),
            status: self.status,
            result: self.result.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        }
    }
}

/// Outcome of a single-task cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CancelOutcome {
    Cancelled,
    AlreadyFinished,
    Unknown,
}

// == Registry ==
#[derive(Debug, Default)]
pub(crate) struct TaskRegistry {
    records: HashMap<String, TaskRecord>,
    next_seq: u64,
}

impl TaskRegistry {
    /// Records a running task, replacing any previous record with that id.
    /// A replaced record that was still running has its task aborted.
    pub fn register(&mut self, id: String, handle: AbortHandle) -> Option<TaskSnapshot> {
        let record = TaskRecord {
            handle: Some(handle),
            status: TaskStatus::Running,
            result: None,
            started_at: Utc::now(),
            finished_at: None,
            finished_seq: 0,
        };
        let previous = self.records.insert(id.clone(), record)?;
        if !previous.status.is_terminal() {
            if let Some(handle) = &previous.handle {
                handle.abort();
            }
        }
        Some(previous.snapshot(&id))
    }

    /// Sets the status (and result, when given). A terminal status is
    /// final: later updates are ignored and `false` is returned.
    pub fn update(&mut self, id: &str, status: TaskStatus, result: Option<Value>) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }

        record.status = status;
        if result.is_some() {
            record.result = result;
        }
        if status.is_terminal() {
            record.handle = None;
            record.finished_at = Some(Utc::now());
            record.finished_seq = self.next_seq;
            self.next_seq += 1;
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<TaskSnapshot> {
        self.records.get(id).map(|record| record.snapshot(id))
    }

    pub fn cancel(&mut self, id: &str) -> CancelOutcome {
        let Some(record) = self.records.get_mut(id) else {
            return CancelOutcome::Unknown;
        };
        if record.status.is_terminal() {
            return CancelOutcome::AlreadyFinished;
        }
        if let Some(handle) = &record.handle {
            handle.abort();
        }
        self.update(id, TaskStatus::Cancelled, None);
        CancelOutcome::Cancelled
    }

    /// Marks those of `ids` that are still running but whose task has
    /// stopped as cancelled. Returns their ids.
    pub fn settle_stopped(&mut self, ids: &[String]) -> Vec<String> {
        let stopped: Vec<String> = ids
            .iter()
            .filter(|id| {
                self.records.get(id.as_str()).is_some_and(|r| {
                    r.status == TaskStatus::Running
                        && r.handle.as_ref().is_some_and(AbortHandle::is_finished)
                })
            })
            .cloned()
            .collect();

        for id in &stopped {
            self.update(id, TaskStatus::Cancelled, None);
        }
        stopped
    }

    /// Keeps the `keep_max` most recently finished completed/errored
    /// records and, separately, the `keep_max` most recent cancelled ones.
    /// Running records are never removed.
    pub fn prune(&mut self, keep_max: usize) -> usize {
        let done = self.prune_class(keep_max, |s| {
            matches!(s, TaskStatus::Completed | TaskStatus::Error)
        });
        let cancelled = self.prune_class(keep_max, |s| s == TaskStatus::Cancelled);
        done + cancelled
    }

    fn prune_class(&mut self, keep_max: usize, in_class: impl Fn(TaskStatus) -> bool) -> usize {
        let mut finished: Vec<(u64, String)> = self
            .records
            .iter()
            .filter(|(_, r)| in_class(r.status))
            .map(|(id, r)| (r.finished_seq, id.clone()))
            .collect();

        if finished.len() <= keep_max {
            return 0;
        }

        finished.sort_unstable();
        let excess = finished.len() - keep_max;
        for (_, id) in finished.into_iter().take(excess) {
            self.records.remove(&id);
        }
        excess
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}
