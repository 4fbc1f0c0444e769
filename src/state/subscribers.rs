//! Subscriber Registry Module
//!
//! Live push connections (e.g. websockets) are represented by the sending
//! half of a channel. The transport owns the receiving half; once it is
//! dropped, sends fail and the subscriber is pruned.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::state::PipelineStats;

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

// == Events ==
/// Message pushed to every live subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Stats { stats: PipelineStats },
    Monitoring { active: bool },
    Status { message: String },
    TaskFinished { task_id: String, result: Value },
    TaskFailed { task_id: String, error: String },
    TaskCancelled { task_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(u64);

// == Subscriber ==
/// Handle the coordinator keeps for one connection.
#[derive(Debug, Clone)]
pub struct Subscriber {
    id: SubscriberId,
    tx: mpsc::UnboundedSender<Event>,
}

impl Subscriber {
    /// Creates a subscriber and the receiver its transport should drain.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = SubscriberId(NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed));
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Queues an event. Returns false if the transport has gone away.
    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subscriber {}

// == Registry ==
#[derive(Debug, Default)]
pub(crate) struct SubscriberRegistry {
    subscribers: Vec<Subscriber>,
}

impl SubscriberRegistry {
    pub fn add(&mut self, subscriber: Subscriber) -> bool {
        if self.subscribers.contains(&subscriber) {
            return false;
        }
        self.subscribers.push(subscriber);
        true
    }

    pub fn remove(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    pub fn snapshot(&self) -> Vec<Subscriber> {
        self.subscribers.clone()
    }

    pub fn prune(&mut self, dead: &[SubscriberId]) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| !dead.contains(&s.id));
        before - self.subscribers.len()
    }

    pub fn prune_closed(&mut self) -> usize {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| !s.is_closed());
        before - self.subscribers.len()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }
}
