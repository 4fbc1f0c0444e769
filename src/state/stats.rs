//! Pipeline Statistics Module
//!
//! The four counters reported to the UI while messages are being filtered.

use serde::Serialize;

// == Pipeline Stats ==
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Messages picked up from the source
    pub found: u64,
    /// Messages the model has answered for
    pub processed: u64,
    /// Messages judged irrelevant
    pub rejected: u64,
    /// Messages judged relevant
    pub suitable: u64,
}

/// Absolute values; `None` leaves a counter untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsUpdate {
    pub found: Option<u64>,
    pub processed: Option<u64>,
    pub rejected: Option<u64>,
    pub suitable: Option<u64>,
}

/// Amounts to add to each counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub found: u64,
    pub processed: u64,
    pub rejected: u64,
    pub suitable: u64,
}

impl StatsDelta {
    pub fn found(n: u64) -> Self {
        Self {
            found: n,
            ..Self::default()
        }
    }

    pub fn processed(n: u64) -> Self {
        Self {
            processed: n,
            ..Self::default()
        }
    }

    pub fn rejected(n: u64) -> Self {
        Self {
            rejected: n,
            ..Self::default()
        }
    }

    pub fn suitable(n: u64) -> Self {
        Self {
            suitable: n,
            ..Self::default()
        }
    }
}

impl PipelineStats {
    pub(crate) fn apply_update(&mut self, update: StatsUpdate) {
        if let Some(found) = update.found {
            self.found = found;
        }
        if let Some(processed) = update.processed {
            self.processed = processed;
        }
        if let Some(rejected) = update.rejected {
            self.rejected = rejected;
        }
        if let Some(suitable) = update.suitable {
            self.suitable = suitable;
        }
    }

    pub(crate) fn apply_delta(&mut self, delta: StatsDelta) {
        self.found = self.found.saturating_add(delta.found);
        self.processed = self.processed.saturating_add(delta.processed);
        self.rejected = self.rejected.saturating_add(delta.rejected);
        self.suitable = self.suitable.saturating_add(delta.suitable);
    }
}
