//! Response DTOs for the status API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cache::CacheStats;
use crate::pool::PoolStats;
use crate::state::PipelineStats;

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub pipeline: PipelineStats,
    pub cache: CacheStats,
    /// Absent when no pool is attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolStats>,
    pub monitoring_active: bool,
    pub subscribers: usize,
    pub tracked_tasks: usize,
}

/// Response body for GET and POST /settings
#[derive(Debug, Clone, Serialize)]
pub struct SettingsResponse {
    pub settings: Map<String, Value>,
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearCacheResponse {
    /// Success message
    pub message: String,
    /// Entries removed
    pub removed: usize,
}

impl ClearCacheResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Removed {} cached responses", removed),
            removed,
        }
    }
}

/// Response body for DELETE /tasks/:id
#[derive(Debug, Clone, Serialize)]
pub struct CancelTaskResponse {
    pub task_id: String,
    /// False when the task had already finished
    pub cancelled: bool,
}

/// Generic acknowledgement, e.g. for POST /stats/reset
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
