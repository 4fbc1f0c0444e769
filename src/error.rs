//! Error types for the coordination layer
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Boxed error produced by externally supplied resource constructors and destructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Core Error Enum ==
/// Unified error type for the cache, pool and coordinator.
///
/// Cache misses and absent keys are not errors; they are reported through
/// `Option` and `bool` returns.
#[derive(Error, Debug)]
pub enum CoreError {
    /// No pooled resource became available within the acquisition timeout
    #[error("Timed out after {0:?} waiting for a pooled resource")]
    Timeout(Duration),

    /// The resource constructor failed; the pool was left uninitialized
    #[error("Resource construction failed: {0}")]
    Construction(#[source] BoxError),

    /// The pool was shut down while a borrow was being granted
    #[error("Resource pool is shut down")]
    PoolClosed,

    /// Unknown background task id
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            CoreError::Timeout(_) | CoreError::PoolClosed => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CoreError::Construction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the coordination layer.
pub type Result<T> = std::result::Result<T, CoreError>;
