//! API Handlers
//!
//! HTTP request handlers for the status endpoints. Every mutation goes
//! through the coordinator or the response cache; handlers hold no state.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::models::{
    CancelTaskResponse, ClearCacheResponse, HealthResponse, MessageResponse, SettingsResponse,
    SettingsUpdate, StatsResponse,
};
use crate::pool::PoolStatus;
use crate::state::{Coordinator, TaskSnapshot};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub cache: ResponseCache<Value>,
    /// Pool owned by the storage collaborator, when one is attached
    pub pool: Option<Arc<dyn PoolStatus>>,
}

impl AppState {
    pub fn new(coordinator: Coordinator, cache: ResponseCache<Value>) -> Self {
        Self {
            coordinator,
            cache,
            pool: None,
        }
    }

    /// Builds the response cache from configuration.
    pub fn from_config(config: &Config, coordinator: Coordinator) -> Self {
        Self::new(coordinator, ResponseCache::from_config(config))
    }

    pub fn with_pool(mut self, pool: Arc<dyn PoolStatus>) -> Self {
        self.pool = Some(pool);
        self
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let coordinator = &state.coordinator;

    Json(StatsResponse {
        pipeline: coordinator.stats().await,
        cache: state.cache.stats().await,
        pool: state.pool.as_ref().map(|pool| pool.pool_stats()),
        monitoring_active: coordinator.is_monitoring_active().await,
        subscribers: coordinator.subscriber_count().await,
        tracked_tasks: coordinator.tracked_task_count().await,
    })
}

/// Handler for POST /stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.coordinator.reset_stats().await;
    Json(MessageResponse::new("Stats reset"))
}

/// Handler for GET /settings
pub async fn get_settings_handler(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(SettingsResponse {
        settings: state.coordinator.settings().await,
    })
}

/// Handler for POST /settings
///
/// Merges the posted object into the current settings.
pub async fn update_settings_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<SettingsResponse>> {
    let update = SettingsUpdate::try_from(body).map_err(CoreError::InvalidRequest)?;
    if let Some(error_msg) = update.validate() {
        return Err(CoreError::InvalidRequest(error_msg));
    }

    let settings = state.coordinator.update_settings(update.values).await;
    Ok(Json(SettingsResponse { settings }))
}

/// Handler for GET /tasks/:id
pub async fn get_task_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskSnapshot>> {
    state
        .coordinator
        .get_background_task(&id)
        .await
        .map(Json)
        .ok_or(CoreError::TaskNotFound(id))
}

/// Handler for DELETE /tasks/:id
pub async fn cancel_task_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CancelTaskResponse>> {
    let cancelled = state.coordinator.cancel_background_task(&id).await?;
    Ok(Json(CancelTaskResponse {
        task_id: id,
        cancelled,
    }))
}

/// Handler for DELETE /cache
pub async fn clear_cache_handler(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let removed = state.cache.clear().await;
    Json(ClearCacheResponse::new(removed))
}
