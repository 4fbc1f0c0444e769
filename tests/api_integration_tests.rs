//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use jobwatch_core::{
    api::create_router,
    cache::{CategoryTtls, RequestCategory, ResponseCache},
    pool::{from_fn, ResourcePool},
    state::{StatsDelta, TaskStatus},
    AppState, Coordinator,
};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn test_state() -> AppState {
    AppState::new(
        Coordinator::new(),
        ResponseCache::new(100, CategoryTtls::default()),
    )
}

fn create_test_app(state: AppState) -> Router {
    create_router(state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = send(create_test_app(test_state()), "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

// == Stats Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_reports_all_components() {
    let state = test_state();
    state
        .coordinator
        .increment_stats(StatsDelta::found(3))
        .await;
    state
        .cache
        .set(RequestCategory::VacancyAnalysis, "mistral", &["vacancy"], json!({"ok": true}))
        .await;
    state
        .cache
        .get(RequestCategory::VacancyAnalysis, "mistral", &["vacancy"])
        .await;

    let (status, json) = send(create_test_app(state), "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pipeline"]["found"], 3);
    assert_eq!(json["cache"]["size"], 1);
    assert_eq!(json["cache"]["hits"], 1);
    assert_eq!(json["cache"]["hit_rate"], 1.0);
    assert_eq!(json["monitoring_active"], false);
    assert!(json.get("pool").is_none());
}

#[tokio::test]
async fn test_stats_endpoint_includes_attached_pool() {
    let pool = ResourcePool::new(
        from_fn(|| async { Ok::<_, std::io::Error>(String::from("conn")) }),
        3,
        Duration::from_secs(1),
    );
    pool.initialize().await.unwrap();
    let _borrowed = pool.acquire().await.unwrap();

    let state = test_state().with_pool(Arc::new(pool.clone()));
    let (status, json) = send(create_test_app(state), "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["pool"]["pool_size"], 3);
    assert_eq!(json["pool"]["in_use"], 1);
    assert_eq!(json["pool"]["available"], 2);
    assert_eq!(json["pool"]["initialized"], true);
}

#[tokio::test]
async fn test_stats_reset_endpoint() {
    let state = test_state();
    state
        .coordinator
        .increment_stats(StatsDelta::rejected(7))
        .await;

    let (status, _) = send(create_test_app(state.clone()), "POST", "/stats/reset", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.coordinator.stats().await.rejected, 0);
}

// == Settings Endpoint Tests ==

#[tokio::test]
async fn test_get_settings_returns_defaults() {
    let (status, json) = send(create_test_app(test_state()), "GET", "/settings", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["settings"]["model_type"], "mistral");
    assert_eq!(json["settings"]["days_back"], 7);
    assert_eq!(json["settings"]["enable_stage2"], false);
}

#[tokio::test]
async fn test_post_settings_merges() {
    let state = test_state();
    let update = json!({"model_type": "llama3", "channels": ["@rust_jobs"]});

    let (status, json) = send(create_test_app(state.clone()), "POST", "/settings", Some(update)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["settings"]["model_type"], "llama3");
    assert_eq!(json["settings"]["days_back"], 7);
    assert_eq!(
        state.coordinator.setting("channels").await,
        Some(json!(["@rust_jobs"]))
    );
}

#[tokio::test]
async fn test_post_settings_rejects_invalid_body() {
    let state = test_state();

    let (status, json) = send(create_test_app(state.clone()), "POST", "/settings", Some(json!(42))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("JSON object"));

    let (status, _) = send(create_test_app(state), "POST", "/settings", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// == Task Endpoint Tests ==

#[tokio::test]
async fn test_task_endpoint_reports_result() {
    let state = test_state();
    let (sub, mut rx) = jobwatch_core::state::Subscriber::channel();
    state.coordinator.add_subscriber(sub).await;
    state
        .coordinator
        .spawn_background_task("resume-parse-1", async {
            Ok::<_, String>(json!({"skills": ["rust", "tokio"]}))
        })
        .await
        .unwrap();
    // the finish event is published after the record is updated
    rx.recv().await.unwrap();

    let (status, json) = send(create_test_app(state), "GET", "/tasks/resume-parse-1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "resume-parse-1");
    assert_eq!(json["status"], "completed");
    assert_eq!(json["result"]["skills"][1], "tokio");
    assert!(json["finished_at"].is_string());
}

#[tokio::test]
async fn test_task_endpoint_not_found() {
    let (status, json) = send(create_test_app(test_state()), "GET", "/tasks/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_cancel_task_endpoint() {
    let state = test_state();
    state
        .coordinator
        .spawn_background_task(
            "improve-1",
            std::future::pending::<Result<Value, String>>(),
        )
        .await
        .unwrap();

    let (status, json) = send(create_test_app(state.clone()), "DELETE", "/tasks/improve-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cancelled"], true);

    let (status, json) = send(create_test_app(state.clone()), "DELETE", "/tasks/improve-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cancelled"], false);

    let snapshot = state
        .coordinator
        .get_background_task("improve-1")
        .await
        .unwrap();
    assert_eq!(snapshot.status, TaskStatus::Cancelled);

    let (status, _) = send(create_test_app(state), "DELETE", "/tasks/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_clear_cache_endpoint() {
    let state = test_state();
    for text in ["a", "b", "c"] {
        state
            .cache
            .set(RequestCategory::RecruiterAnalysis, "mistral", &[text], json!(text))
            .await;
    }

    let (status, json) = send(create_test_app(state.clone()), "DELETE", "/cache", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 3);
    assert_eq!(state.cache.stats().await.size, 0);
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = create_test_app(test_state());
    let response = app
        .oneshot(Request::builder().uri("/get/key").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
