//! Integration tests for the engine API endpoints

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use engine_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    models::{ClassificationLabel, ResourceType, Savings, Verdict},
    observability::EngineMetrics,
    report::{ReportRow, ReportStore, RunReport},
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tower::ServiceExt;

#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub store: ReportStore,
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;
    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(health))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn get_report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.latest().await {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn create_test_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/report", get(get_report))
        .with_state(state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry.register(components::DATA_SOURCE).await;
    health_registry.register(components::EXECUTOR).await;

    let metrics = EngineMetrics::new();
    let state = Arc::new(AppState {
        health_registry,
        metrics,
        store: ReportStore::new(),
    });
    let router = create_test_router(state.clone());

    (router, state)
}

fn sample_report() -> RunReport {
    let rows = vec![ReportRow {
        resource_id: "i-0abc".to_string(),
        resource_type: ResourceType::Ec2Instance,
        region: "us-east-1".to_string(),
        classification: Some(ClassificationLabel::Idle),
        evidence: "average CPU 2.00% below 5.0% over 14d".to_string(),
        confidence: 0.6,
        action: Some("stop".to_string()),
        estimated_savings: Some(Savings::known(70.08)),
        verdict: Some(Verdict::NeedsReview),
        verdict_reason: Some("dry-run mode".to_string()),
        outcome: None,
        failure_reason: None,
    }];
    let summary = RunReport::compute_summary(&rows, 1);
    RunReport {
        run_id: "run-20260806T000000Z".to_string(),
        region: "us-east-1".to_string(),
        started_at: 0,
        completed_at: 12,
        dry_run: true,
        partial: false,
        rows,
        skipped: vec![],
        summary,
    }
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_unhealthy(components::DATA_SOURCE, "gateway unreachable")
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_degraded_component_still_returns_ok() {
    let (app, state) = setup_test_app().await;

    state
        .health_registry
        .set_degraded(components::DATA_SOURCE, "Cost queries throttled")
        .await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // Degraded still returns 200 (operational)
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readyz_returns_503_until_marked_ready() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app().await;

    state.health_registry.set_ready(true).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    state.metrics.observe_run_latency(2.5);
    state.metrics.observe_source_latency(0.1);
    state.metrics.record_report(&sample_report());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("cost_engine_run_latency_seconds"));
    assert!(metrics_text.contains("cost_engine_resources_scanned"));
    assert!(metrics_text.contains("cost_engine_estimated_savings_usd"));
    assert!(metrics_text.contains("cost_engine_classifications"));
}

#[tokio::test]
async fn test_report_endpoint_404_before_first_run() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/report")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_report_endpoint_serves_latest_run() {
    let (app, state) = setup_test_app().await;

    state.store.publish(sample_report()).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/report")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(report["run_id"], "run-20260806T000000Z");
    assert_eq!(report["rows"][0]["classification"], "idle");
    assert_eq!(report["rows"][0]["verdict"], "needs_review");
    assert_eq!(report["summary"]["resources_scanned"], 1);
}
