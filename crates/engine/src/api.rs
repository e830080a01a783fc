//! HTTP API: health checks, Prometheus metrics, run reports, cost
//! analysis, and manual scan triggers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use engine_lib::{
    health::{ComponentStatus, HealthRegistry},
    observability::EngineMetrics,
    report::{ReportRow, ReportStore},
    schedule::ScanRequest,
    source::{CostDimension, CostSummary, TimeRange, UsageDataSource},
    SchedulerAction,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: EngineMetrics,
    pub store: ReportStore,
    pub scan_tx: mpsc::Sender<ScanRequest>,
    pub source: Arc<dyn UsageDataSource>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        metrics: EngineMetrics,
        store: ReportStore,
        scan_tx: mpsc::Sender<ScanRequest>,
        source: Arc<dyn UsageDataSource>,
    ) -> Self {
        Self {
            health_registry,
            metrics,
            store,
            scan_tx,
            source,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct RecommendationList {
    recommendations: Vec<ReportRow>,
    total: usize,
    run_id: String,
}

#[derive(Debug, Deserialize)]
struct CostsQuery {
    days: Option<u32>,
    group_by: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ScanBody {
    dry_run: Option<bool>,
    scheduler_action: Option<SchedulerAction>,
}

#[derive(Debug, Serialize)]
struct ScanAccepted {
    status: &'static str,
}

/// Health check - returns 200 if healthy/degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
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

/// Latest run report, 404 before the first run completes
async fn get_report(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.latest().await {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no analysis run has completed yet".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Recommendation rows of the latest run
async fn get_recommendations(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.latest().await {
        Some(report) => {
            let recommendations: Vec<ReportRow> = report
                .rows
                .into_iter()
                .filter(|row| row.action.is_some())
                .collect();
            let total = recommendations.len();
            (
                StatusCode::OK,
                Json(RecommendationList {
                    recommendations,
                    total,
                    run_id: report.run_id,
                }),
            )
                .into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "no analysis run has completed yet".to_string(),
            }),
        )
            .into_response(),
    }
}

/// On-demand cost analysis grouped by a dimension
async fn get_costs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CostsQuery>,
) -> impl IntoResponse {
    let days = query.days.unwrap_or(30);
    let dimension = match parse_dimension(query.group_by.as_deref().unwrap_or("service")) {
        Some(d) => d,
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("unknown group_by '{}'", query.group_by.unwrap_or_default()),
                }),
            )
                .into_response()
        }
    };

    let range = TimeRange::last_days(chrono::Utc::now().timestamp(), days);
    match state.source.get_cost_and_usage(range, dimension).await {
        Ok(page) => (
            StatusCode::OK,
            Json(CostSummary::from_page(dimension, page)),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Queue a manual analysis run
async fn post_scan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ScanBody>,
) -> impl IntoResponse {
    let request = ScanRequest {
        dry_run: body.dry_run,
        scheduler_action: body.scheduler_action,
    };

    match state.scan_tx.try_send(request) {
        Ok(()) => (StatusCode::ACCEPTED, Json(ScanAccepted { status: "scheduled" })).into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "scan queue full".to_string(),
            }),
        )
            .into_response(),
    }
}

fn parse_dimension(value: &str) -> Option<CostDimension> {
    match value {
        "service" => Some(CostDimension::Service),
        "region" => Some(CostDimension::Region),
        "usage-type" | "usage_type" => Some(CostDimension::UsageType),
        "instance-type" | "instance_type" => Some(CostDimension::InstanceType),
        _ => None,
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/report", get(get_report))
        .route("/api/v1/recommendations", get(get_recommendations))
        .route("/api/v1/costs", get(get_costs))
        .route("/api/v1/scan", post(post_scan))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
