//! HTTP API for ingestion, fleet reports, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fuelwatch_core::{
    health::{components, ComponentStatus, HealthRegistry},
    BatchReport, DispatchResult, Dispatcher, FleetStats, FuelEngine, ReportKind, StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Shared application state
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub engine: FuelEngine,
    pub dispatcher: Dispatcher,
    pub logger: StructuredLogger,
    /// Statistics of the most recently ingested batch
    pub last_stats: RwLock<FleetStats>,
}

impl AppState {
    pub fn new(
        health_registry: HealthRegistry,
        engine: FuelEngine,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            health_registry,
            engine,
            dispatcher,
            logger: StructuredLogger::new("agent"),
            last_stats: RwLock::new(FleetStats::default()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub report: BatchReport,
    pub dispatches: Vec<DispatchResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // undelivered notifications do not stop ingestion
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
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
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Ingest an ordered batch of observations and alert on new transitions
///
/// Records are decoded one by one, so a malformed record is reported at its
/// index instead of failing the whole request.
async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<Vec<Value>>,
) -> impl IntoResponse {
    let report = state.engine.ingest_json(&batch);
    state.health_registry.record_batch(&report).await;

    let dispatches = state
        .engine
        .dispatch_transitions(&report, &state.dispatcher)
        .await;
    for result in &dispatches {
        state.health_registry.record_dispatch(result).await;
    }
    *state.last_stats.write().await = report.stats.clone();

    (StatusCode::OK, Json(IngestResponse { report, dispatches }))
}

/// Broadcast a daily or weekly summary of the last ingested batch
async fn broadcast_report(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Response {
    let kind: ReportKind = match kind.parse() {
        Ok(kind) => kind,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let stats = state.last_stats.read().await.clone();
    let result = state.dispatcher.broadcast_report(kind, &stats).await;

    state.health_registry.record_dispatch(&result).await;
    state.logger.log_report(
        kind,
        result.deliveries.len(),
        result.failed_recipients().len(),
    );

    (StatusCode::OK, Json(result)).into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/observations", post(ingest))
        .route("/api/v1/reports/:kind", post(broadcast_report))
        .with_state(state)
}

/// Register the components whose health the agent reports
pub async fn register_components(registry: &HealthRegistry) {
    registry.register(components::ENGINE).await;
    registry.register(components::DISPATCHER).await;
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
