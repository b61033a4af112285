//! Integration tests for the agent API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fuelwatch_agent::api::{create_router, register_components, AppState};
use fuelwatch_core::{
    health::{components, HealthRegistry},
    DispatchConfig, Dispatcher, EngineConfig, FuelEngine, LogNotifier, Notifier, NotifyError,
};
use std::sync::Arc;
use tower::ServiceExt;

/// Notifier whose delivery channel is down
struct OfflineNotifier;

#[async_trait]
impl Notifier for OfflineNotifier {
    async fn send(&self, recipient: &str, _message: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Transport(format!("{} unreachable", recipient)))
    }
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_test_app_with(Arc::new(LogNotifier)).await
}

async fn setup_test_app_with(notifier: Arc<dyn Notifier>) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    register_components(&health_registry).await;

    let config = EngineConfig {
        recipients: vec!["+10000000001".to_string(), "+10000000002".to_string()],
        dispatch: DispatchConfig {
            initial_backoff_ms: 1,
            ..Default::default()
        },
        ..Default::default()
    };
    let dispatcher = Dispatcher::from_config(notifier, &config);
    let state = Arc::new(AppState::new(
        health_registry,
        FuelEngine::new(&config),
        dispatcher,
    ));
    let router = create_router(state.clone());

    (router, state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(get("/healthz"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"][components::ENGINE].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_when_no_alert_is_delivered() {
    let (app, state) = setup_test_app_with(Arc::new(OfflineNotifier)).await;
    state.health_registry.set_ready(true).await;

    let batch = serde_json::json!([{
        "generatorId": "G1",
        "timestamp": "2024-06-03T08:00:00Z",
        "fuelUsed": 50.0,
        "runtimeHours": 5.0
    }]);
    let response = app
        .clone()
        .oneshot(post_json("/api/v1/observations", batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["dispatches"][0]["deliveries"][0]["delivered"], false);

    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let health = body_json(response).await;
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["components"][components::DISPATCHER]["status"], "unhealthy");
    assert_eq!(health["components"][components::ENGINE]["status"], "healthy");

    // ingestion keeps flowing while the delivery channel is down
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_fully_rejected_batch_degrades_engine() {
    let (app, _state) = setup_test_app().await;

    let batch = serde_json::json!([
        {
            "generatorId": "G1",
            "timestamp": "2024-06-03T08:00:00Z",
            "runtimeHours": 5.0
        },
        {
            "generatorId": "G2",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": 1.0,
            "runtimeHours": 0.0
        }
    ]);
    let response = app
        .clone()
        .oneshot(post_json("/api/v1/observations", batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"][components::ENGINE]["status"], "degraded");

    let batch = serde_json::json!([{
        "generatorId": "G3",
        "timestamp": "2024-06-03T08:00:00Z",
        "fuelUsed": 30.0,
        "runtimeHours": 12.0
    }]);
    app.clone()
        .oneshot(post_json("/api/v1/observations", batch))
        .await
        .unwrap();

    let health = body_json(app.oneshot(get("/healthz")).await.unwrap()).await;
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_readyz_tracks_readiness() {
    let (app, state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(get("/readyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);

    state.health_registry.set_ready(true).await;

    let response = app
        .oneshot(get("/readyz"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

#[tokio::test]
async fn test_ingest_classifies_and_dispatches() {
    let (app, _state) = setup_test_app().await;

    let batch = serde_json::json!([
        {
            "generatorId": "G1",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": 50.0,
            "runtimeHours": 5.0,
            "generatorClass": "medium",
            "location": "North Yard"
        },
        {
            "generatorId": "G2",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": 30.0,
            "runtimeHours": 12.0
        },
        {
            "generatorId": "G3",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": 40.0,
            "runtimeHours": 0.0
        }
    ]);

    let response = app
        .oneshot(post_json("/api/v1/observations", batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let stats = &body["report"]["stats"];
    assert_eq!(stats["totalFuelUsage"], 80.0);
    assert_eq!(stats["activeGenerators"], 1);
    assert_eq!(stats["totalGenerators"], 2);
    assert_eq!(stats["riskScore"], 50);
    assert_eq!(
        stats["alerts"][0],
        "Suspicious activity detected in G1 at North Yard"
    );

    assert_eq!(body["report"]["rejected"][0]["generatorId"], "G3");
    assert_eq!(body["report"]["rejected"][0]["kind"], "invalid");

    let dispatches = body["dispatches"].as_array().unwrap();
    assert_eq!(dispatches.len(), 1);
    assert_eq!(dispatches[0]["generatorId"], "G1");
    assert_eq!(dispatches[0]["deliveries"].as_array().unwrap().len(), 2);
    assert_eq!(dispatches[0]["deliveries"][0]["delivered"], true);
}

#[tokio::test]
async fn test_ingest_rejects_malformed_body() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/v1/observations",
            serde_json::json!({"generatorId": "G1"}),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_ingest_rejects_malformed_records_individually() {
    let (app, _state) = setup_test_app().await;

    let batch = serde_json::json!([
        {
            "generatorId": "G1",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": 30.0,
            "runtimeHours": 12.0
        },
        {
            "generatorId": "G2",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": "n/a",
            "runtimeHours": 5.0
        },
        {
            "generatorId": "G3",
            "timestamp": "2024-06-03T08:00:00Z",
            "runtimeHours": 5.0
        }
    ]);

    let response = app
        .oneshot(post_json("/api/v1/observations", batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let report = &body["report"];
    assert_eq!(report["classified"].as_array().unwrap().len(), 1);
    assert_eq!(report["classified"][0]["observation"]["generatorId"], "G1");
    assert_eq!(report["stats"]["totalFuelUsage"], 30.0);

    let rejected = report["rejected"].as_array().unwrap();
    assert_eq!(rejected.len(), 2);
    assert_eq!(rejected[0]["index"], 1);
    assert_eq!(rejected[0]["generatorId"], "G2");
    assert_eq!(rejected[0]["kind"], "invalid");
    assert_eq!(rejected[1]["index"], 2);
    assert!(rejected[1]["reason"].as_str().unwrap().contains("fuelUsed"));
}

#[tokio::test]
async fn test_daily_report_summarises_last_batch() {
    let (app, _state) = setup_test_app().await;

    let batch = serde_json::json!([
        {
            "generatorId": "G1",
            "timestamp": "2024-06-03T08:00:00Z",
            "fuelUsed": 50.0,
            "runtimeHours": 5.0
        }
    ]);
    let response = app
        .clone()
        .oneshot(post_json("/api/v1/observations", batch))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json("/api/v1/reports/daily", serde_json::json!(null)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "ALERT: 1 suspicious fuel logs today. Please review."
    );
    assert!(body["generatorId"].is_null());
}

#[tokio::test]
async fn test_unknown_report_kind_is_rejected() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json("/api/v1/reports/monthly", serde_json::json!(null)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("monthly"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(get("/metrics"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));
}
