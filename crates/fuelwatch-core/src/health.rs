//! Component health tracking
//!
//! The engine and the dispatcher each carry a status derived from the last
//! batch and the last dispatch they handled. Readiness only reflects whether
//! the agent has finished starting up, so a failing notification channel never
//! stops new batches from arriving.

use crate::engine::BatchReport;
use crate::notify::DispatchResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still working, but the last unit of work was partly lost
    Degraded,
    /// The last unit of work was lost entirely
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy() -> Self {
        Self::new(ComponentStatus::Healthy, None)
    }

    /// Health after a batch: degraded when it was non-empty and nothing in it
    /// was accepted
    pub fn from_batch(report: &BatchReport) -> Self {
        let rejected = report.rejected.len();
        if rejected > 0 && report.classified.is_empty() {
            Self::new(
                ComponentStatus::Degraded,
                Some(format!("All {} records of the last batch were rejected", rejected)),
            )
        } else {
            Self::healthy()
        }
    }

    /// Health after a dispatch: degraded when some recipients were missed,
    /// unhealthy when none were reached
    pub fn from_dispatch(result: &DispatchResult) -> Self {
        if result.is_complete() {
            return Self::healthy();
        }

        let failed = result.failed_recipients().join(", ");
        let status = if result.delivered_count() == 0 {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };
        Self::new(
            status,
            Some(format!("Undelivered notifications for: {}", failed)),
        )
    }
}

/// Overall health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

impl HealthResponse {
    /// The worst status among the components, healthy when there are none
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|health| health.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const ENGINE: &str = "engine";
    pub const DISPATCHER: &str = "dispatcher";
}

/// Shared health state of the agent
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<HashMap<String, ComponentHealth>>>,
    ready: Arc<RwLock<bool>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        self.components
            .write()
            .await
            .insert(name.to_string(), health);
    }

    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Reflect the outcome of an ingested batch on the engine component
    pub async fn record_batch(&self, report: &BatchReport) {
        self.update(components::ENGINE, ComponentHealth::from_batch(report))
            .await;
    }

    /// Reflect the outcome of a dispatch on the dispatcher component
    pub async fn record_dispatch(&self, result: &DispatchResult) {
        self.update(components::DISPATCHER, ComponentHealth::from_dispatch(result))
            .await;
    }

    pub async fn health(&self) -> HealthResponse {
        let components = self.components.read().await.clone();
        let status = HealthResponse::compute_status(&components);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        if *self.ready.read().await {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Engine not yet initialized".to_string()),
            }
        }
    }
}
