//! Fuel consumption anomaly detection and alerting
//!
//! This crate provides:
//! - Validation of raw fuel/runtime observations
//! - Rule-based and statistical suspicion classification
//! - Fleet-wide usage and risk aggregation
//! - Edge-triggered alerting with per-recipient dispatch results
//! - Configuration, health checks and observability

pub mod aggregator;
pub mod anomaly;
pub mod config;
pub mod engine;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod tracker;
pub mod validation;

pub use aggregator::{ActivityEntry, Aggregator, FleetStats};
pub use config::{ConfigError, DispatchConfig, EngineConfig, ExpectedRates, RiskPolicy};
pub use engine::{
    BatchReport, EngineError, FuelEngine, OrderingError, Processed, RejectedObservation,
    RejectionKind,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use notify::{
    DispatchResult, Dispatcher, LogNotifier, Notifier, NotifyError, RecipientOutcome, ReportKind,
};
pub use observability::{EngineMetrics, StructuredLogger};
pub use tracker::{StateTracker, SuspicionState, TransitionEvent};
pub use validation::{parse_record, validate, validate_value, ValidationError};
