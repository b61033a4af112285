//! Observability infrastructure for the fuel monitoring engine
//!
//! Provides:
//! - Prometheus metrics (observation tallies, alert transitions, notification outcomes, latencies)
//! - Structured logging of domain events with tracing

use crate::models::ClassifiedObservation;
use crate::notify::{DispatchResult, ReportKind};
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 10.0, 30.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    observations_processed: IntCounter,
    observations_invalid: IntCounter,
    observations_out_of_order: IntCounter,
    suspicious_observations: IntCounter,
    statistical_abstentions: IntCounter,
    alert_transitions: IntCounter,
    notifications_delivered: IntCounter,
    notifications_failed: IntCounter,
    generators_tracked: IntGauge,
    batch_latency_seconds: Histogram,
    dispatch_latency_seconds: Histogram,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            observations_processed: register_int_counter!(
                "fuelwatch_observations_processed_total",
                "Observations that passed validation and were classified"
            )
            .expect("Failed to register observations_processed"),

            observations_invalid: register_int_counter!(
                "fuelwatch_observations_invalid_total",
                "Observations rejected by validation"
            )
            .expect("Failed to register observations_invalid"),

            observations_out_of_order: register_int_counter!(
                "fuelwatch_observations_out_of_order_total",
                "Observations rejected for arriving before an already processed timestamp"
            )
            .expect("Failed to register observations_out_of_order"),

            suspicious_observations: register_int_counter!(
                "fuelwatch_suspicious_observations_total",
                "Observations classified as suspicious"
            )
            .expect("Failed to register suspicious_observations"),

            statistical_abstentions: register_int_counter!(
                "fuelwatch_statistical_abstentions_total",
                "Observations the z-score detector declined to score"
            )
            .expect("Failed to register statistical_abstentions"),

            alert_transitions: register_int_counter!(
                "fuelwatch_alert_transitions_total",
                "Normal to suspicious transitions"
            )
            .expect("Failed to register alert_transitions"),

            notifications_delivered: register_int_counter!(
                "fuelwatch_notifications_delivered_total",
                "Recipient notifications delivered"
            )
            .expect("Failed to register notifications_delivered"),

            notifications_failed: register_int_counter!(
                "fuelwatch_notifications_failed_total",
                "Recipient notifications that exhausted their retry budget"
            )
            .expect("Failed to register notifications_failed"),

            generators_tracked: register_int_gauge!(
                "fuelwatch_generators_tracked",
                "Generators with state held in memory"
            )
            .expect("Failed to register generators_tracked"),

            batch_latency_seconds: register_histogram!(
                "fuelwatch_batch_latency_seconds",
                "Time spent validating, classifying and aggregating a batch",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_latency_seconds"),

            dispatch_latency_seconds: register_histogram!(
                "fuelwatch_dispatch_latency_seconds",
                "Time spent fanning a notification out to all recipients",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register dispatch_latency_seconds"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics").finish()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (registers global metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new)
    }

    /// Record one classified observation
    pub fn record_classified(&self, classified: &ClassifiedObservation) {
        let inner = self.inner();
        inner.observations_processed.inc();
        if classified.suspicious {
            inner.suspicious_observations.inc();
        }
        if classified.statistical.is_abstained() {
            inner.statistical_abstentions.inc();
        }
    }

    pub fn inc_invalid(&self) {
        self.inner().observations_invalid.inc();
    }

    pub fn inc_out_of_order(&self) {
        self.inner().observations_out_of_order.inc();
    }

    pub fn inc_transitions(&self) {
        self.inner().alert_transitions.inc();
    }

    pub fn set_generators_tracked(&self, count: usize) {
        self.inner().generators_tracked.set(count as i64);
    }

    pub fn observe_batch_latency(&self, duration_secs: f64) {
        self.inner().batch_latency_seconds.observe(duration_secs);
    }

    /// Record the per-recipient outcomes of one dispatch
    pub fn record_dispatch(&self, result: &DispatchResult, duration_secs: f64) {
        let inner = self.inner();
        inner.dispatch_latency_seconds.observe(duration_secs);
        for outcome in &result.deliveries {
            if outcome.delivered {
                inner.notifications_delivered.inc();
            } else {
                inner.notifications_failed.inc();
            }
        }
    }

    pub fn observations_processed(&self) -> u64 {
        self.inner().observations_processed.get()
    }

    pub fn notifications_failed(&self) -> u64 {
        self.inner().notifications_failed.get()
    }
}

/// Structured logger for engine events
///
/// Emits consistent, field-rich events for rejected input, suspicious
/// readings, alert transitions and notification outcomes.
#[derive(Clone, Debug)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Log an observation excluded from the batch
    pub fn log_rejected(&self, generator_id: &str, kind: &str, reason: &str) {
        warn!(
            event = "observation_rejected",
            source = %self.source,
            generator_id = %generator_id,
            kind = %kind,
            reason = %reason,
            "Observation rejected"
        );
    }

    /// Log a suspicious classification
    pub fn log_suspicious(&self, classified: &ClassifiedObservation) {
        let detectors: Vec<String> = classified.fired.iter().map(|d| d.to_string()).collect();
        info!(
            event = "suspicious_observation",
            source = %self.source,
            generator_id = %classified.observation.generator_id,
            fuel_used = classified.observation.fuel_used,
            runtime_hours = classified.observation.runtime_hours,
            efficiency = classified.efficiency,
            z_score = ?classified.statistical.z_score(),
            detectors = %detectors.join(","),
            "Suspicious fuel consumption"
        );
    }

    /// Log a Normal -> Suspicious transition
    pub fn log_transition(&self, generator_id: &str, previous: Option<&str>) {
        warn!(
            event = "alert_transition",
            source = %self.source,
            generator_id = %generator_id,
            previous = previous.unwrap_or("unseen"),
            "Generator entered suspicious state"
        );
    }

    /// Log the outcome of a dispatch, one event per failed recipient
    pub fn log_dispatch(&self, result: &DispatchResult) {
        for outcome in result.deliveries.iter().filter(|o| !o.delivered) {
            warn!(
                event = "notification_failed",
                source = %self.source,
                generator_id = ?result.generator_id,
                recipient = %outcome.recipient,
                attempts = outcome.attempts,
                error = ?outcome.error,
                "Notification could not be delivered"
            );
        }
        debug!(
            event = "dispatch_complete",
            source = %self.source,
            generator_id = ?result.generator_id,
            delivered = result.delivered_count(),
            failed = result.failed_recipients().len(),
            "Dispatch complete"
        );
    }

    /// Log a processed batch
    pub fn log_batch(
        &self,
        processed: usize,
        invalid: usize,
        out_of_order: usize,
        transitions: usize,
        risk_score: u32,
    ) {
        info!(
            event = "batch_processed",
            source = %self.source,
            processed = processed,
            invalid = invalid,
            out_of_order = out_of_order,
            transitions = transitions,
            risk_score = risk_score,
            "Processed observation batch"
        );
    }

    /// Log a broadcast fleet report
    pub fn log_report(&self, kind: ReportKind, recipients: usize, failed: usize) {
        info!(
            event = "report_broadcast",
            source = %self.source,
            kind = %kind,
            recipients = recipients,
            failed = failed,
            "Fleet report broadcast"
        );
    }

    pub fn log_startup(&self, version: &str, recipients: usize) {
        info!(
            event = "service_started",
            source = %self.source,
            version = %version,
            recipients = recipients,
            "FuelWatch started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            source = %self.source,
            reason = %reason,
            "FuelWatch shutting down"
        );
    }
}
