//! Observation pipeline
//!
//! Wires the validator, the per-generator ordering gate, the classifier, the
//! state tracker and the aggregator into a single entry point. Observations
//! for different generators may be processed from many threads at once; the
//! gate serializes work for a single generator.


use crate::aggregator::{Aggregator, FleetStats};
use crate::anomaly::Classifier;
use crate::config::EngineConfig;
use crate::models::{ClassifiedObservation, RawObservation};
use crate::notify::{DispatchResult, Dispatcher};
use crate::observability::{EngineMetrics, StructuredLogger};
use crate::tracker::{StateTracker, TransitionEvent};
use crate::validation::{parse_record, validate, ValidationError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Observation older than the last one accepted for its generator
#[derive(Debug, Clone, PartialEq, Error)]
#[error("observation for {generator_id} at {timestamp} precedes last accepted {last_timestamp}")]
pub struct OrderingError {
    pub generator_id: String,
    pub timestamp: DateTime<Utc>,
    pub last_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid observation: {0}")]
    Validation(#[from] ValidationError),

    #[error("out of order: {0}")]
    Ordering(#[from] OrderingError),
}

impl EngineError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            EngineError::Validation(_) => RejectionKind::Invalid,
            EngineError::Ordering(_) => RejectionKind::OutOfOrder,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    Invalid,
    OutOfOrder,
}

impl std::fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionKind::Invalid => write!(f, "invalid"),
            RejectionKind::OutOfOrder => write!(f, "out_of_order"),
        }
    }
}

/// An input record excluded from a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedObservation {
    /// Position in the submitted batch
    pub index: usize,
    pub generator_id: String,
    pub kind: RejectionKind,
    pub reason: String,
}

/// Result of processing one accepted observation
#[derive(Debug, Clone)]
pub struct Processed {
    pub classified: ClassifiedObservation,
    /// Present when the generator just entered the suspicious state
    pub transition: Option<TransitionEvent>,
}

/// Outcome of ingesting a batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub stats: FleetStats,
    pub classified: Vec<ClassifiedObservation>,
    pub transitions: Vec<TransitionEvent>,
    pub rejected: Vec<RejectedObservation>,
}

impl BatchReport {
    pub fn invalid_count(&self) -> usize {
        self.count_rejected(RejectionKind::Invalid)
    }

    pub fn out_of_order_count(&self) -> usize {
        self.count_rejected(RejectionKind::OutOfOrder)
    }

    fn count_rejected(&self, kind: RejectionKind) -> usize {
        self.rejected.iter().filter(|r| r.kind == kind).count()
    }
}

#[derive(Debug, Default)]
struct GeneratorGate {
    last_timestamp: Option<DateTime<Utc>>,
}

/// Anomaly detection and alerting engine
pub struct FuelEngine {
    classifier: Classifier,
    tracker: StateTracker,
    aggregator: Aggregator,
    gates: DashMap<String, Arc<Mutex<GeneratorGate>>>,
    metrics: EngineMetrics,
    logger: StructuredLogger,
}

impl FuelEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            classifier: Classifier::from_config(config),
            tracker: StateTracker::new(),
            aggregator: Aggregator::new(config.risk_policy.clone()),
            gates: DashMap::new(),
            metrics: EngineMetrics::new(),
            logger: StructuredLogger::new("engine"),
        }
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Validate, order-check and classify a single observation
    pub fn process(&self, raw: &RawObservation) -> Result<Processed, EngineError> {
        let observation = match validate(raw) {
            Ok(observation) => observation,
            Err(e) => return Err(self.reject_invalid(&raw.generator_id, e)),
        };

        // clone the Arc so no map shard lock is held while the gate is locked
        let gate = self
            .gates
            .entry(observation.generator_id.clone())
            .or_default()
            .value()
            .clone();
        let mut gate = gate.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(last_timestamp) = gate.last_timestamp {
            if observation.timestamp < last_timestamp {
                let err = OrderingError {
                    generator_id: observation.generator_id.clone(),
                    timestamp: observation.timestamp,
                    last_timestamp,
                };
                self.metrics.inc_out_of_order();
                self.logger.log_rejected(
                    &observation.generator_id,
                    "out_of_order",
                    &err.to_string(),
                );
                return Err(err.into());
            }
        }
        gate.last_timestamp = Some(observation.timestamp);

        let classified = self.classifier.classify(observation);
        let transition = self.tracker.observe(&classified);
        drop(gate);

        self.metrics.record_classified(&classified);
        if classified.suspicious {
            self.logger.log_suspicious(&classified);
        }
        if let Some(event) = &transition {
            self.metrics.inc_transitions();
            let previous = event.previous.map(|p| p.to_string());
            self.logger
                .log_transition(event.generator_id(), previous.as_deref());
        }

        Ok(Processed {
            classified,
            transition,
        })
    }

    /// Decode an untyped JSON record, then process it like [`Self::process`]
    pub fn process_value(&self, value: &Value) -> Result<Processed, EngineError> {
        match parse_record(value) {
            Ok(raw) => self.process(&raw),
            Err(e) => Err(self.reject_invalid(record_generator_id(value), e)),
        }
    }

    /// Process an ordered batch and aggregate the accepted observations
    ///
    /// Rejected records are reported but never abort the batch.
    pub fn ingest(&self, raws: &[RawObservation]) -> BatchReport {
        self.ingest_records(
            raws.iter()
                .map(|raw| (raw.generator_id.as_str(), self.process(raw))),
        )
    }

    /// Like [`Self::ingest`], for records that have not been decoded yet
    ///
    /// A record that does not decode is rejected as invalid at its index.
    pub fn ingest_json(&self, records: &[Value]) -> BatchReport {
        self.ingest_records(
            records
                .iter()
                .map(|value| (record_generator_id(value), self.process_value(value))),
        )
    }

    /// Notify recipients about every transition in a processed batch
    pub async fn dispatch_transitions(
        &self,
        report: &BatchReport,
        dispatcher: &Dispatcher,
    ) -> Vec<DispatchResult> {
        let mut results = Vec::with_capacity(report.transitions.len());
        for event in &report.transitions {
            debug!(generator_id = %event.generator_id(), "Dispatching alert");
            let result = dispatcher.dispatch(event).await;
            self.logger.log_dispatch(&result);
            results.push(result);
        }
        results
    }

    fn reject_invalid(&self, generator_id: &str, error: ValidationError) -> EngineError {
        self.metrics.inc_invalid();
        self.logger
            .log_rejected(generator_id, "invalid", &error.to_string());
        error.into()
    }

    fn ingest_records<'a, I>(&self, outcomes: I) -> BatchReport
    where
        I: Iterator<Item = (&'a str, Result<Processed, EngineError>)>,
    {
        let start = Instant::now();
        let mut report = BatchReport::default();

        for (index, (generator_id, outcome)) in outcomes.enumerate() {
            match outcome {
                Ok(processed) => {
                    if let Some(event) = processed.transition {
                        report.transitions.push(event);
                    }
                    report.classified.push(processed.classified);
                }
                Err(e) => report.rejected.push(RejectedObservation {
                    index,
                    generator_id: generator_id.to_string(),
                    kind: e.kind(),
                    reason: e.to_string(),
                }),
            }
        }

        report.stats = self.aggregator.aggregate(&report.classified);

        self.metrics.set_generators_tracked(self.tracker.len());
        self.metrics
            .observe_batch_latency(start.elapsed().as_secs_f64());
        self.logger.log_batch(
            report.classified.len(),
            report.invalid_count(),
            report.out_of_order_count(),
            report.transitions.len(),
            report.stats.risk_score,
        );

        report
    }
}

fn record_generator_id(value: &Value) -> &str {
    value
        .get("generatorId")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

impl Default for FuelEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
