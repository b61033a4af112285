//! Fleet-wide aggregation
//!
//! Folds a batch of classified observations into a [`FleetStats`] snapshot.
//! Nothing carries over between batches.

use crate::config::RiskPolicy;
use crate::models::ClassifiedObservation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row of the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub generator_id: String,
    pub fuel_used: f64,
    pub suspicious: bool,
}

/// Aggregate snapshot of one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_fuel_usage: f64,
    /// Suspicious entries in the batch
    pub active_generators: usize,
    /// Distinct generator ids in the batch
    pub total_generators: usize,
    /// 0-100
    pub risk_score: u32,
    pub activity: Vec<ActivityEntry>,
    pub alerts: Vec<String>,
}

/// Builds fleet statistics under a configured risk policy
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: RiskPolicy,
}

impl Aggregator {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    pub fn aggregate(&self, batch: &[ClassifiedObservation]) -> FleetStats {
        let total_fuel_usage: f64 = batch.iter().map(|c| c.observation.fuel_used).sum();
        let total_generators = batch
            .iter()
            .map(|c| c.generator_id())
            .collect::<HashSet<_>>()
            .len();
        let active_generators = batch.iter().filter(|c| c.suspicious).count();

        let activity = batch
            .iter()
            .map(|c| ActivityEntry {
                generator_id: c.observation.generator_id.clone(),
                fuel_used: c.observation.fuel_used,
                suspicious: c.suspicious,
            })
            .collect();

        let mut alerts = Vec::new();
        let risk_score = match self.policy {
            RiskPolicy::SuspiciousRatio => {
                for c in batch.iter().filter(|c| c.suspicious) {
                    alerts.push(suspicious_alert(c));
                }
                ratio_risk_score(active_generators, total_generators)
            }
            RiskPolicy::UsageCeiling {
                safe_usage_limit,
                high_usage_threshold,
            } => {
                for c in batch {
                    if c.suspicious {
                        alerts.push(suspicious_alert(c));
                    }
                    if c.observation.fuel_used > high_usage_threshold {
                        alerts.push(format!(
                            "High usage detected on {} ({}L)",
                            c.observation.generator_id, c.observation.fuel_used
                        ));
                    }
                }
                if total_fuel_usage > safe_usage_limit {
                    alerts.push(format!(
                        "Total fuel usage exceeds safe limit ({}L)",
                        safe_usage_limit
                    ));
                }
                ceiling_risk_score(total_fuel_usage, safe_usage_limit)
            }
        };

        FleetStats {
            total_fuel_usage,
            active_generators,
            total_generators,
            risk_score,
            activity,
            alerts,
        }
    }
}

/// Aggregate with the default suspicious-ratio policy
pub fn aggregate(batch: &[ClassifiedObservation]) -> FleetStats {
    Aggregator::default().aggregate(batch)
}

fn suspicious_alert(classified: &ClassifiedObservation) -> String {
    match &classified.observation.location {
        Some(location) => format!(
            "Suspicious activity detected in {} at {}",
            classified.observation.generator_id, location
        ),
        None => format!(
            "Suspicious activity detected in {}",
            classified.observation.generator_id
        ),
    }
}

fn ratio_risk_score(active: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let percent = active as f64 / total as f64 * 100.0;
    percent.min(100.0).round() as u32
}

fn ceiling_risk_score(total_usage: f64, safe_usage_limit: f64) -> u32 {
    if safe_usage_limit <= 0.0 || total_usage <= 0.0 {
        return 0;
    }
    let percent = (total_usage / safe_usage_limit * 100.0).round();
    percent.min(100.0) as u32
}
