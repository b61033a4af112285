//! Core data models for the fuel monitoring engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fuel/runtime reading as received from the host's log store
///
/// Nothing here is trusted; it must pass through the validator before any
/// detector sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    pub generator_id: String,
    pub timestamp: DateTime<Utc>,
    pub fuel_used: f64,
    pub runtime_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Size class of a generator, which selects its expected consumption rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorClass {
    Small,
    #[default]
    Medium,
    Large,
}

impl GeneratorClass {
    /// Parse a class name, case-insensitively. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "small" => Some(GeneratorClass::Small),
            "medium" => Some(GeneratorClass::Medium),
            "large" => Some(GeneratorClass::Large),
            _ => None,
        }
    }
}

impl std::fmt::Display for GeneratorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorClass::Small => write!(f, "small"),
            GeneratorClass::Medium => write!(f, "medium"),
            GeneratorClass::Large => write!(f, "large"),
        }
    }
}

/// A validated observation
///
/// Constructed only by [`crate::validation::validate`], so `runtime_hours` is
/// always strictly positive and `fuel_used` non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub generator_id: String,
    pub timestamp: DateTime<Utc>,
    pub fuel_used: f64,
    pub runtime_hours: f64,
    pub generator_class: GeneratorClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Observation {
    /// Litres consumed per runtime-hour
    pub fn efficiency(&self) -> f64 {
        self.fuel_used / self.runtime_hours
    }
}

/// Detector rule that contributed to a suspicious verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    /// Efficiency above expected rate times the threshold multiplier
    RateThreshold,
    /// Fuel above expected rate times runtime times the safety multiplier
    SafetyNet,
    /// Efficiency z-score above the configured threshold
    Statistical,
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorKind::RateThreshold => write!(f, "rate-threshold"),
            DetectorKind::SafetyNet => write!(f, "safety-net"),
            DetectorKind::Statistical => write!(f, "statistical"),
        }
    }
}

/// Why the statistical detector declined to score a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbstainReason {
    /// Fewer than two samples in the baseline
    InsufficientSamples,
    /// Baseline has no spread (all samples identical)
    ZeroVariance,
    /// Baseline mean or spread overflowed to a non-finite value
    NonFinite,
}

/// Outcome of the statistical detector for one sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StatisticalVerdict {
    Suspicious { z_score: f64 },
    Normal { z_score: f64 },
    Abstained { reason: AbstainReason },
}

impl StatisticalVerdict {
    pub fn is_suspicious(&self) -> bool {
        matches!(self, StatisticalVerdict::Suspicious { .. })
    }

    pub fn is_abstained(&self) -> bool {
        matches!(self, StatisticalVerdict::Abstained { .. })
    }

    pub fn z_score(&self) -> Option<f64> {
        match self {
            StatisticalVerdict::Suspicious { z_score } | StatisticalVerdict::Normal { z_score } => {
                Some(*z_score)
            }
            StatisticalVerdict::Abstained { .. } => None,
        }
    }
}

/// An observation with its suspicion verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedObservation {
    pub observation: Observation,
    pub efficiency: f64,
    pub suspicious: bool,
    /// Detectors that fired, in evaluation order
    pub fired: Vec<DetectorKind>,
    pub statistical: StatisticalVerdict,
}

impl ClassifiedObservation {
    pub fn generator_id(&self) -> &str {
        &self.observation.generator_id
    }

    pub fn fired_by(&self, kind: DetectorKind) -> bool {
        self.fired.contains(&kind)
    }
}
