//! Rate-threshold detection
//!
//! Stateless rules comparing an observation's consumption against the
//! expected rate for its generator class.

use crate::config::{EngineConfig, ExpectedRates};
use crate::models::{GeneratorClass, Observation};

/// Result of evaluating both threshold rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThresholdVerdict {
    /// Efficiency exceeded `expected * threshold_multiplier`
    pub rate_exceeded: bool,
    /// Fuel exceeded `expected * runtime * safety_multiplier`
    pub safety_exceeded: bool,
}

impl ThresholdVerdict {
    pub fn is_suspicious(&self) -> bool {
        self.rate_exceeded || self.safety_exceeded
    }
}

/// Flags consumption above a multiple of the class's expected rate
#[derive(Debug, Clone)]
pub struct ThresholdDetector {
    pub expected_rates: ExpectedRates,
    pub threshold_multiplier: f64,
    pub safety_multiplier: f64,
}

impl ThresholdDetector {
    pub fn new(
        expected_rates: ExpectedRates,
        threshold_multiplier: f64,
        safety_multiplier: f64,
    ) -> Self {
        Self {
            expected_rates,
            threshold_multiplier,
            safety_multiplier,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.expected_rates.clone(),
            config.threshold_multiplier,
            config.safety_multiplier,
        )
    }

    /// Primary rule on its own
    pub fn is_rate_suspicious(&self, efficiency: f64, class: GeneratorClass) -> bool {
        efficiency > self.expected_rates.rate_for(class) * self.threshold_multiplier
    }

    /// Evaluate the primary rule and the safety-net rule
    ///
    /// The safety net is implied by the primary rule while
    /// `safety_multiplier >= threshold_multiplier`; it is still evaluated so
    /// each rule can be audited on its own when the multipliers are tuned apart.
    pub fn evaluate(&self, observation: &Observation) -> ThresholdVerdict {
        let expected = self.expected_rates.rate_for(observation.generator_class);
        let safety_limit = self.safety_multiplier * expected * observation.runtime_hours;

        ThresholdVerdict {
            rate_exceeded: self.is_rate_suspicious(
                observation.efficiency(),
                observation.generator_class,
            ),
            safety_exceeded: observation.fuel_used > safety_limit,
        }
    }
}

impl Default for ThresholdDetector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}
