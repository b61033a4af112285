//! Suspicion classification
//!
//! Combines the threshold and statistical detectors. Either one can flag an
//! observation on its own: false positives are cheaper than a missed theft.

use super::{StatisticalDetector, ThresholdDetector};
use crate::config::EngineConfig;
use crate::models::{ClassifiedObservation, DetectorKind, Observation};

pub struct Classifier {
    threshold: ThresholdDetector,
    statistical: StatisticalDetector,
}

impl Classifier {
    pub fn new(threshold: ThresholdDetector, statistical: StatisticalDetector) -> Self {
        Self {
            threshold,
            statistical,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            ThresholdDetector::from_config(config),
            StatisticalDetector::from_config(config),
        )
    }

    /// Classify one observation, updating the generator's rolling window
    pub fn classify(&self, observation: Observation) -> ClassifiedObservation {
        let efficiency = observation.efficiency();
        let threshold = self.threshold.evaluate(&observation);
        let statistical = self
            .statistical
            .is_statistically_suspicious(&observation.generator_id, efficiency);

        let mut fired = Vec::new();
        if threshold.rate_exceeded {
            fired.push(DetectorKind::RateThreshold);
        }
        if threshold.safety_exceeded {
            fired.push(DetectorKind::SafetyNet);
        }
        if statistical.is_suspicious() {
            fired.push(DetectorKind::Statistical);
        }

        ClassifiedObservation {
            observation,
            efficiency,
            suspicious: !fired.is_empty(),
            fired,
            statistical,
        }
    }

    pub fn threshold_detector(&self) -> &ThresholdDetector {
        &self.threshold
    }

    pub fn statistical_detector(&self) -> &StatisticalDetector {
        &self.statistical
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeneratorClass, StatisticalVerdict};
    use chrono::Utc;

    fn observation(id: &str, fuel: f64, runtime: f64) -> Observation {
        Observation {
            generator_id: id.to_string(),
            timestamp: Utc::now(),
            fuel_used: fuel,
            runtime_hours: runtime,
            generator_class: GeneratorClass::Medium,
            location: None,
        }
    }

    #[test]
    fn test_rule_based_flag() {
        let classifier = Classifier::default();
        let classified = classifier.classify(observation("G1", 50.0, 5.0));

        assert!(classified.suspicious);
        assert_eq!(classified.efficiency, 10.0);
        assert!(classified.fired_by(DetectorKind::RateThreshold));
        assert!(classified.fired_by(DetectorKind::SafetyNet));
        assert!(!classified.fired_by(DetectorKind::Statistical));
        assert!(classified.statistical.is_abstained());
    }

    #[test]
    fn test_normal_reading() {
        let classifier = Classifier::default();
        let classified = classifier.classify(observation("G2", 30.0, 12.0));

        assert!(!classified.suspicious);
        assert!(classified.fired.is_empty());
    }

    #[test]
    fn test_statistical_only_flag() {
        // raise the rate multipliers so only the z-score rule can fire
        let mut config = EngineConfig::default();
        config.threshold_multiplier = 10.0;
        config.safety_multiplier = 10.0;
        let classifier = Classifier::from_config(&config);

        for efficiency in [2.0, 2.1, 2.0, 2.05] {
            let classified = classifier.classify(observation("G3", efficiency, 1.0));
            assert!(!classified.suspicious);
        }

        let classified = classifier.classify(observation("G3", 10.0, 1.0));
        assert!(classified.suspicious);
        assert_eq!(classified.fired, vec![DetectorKind::Statistical]);
        assert!(matches!(
            classified.statistical,
            StatisticalVerdict::Suspicious { .. }
        ));
    }

    #[test]
    fn test_abstention_leaves_threshold_verdict() {
        let classifier = Classifier::default();
        for _ in 0..5 {
            classifier.classify(observation("G5", 10.0, 5.0));
        }
        let classified = classifier.classify(observation("G5", 40.0, 5.0));

        assert!(classified.statistical.is_abstained());
        assert!(classified.suspicious);
        assert!(classified.fired_by(DetectorKind::RateThreshold));
    }
}
