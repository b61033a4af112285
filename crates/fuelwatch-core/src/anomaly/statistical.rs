//! Statistical (z-score) detection
//!
//! Keeps a bounded window of recent efficiency samples per generator and flags
//! samples lying more than a configurable number of standard deviations above
//! the window mean. Degenerate windows make the detector abstain instead of
//! dividing by zero.

use crate::config::EngineConfig;
use crate::models::{AbstainReason, StatisticalVerdict};
use dashmap::DashMap;
use std::collections::VecDeque;

/// Default number of samples kept per generator
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Minimum baseline samples before a z-score is computed
const MIN_SAMPLES_FOR_DETECTION: usize = 2;

/// Ring buffer of the most recent efficiency samples for one generator
#[derive(Debug, Clone)]
pub struct GeneratorWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl GeneratorWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, value: f64) {
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples from oldest to newest
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Population standard deviation (divides by n, not n - 1)
    pub fn std_dev(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let variance = self
            .samples
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        variance.sqrt()
    }

    /// True once the window holds at least two distinct values
    pub fn has_spread(&self) -> bool {
        match self.samples.front() {
            Some(first) => self.samples.iter().any(|v| v != first),
            None => false,
        }
    }

    pub fn min(&self) -> Option<f64> {
        self.samples
            .iter()
            .copied()
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn max(&self) -> Option<f64> {
        self.samples
            .iter()
            .copied()
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Score `value` against the current contents of the window
    pub fn score(&self, value: f64, z_threshold: f64) -> StatisticalVerdict {
        if self.samples.len() < MIN_SAMPLES_FOR_DETECTION {
            return StatisticalVerdict::Abstained {
                reason: AbstainReason::InsufficientSamples,
            };
        }

        if !self.has_spread() {
            return StatisticalVerdict::Abstained {
                reason: AbstainReason::ZeroVariance,
            };
        }

        let mean = self.mean();
        let std_dev = self.std_dev();
        if !mean.is_finite() || !std_dev.is_finite() {
            return StatisticalVerdict::Abstained {
                reason: AbstainReason::NonFinite,
            };
        }
        if std_dev < f64::EPSILON {
            return StatisticalVerdict::Abstained {
                reason: AbstainReason::ZeroVariance,
            };
        }

        let z_score = (value - mean) / std_dev;
        if z_score > z_threshold {
            StatisticalVerdict::Suspicious { z_score }
        } else {
            StatisticalVerdict::Normal { z_score }
        }
    }
}

/// Per-generator z-score detector
///
/// Windows are keyed by generator id and never shared. Callers must serialize
/// observations for the same generator; different generators may be scored
/// concurrently.
pub struct StatisticalDetector {
    /// Number of standard deviations above the mean considered suspicious
    pub z_threshold: f64,
    /// Samples kept per generator
    pub window_size: usize,
    /// Score against a window that already holds the current sample
    pub include_current_sample: bool,
    windows: DashMap<String, GeneratorWindow>,
}

impl StatisticalDetector {
    pub fn new(z_threshold: f64, window_size: usize) -> Self {
        Self {
            z_threshold,
            window_size,
            include_current_sample: false,
            windows: DashMap::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.z_threshold, config.window_size)
            .with_current_sample_included(config.include_current_sample)
    }

    pub fn with_current_sample_included(mut self, include: bool) -> Self {
        self.include_current_sample = include;
        self
    }

    /// Score a sample for a generator and record it in that generator's window
    pub fn is_statistically_suspicious(
        &self,
        generator_id: &str,
        efficiency: f64,
    ) -> StatisticalVerdict {
        let mut window = self
            .windows
            .entry(generator_id.to_owned())
            .or_insert_with(|| GeneratorWindow::new(self.window_size));

        if self.include_current_sample {
            window.push(efficiency);
            window.score(efficiency, self.z_threshold)
        } else {
            let verdict = window.score(efficiency, self.z_threshold);
            window.push(efficiency);
            verdict
        }
    }

    /// Snapshot of a generator's window, oldest first
    pub fn window(&self, generator_id: &str) -> Option<Vec<f64>> {
        self.windows
            .get(generator_id)
            .map(|w| w.samples().collect())
    }

    pub fn tracked_generators(&self) -> usize {
        self.windows.len()
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new(2.0, DEFAULT_WINDOW_SIZE)
    }
}
