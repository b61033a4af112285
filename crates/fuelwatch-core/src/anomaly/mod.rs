//! Anomaly detection for fuel consumption
//!
//! This module provides:
//! - Rate-threshold rules per generator class
//! - Rolling z-score detection per generator
//! - A classifier combining both into one suspicion verdict

mod classifier;
mod statistical;
mod threshold;

pub use classifier::Classifier;
pub use statistical::{GeneratorWindow, StatisticalDetector, DEFAULT_WINDOW_SIZE};
pub use threshold::{ThresholdDetector, ThresholdVerdict};
