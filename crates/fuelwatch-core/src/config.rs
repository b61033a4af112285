//! Engine configuration
//!
//! Every tunable of the detection and alerting pipeline lives here. Values are
//! layered: built-in defaults, then an optional config file, then
//! `FUELWATCH_`-prefixed environment variables (nested keys joined with `__`,
//! e.g. `FUELWATCH_DISPATCH__TIMEOUT_MS=5000`).

use crate::models::GeneratorClass;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for engine settings
pub const ENV_PREFIX: &str = "FUELWATCH";

/// Default per-entry fuel level flagged by the usage-ceiling policy (litres)
const DEFAULT_HIGH_USAGE_THRESHOLD: f64 = 400.0;

/// Default fleet-wide safe usage ceiling (litres)
const DEFAULT_SAFE_USAGE_LIMIT: f64 = 4500.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Expected consumption rate per generator class, in litres/hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedRates {
    pub small: f64,
    pub medium: f64,
    pub large: f64,
}

impl Default for ExpectedRates {
    fn default() -> Self {
        Self {
            small: 1.2,
            medium: 2.5,
            large: 4.0,
        }
    }
}

impl ExpectedRates {
    pub fn rate_for(&self, class: GeneratorClass) -> f64 {
        match class {
            GeneratorClass::Small => self.small,
            GeneratorClass::Medium => self.medium,
            GeneratorClass::Large => self.large,
        }
    }
}

/// How the fleet risk score is derived from a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum RiskPolicy {
    /// Share of suspicious entries among distinct generators
    #[default]
    SuspiciousRatio,
    /// Total fuel usage against a fixed fleet-wide ceiling
    UsageCeiling {
        #[serde(default = "default_safe_usage_limit")]
        safe_usage_limit: f64,
        #[serde(default = "default_high_usage_threshold")]
        high_usage_threshold: f64,
    },
}

impl RiskPolicy {
    /// Usage-ceiling policy with the stock limits
    pub fn usage_ceiling() -> Self {
        RiskPolicy::UsageCeiling {
            safe_usage_limit: DEFAULT_SAFE_USAGE_LIMIT,
            high_usage_threshold: DEFAULT_HIGH_USAGE_THRESHOLD,
        }
    }
}

fn default_safe_usage_limit() -> f64 {
    DEFAULT_SAFE_USAGE_LIMIT
}

fn default_high_usage_threshold() -> f64 {
    DEFAULT_HIGH_USAGE_THRESHOLD
}

/// Notification fan-out settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum recipient sends in flight at once
    pub max_concurrency: usize,
    /// Per-attempt timeout
    pub timeout_ms: u64,
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Backoff before the first retry, doubled on each following retry
    pub initial_backoff_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            timeout_ms: 10_000,
            max_retries: 2,
            initial_backoff_ms: 500,
        }
    }
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub expected_rates: ExpectedRates,
    /// Primary rule: efficiency above `expected * threshold_multiplier`
    pub threshold_multiplier: f64,
    /// Safety-net rule: fuel above `expected * runtime * safety_multiplier`
    pub safety_multiplier: f64,
    /// Samples kept per generator for rolling statistics
    pub window_size: usize,
    pub z_threshold: f64,
    /// Score against a baseline that already contains the current sample
    pub include_current_sample: bool,
    pub risk_policy: RiskPolicy,
    pub recipients: Vec<String>,
    pub dispatch: DispatchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expected_rates: ExpectedRates::default(),
            threshold_multiplier: 1.5,
            safety_multiplier: 3.0,
            window_size: 20,
            z_threshold: 2.0,
            include_current_sample: false,
            risk_policy: RiskPolicy::default(),
            recipients: Vec::new(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(
        path: Option<&Path>,
        prefix: &str,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("recipients"),
            )
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the detectors meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = &self.expected_rates;
        for (class, rate) in [
            ("small", rates.small),
            ("medium", rates.medium),
            ("large", rates.large),
        ] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "expected rate for {} must be positive, got {}",
                    class, rate
                )));
            }
        }

        if !(self.threshold_multiplier.is_finite() && self.threshold_multiplier > 0.0) {
            return Err(ConfigError::Invalid(
                "threshold_multiplier must be positive".to_string(),
            ));
        }
        if !(self.safety_multiplier.is_finite() && self.safety_multiplier > 0.0) {
            return Err(ConfigError::Invalid(
                "safety_multiplier must be positive".to_string(),
            ));
        }
        if self.window_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "window_size must be at least 2, got {}",
                self.window_size
            )));
        }
        if !(self.z_threshold.is_finite() && self.z_threshold > 0.0) {
            return Err(ConfigError::Invalid(
                "z_threshold must be positive".to_string(),
            ));
        }
        if self.dispatch.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.max_concurrency must be at least 1".to_string(),
            ));
        }
        if let RiskPolicy::UsageCeiling {
            safe_usage_limit, ..
        } = self.risk_policy
        {
            if !(safe_usage_limit.is_finite() && safe_usage_limit > 0.0) {
                return Err(ConfigError::Invalid(
                    "safe_usage_limit must be positive".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.expected_rates.rate_for(GeneratorClass::Small), 1.2);
        assert_eq!(config.expected_rates.rate_for(GeneratorClass::Medium), 2.5);
        assert_eq!(config.expected_rates.rate_for(GeneratorClass::Large), 4.0);
        assert_eq!(config.threshold_multiplier, 1.5);
        assert_eq!(config.safety_multiplier, 3.0);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.z_threshold, 2.0);
        assert_eq!(config.risk_policy, RiskPolicy::SuspiciousRatio);
        assert_eq!(config.dispatch.timeout(), Duration::from_secs(10));
        assert_eq!(config.dispatch.max_retries, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_sources_yields_defaults() {
        let config = EngineConfig::load_with_prefix(None, "FUELWATCH_TEST_EMPTY").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
threshold_multiplier = 2.0
window_size = 10
recipients = ["+441234567890", "ops@example.com"]

[expected_rates]
large = 5.5

[risk_policy]
policy = "usage_ceiling"
safe_usage_limit = 1000.0

[dispatch]
max_retries = 4
"#
        )
        .unwrap();

        let config =
            EngineConfig::load_with_prefix(Some(file.path()), "FUELWATCH_TEST_FILE").unwrap();

        assert_eq!(config.threshold_multiplier, 2.0);
        assert_eq!(config.window_size, 10);
        assert_eq!(config.recipients.len(), 2);
        assert_eq!(config.expected_rates.large, 5.5);
        // untouched keys keep their defaults
        assert_eq!(config.expected_rates.small, 1.2);
        assert_eq!(config.dispatch.max_retries, 4);
        assert_eq!(config.dispatch.timeout_ms, 10_000);
        assert_eq!(
            config.risk_policy,
            RiskPolicy::UsageCeiling {
                safe_usage_limit: 1000.0,
                high_usage_threshold: 400.0,
            }
        );
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("FUELWATCH_TEST_ENV_Z_THRESHOLD", "3.5");
        std::env::set_var("FUELWATCH_TEST_ENV_DISPATCH__TIMEOUT_MS", "3000");
        std::env::set_var("FUELWATCH_TEST_ENV_RECIPIENTS", "a,b,c");

        let config = EngineConfig::load_with_prefix(None, "FUELWATCH_TEST_ENV").unwrap();

        assert_eq!(config.z_threshold, 3.5);
        assert_eq!(config.dispatch.timeout_ms, 3000);
        assert_eq!(config.recipients, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_missing_required_file_fails() {
        let result = EngineConfig::load_with_prefix(
            Some(Path::new("/nonexistent/fuelwatch.toml")),
            "FUELWATCH_TEST_MISSING",
        );
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.window_size = 1;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.expected_rates.medium = 0.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.z_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.dispatch.max_concurrency = 0;
        assert!(config.validate().is_err());
    }
}
