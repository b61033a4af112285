//! Observation validation
//!
//! Converts untyped log records into [`Observation`]s. Everything rejected here
//! is excluded from detection and aggregation, and is tallied by the caller so
//! batch statistics stay auditable.

use crate::models::{GeneratorClass, Observation, RawObservation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Reason an observation was rejected
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("generatorId is empty")]
    EmptyGeneratorId,

    #[error("fuelUsed must be a finite non-negative number, got {value}")]
    InvalidFuelUsed { value: f64 },

    #[error("runtimeHours must be a finite positive number, got {value}")]
    InvalidRuntime { value: f64 },

    #[error("efficiency of {fuel_used} over {runtime_hours} hours is not finite")]
    NonFiniteEfficiency { fuel_used: f64, runtime_hours: f64 },

    #[error("malformed record: {message}")]
    Malformed { message: String },
}

/// Decode one untyped JSON record
///
/// Missing or mistyped required fields reject only this record, never the
/// batch it arrived in.
pub fn parse_record(value: &Value) -> Result<RawObservation, ValidationError> {
    RawObservation::deserialize(value).map_err(|e| ValidationError::Malformed {
        message: e.to_string(),
    })
}

/// Decode and validate one untyped JSON record
pub fn validate_value(value: &Value) -> Result<Observation, ValidationError> {
    validate(&parse_record(value)?)
}

/// Validate a raw record
///
/// Unknown or missing generator classes fall back to [`GeneratorClass::Medium`].
pub fn validate(raw: &RawObservation) -> Result<Observation, ValidationError> {
    let generator_id = raw.generator_id.trim();
    if generator_id.is_empty() {
        return Err(ValidationError::EmptyGeneratorId);
    }

    if !raw.fuel_used.is_finite() || raw.fuel_used < 0.0 {
        return Err(ValidationError::InvalidFuelUsed {
            value: raw.fuel_used,
        });
    }

    if !raw.runtime_hours.is_finite() || raw.runtime_hours <= 0.0 {
        return Err(ValidationError::InvalidRuntime {
            value: raw.runtime_hours,
        });
    }

    // subnormal runtimes overflow the ratio
    if !(raw.fuel_used / raw.runtime_hours).is_finite() {
        return Err(ValidationError::NonFiniteEfficiency {
            fuel_used: raw.fuel_used,
            runtime_hours: raw.runtime_hours,
        });
    }

    let generator_class = raw
        .generator_class
        .as_deref()
        .and_then(GeneratorClass::parse)
        .unwrap_or_default();

    let location = raw
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string);

    Ok(Observation {
        generator_id: generator_id.to_string(),
        timestamp: raw.timestamp,
        fuel_used: raw.fuel_used,
        runtime_hours: raw.runtime_hours,
        generator_class,
        location,
    })
}
