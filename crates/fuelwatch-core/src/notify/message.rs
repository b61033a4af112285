//! Alert and report message formatting

use crate::aggregator::FleetStats;
use crate::models::{ClassifiedObservation, StatisticalVerdict};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::str::FromStr;

/// Periodic fleet summary flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Daily,
    Weekly,
}

impl FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(ReportKind::Daily),
            "weekly" => Ok(ReportKind::Weekly),
            other => Err(format!("unknown report kind: {}", other)),
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportKind::Daily => write!(f, "daily"),
            ReportKind::Weekly => write!(f, "weekly"),
        }
    }
}

/// Operator message for a generator that just turned suspicious
pub fn format_alert(classified: &ClassifiedObservation) -> String {
    let obs = &classified.observation;
    let mut message = String::from("Suspicious fuel activity detected!\n\n");

    // writing to a String cannot fail
    let _ = writeln!(message, "Generator: {}", obs.generator_id);
    if let Some(location) = &obs.location {
        let _ = writeln!(message, "Location: {}", location);
    }
    let _ = writeln!(message, "Fuel Used: {}L", obs.fuel_used);
    let _ = write!(message, "Runtime: {}hrs", obs.runtime_hours);

    if !classified.fired.is_empty() {
        let detectors: Vec<String> = classified.fired.iter().map(|d| d.to_string()).collect();
        let _ = write!(message, "\nDetectors: {}", detectors.join(", "));
    }
    if let StatisticalVerdict::Suspicious { z_score } = classified.statistical {
        let _ = write!(message, "\nZ-score: {:.1}", z_score);
    }

    message
}

/// Fleet summary for the daily or weekly digest
pub fn format_report(kind: ReportKind, stats: &FleetStats) -> String {
    match kind {
        ReportKind::Daily => {
            if stats.active_generators > 0 {
                format!(
                    "ALERT: {} suspicious fuel logs today. Please review.",
                    stats.active_generators
                )
            } else {
                "No major anomalies today.".to_string()
            }
        }
        ReportKind::Weekly => format!(
            "Weekly Fuel Report\n\nFuel Used: {}L\nGenerators Reporting: {}\n\
             Suspicious Logs: {}\nRisk Score: {}",
            stats.total_fuel_usage,
            stats.total_generators,
            stats.active_generators,
            stats.risk_score
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AbstainReason, DetectorKind, GeneratorClass, Observation};
    use chrono::Utc;

    fn classified(location: Option<&str>) -> ClassifiedObservation {
        ClassifiedObservation {
            observation: Observation {
                generator_id: "G1".to_string(),
                timestamp: Utc::now(),
                fuel_used: 50.0,
                runtime_hours: 5.0,
                generator_class: GeneratorClass::Medium,
                location: location.map(str::to_string),
            },
            efficiency: 10.0,
            suspicious: true,
            fired: vec![DetectorKind::RateThreshold, DetectorKind::SafetyNet],
            statistical: StatisticalVerdict::Abstained {
                reason: AbstainReason::InsufficientSamples,
            },
        }
    }

    #[test]
    fn test_alert_with_location() {
        let message = format_alert(&classified(Some("Site B")));
        assert_eq!(
            message,
            "Suspicious fuel activity detected!\n\nGenerator: G1\nLocation: Site B\n\
             Fuel Used: 50L\nRuntime: 5hrs\nDetectors: rate-threshold, safety-net"
        );
    }

    #[test]
    fn test_alert_without_location() {
        let message = format_alert(&classified(None));
        assert!(!message.contains("Location"));
        assert!(message.contains("Generator: G1"));
        assert!(message.contains("Fuel Used: 50L"));
        assert!(message.contains("Runtime: 5hrs"));
    }

    #[test]
    fn test_alert_includes_z_score() {
        let mut entry = classified(None);
        entry.fired = vec![DetectorKind::Statistical];
        entry.statistical = StatisticalVerdict::Suspicious { z_score: 4.26 };
        let message = format_alert(&entry);
        assert!(message.ends_with("Detectors: statistical\nZ-score: 4.3"));
    }

    #[test]
    fn test_daily_report() {
        let mut stats = FleetStats::default();
        assert_eq!(
            format_report(ReportKind::Daily, &stats),
            "No major anomalies today."
        );

        stats.active_generators = 3;
        assert_eq!(
            format_report(ReportKind::Daily, &stats),
            "ALERT: 3 suspicious fuel logs today. Please review."
        );
    }

    #[test]
    fn test_weekly_report() {
        let stats = FleetStats {
            total_fuel_usage: 1250.5,
            active_generators: 2,
            total_generators: 7,
            risk_score: 29,
            ..Default::default()
        };
        let report = format_report(ReportKind::Weekly, &stats);
        assert!(report.starts_with("Weekly Fuel Report"));
        assert!(report.contains("Fuel Used: 1250.5L"));
        assert!(report.contains("Generators Reporting: 7"));
        assert!(report.contains("Suspicious Logs: 2"));
    }

    #[test]
    fn test_report_kind_parse() {
        assert_eq!("Weekly".parse::<ReportKind>().unwrap(), ReportKind::Weekly);
        assert_eq!("daily".parse::<ReportKind>().unwrap(), ReportKind::Daily);
        assert!("monthly".parse::<ReportKind>().is_err());
    }
}
