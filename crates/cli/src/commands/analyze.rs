//! Local batch analysis

use anyhow::{Context, Result};
use colored::Colorize;
use fuelwatch_core::{
    notify::format_report, BatchReport, ClassifiedObservation, EngineConfig, FuelEngine, ReportKind,
};
use serde_json::Value;
use std::path::Path;
use tabled::Tabled;

use crate::output::{
    color_risk, color_status, format_efficiency, format_litres, format_z_score, print_info,
    print_json, print_success, print_table, print_warning, OutputFormat,
};

/// Row for the classified observations table
#[derive(Tabled)]
struct ObservationRow {
    #[tabled(rename = "Generator")]
    generator: String,
    #[tabled(rename = "Timestamp")]
    timestamp: String,
    #[tabled(rename = "Fuel")]
    fuel: String,
    #[tabled(rename = "Runtime")]
    runtime: String,
    #[tabled(rename = "Efficiency")]
    efficiency: String,
    #[tabled(rename = "Z-score")]
    z_score: String,
    #[tabled(rename = "Detectors")]
    detectors: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&ClassifiedObservation> for ObservationRow {
    fn from(c: &ClassifiedObservation) -> Self {
        let detectors: Vec<String> = c.fired.iter().map(|d| d.to_string()).collect();
        let status = if c.suspicious { "suspicious" } else { "normal" };
        Self {
            generator: c.observation.generator_id.clone(),
            timestamp: c.observation.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            fuel: format_litres(c.observation.fuel_used),
            runtime: format!("{}h", c.observation.runtime_hours),
            efficiency: format_efficiency(c.efficiency),
            z_score: format_z_score(c.statistical.z_score()),
            detectors: if detectors.is_empty() {
                "-".to_string()
            } else {
                detectors.join(", ")
            },
            status: color_status(status),
        }
    }
}

/// Read a JSON array of observation records
///
/// Records are left undecoded so that one malformed entry is reported on its
/// own instead of failing the whole file.
pub fn load_observations(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse observations in {}", path.display()))
}

/// Classify a batch locally and print the results
pub fn analyze(
    file: &Path,
    config: &EngineConfig,
    report_kind: Option<ReportKind>,
    format: OutputFormat,
) -> Result<()> {
    let batch = load_observations(file)?;
    let engine = FuelEngine::new(config);
    let report = engine.ingest_json(&batch);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_batch_report(&report),
    }

    if let Some(kind) = report_kind {
        println!();
        println!("{}", format!("{} report", kind).bold());
        println!("{}", "-".repeat(50));
        println!("{}", format_report(kind, &report.stats));
    }

    Ok(())
}

/// Print a batch report in human-readable form
pub fn print_batch_report(report: &BatchReport) {
    let rows: Vec<ObservationRow> = report.classified.iter().map(ObservationRow::from).collect();
    print_table(&rows);

    let stats = &report.stats;
    println!();
    println!("{}", "Fleet Summary".bold());
    println!("{}", "=".repeat(50));
    println!("Total fuel:             {}", format_litres(stats.total_fuel_usage));
    println!("Generators reporting:   {}", stats.total_generators);
    println!("Suspicious logs:        {}", stats.active_generators);
    println!("Risk score:             {}", color_risk(stats.risk_score));

    if !stats.alerts.is_empty() {
        println!();
        for alert in &stats.alerts {
            print_warning(alert);
        }
    }

    for event in &report.transitions {
        print_info(&format!("{} entered the suspicious state", event.generator_id()));
    }

    for rejected in &report.rejected {
        print_warning(&format!(
            "Skipped record #{} ({}): {}",
            rejected.index, rejected.generator_id, rejected.reason
        ));
    }

    if report.transitions.is_empty() && stats.alerts.is_empty() {
        print_success("No suspicious fuel activity");
    }
}
