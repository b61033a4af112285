//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No observations".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format litres
pub fn format_litres(litres: f64) -> String {
    format!("{:.1}L", litres)
}

/// Format litres per runtime-hour
pub fn format_efficiency(efficiency: f64) -> String {
    format!("{:.2}L/h", efficiency)
}

/// Format an optional z-score, `-` when the detector abstained
pub fn format_z_score(z_score: Option<f64>) -> String {
    z_score.map_or_else(|| "-".to_string(), |z| format!("{:.2}", z))
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "normal" | "healthy" | "delivered" => status.green().to_string(),
        "degraded" | "abstained" => status.yellow().to_string(),
        "suspicious" | "unhealthy" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a 0-100 risk score by band
pub fn color_risk(score: u32) -> String {
    let formatted = format!("{}/100", score);
    if score >= 50 {
        formatted.red().bold().to_string()
    } else if score >= 20 {
        formatted.yellow().to_string()
    } else {
        formatted.green().to_string()
    }
}
