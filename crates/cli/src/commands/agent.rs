//! Commands talking to a running agent

use anyhow::Result;
use colored::Colorize;
use fuelwatch_core::{DispatchResult, ReportKind};
use std::path::Path;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::commands::analyze::{load_observations, print_batch_report};
use crate::output::{
    color_status, print_error, print_json, print_success, print_table, OutputFormat,
};

/// Row for per-recipient delivery outcomes
#[derive(Tabled)]
struct DeliveryRow {
    #[tabled(rename = "Recipient")]
    recipient: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Attempts")]
    attempts: u32,
    #[tabled(rename = "Error")]
    error: String,
}

fn print_dispatch(result: &DispatchResult) {
    let rows: Vec<DeliveryRow> = result
        .deliveries
        .iter()
        .map(|d| DeliveryRow {
            recipient: d.recipient.clone(),
            status: color_status(if d.delivered { "delivered" } else { "failed" }),
            attempts: d.attempts,
            error: d.error.clone().unwrap_or_default(),
        })
        .collect();
    print_table(&rows);

    if result.is_complete() {
        print_success(&format!("Delivered to {} recipient(s)", result.delivered_count()));
    } else {
        print_error(&format!(
            "Undelivered: {}",
            result.failed_recipients().join(", ")
        ));
    }
}

/// Submit a batch file to the agent
pub async fn submit(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let batch = load_observations(file)?;
    let response = client.submit_observations(&batch).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            print_batch_report(&response.report);
            for result in &response.dispatches {
                println!();
                let generator = result.generator_id.as_deref().unwrap_or("-");
                println!("{} {}", "Alert dispatch for".bold(), generator.cyan());
                print_dispatch(result);
            }
        }
    }

    Ok(())
}

/// Trigger a fleet report broadcast on the agent
pub async fn report(client: &ApiClient, kind: ReportKind, format: OutputFormat) -> Result<()> {
    let result = client.broadcast_report(kind).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", format!("{} report", kind).bold());
            println!("{}", "-".repeat(50));
            println!("{}", result.message);
            println!();
            print_dispatch(&result);
        }
    }

    Ok(())
}

/// Show agent component health
pub async fn status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            let overall = format!("{:?}", health.status).to_lowercase();
            println!("Agent status: {}", color_status(&overall));

            let mut names: Vec<&String> = health.components.keys().collect();
            names.sort();
            for name in names {
                let component = &health.components[name];
                let status = format!("{:?}", component.status).to_lowercase();
                match &component.message {
                    Some(message) => {
                        println!("  {:<12} {} ({})", name, color_status(&status), message)
                    }
                    None => println!("  {:<12} {}", name, color_status(&status)),
                }
            }
        }
    }

    Ok(())
}
