//! Configuration inspection

use anyhow::Result;
use colored::Colorize;
use fuelwatch_core::EngineConfig;
use std::path::Path;

use crate::output::{print_info, print_json, OutputFormat};

/// Print the resolved engine configuration
pub fn show(config: &EngineConfig, source: Option<&Path>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(config)?,
        OutputFormat::Table => {
            match source {
                Some(path) => print_info(&format!("Loaded from {}", path.display())),
                None => print_info("Using built-in defaults and environment"),
            }
            println!();
            println!("{}", "Detection".bold());
            println!("{}", "-".repeat(50));
            let rates = &config.expected_rates;
            println!(
                "Expected rates (L/h):   small {} / medium {} / large {}",
                rates.small, rates.medium, rates.large
            );
            println!("Threshold multiplier:   {}", config.threshold_multiplier);
            println!("Safety multiplier:      {}", config.safety_multiplier);
            println!("Window size:            {}", config.window_size);
            println!("Z threshold:            {}", config.z_threshold);
            println!("Risk policy:            {:?}", config.risk_policy);
            println!();
            println!("{}", "Notification".bold());
            println!("{}", "-".repeat(50));
            println!("Recipients:             {}", config.recipients.len());
            println!("Max concurrency:        {}", config.dispatch.max_concurrency);
            println!("Timeout:                {:?}", config.dispatch.timeout());
            println!("Max retries:            {}", config.dispatch.max_retries);
        }
    }

    Ok(())
}
