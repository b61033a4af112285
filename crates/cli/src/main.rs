//! FuelWatch CLI
//!
//! A command-line tool for analysing fuel logs locally and for driving a
//! running FuelWatch agent.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{agent, analyze};
use fuelwatch_core::ReportKind;
use std::path::PathBuf;

/// FuelWatch CLI
#[derive(Parser)]
#[command(name = "fuelwatch")]
#[command(author, version, about = "CLI for FuelWatch fuel anomaly detection", long_about = None)]
pub struct Cli {
    /// Agent URL (can also be set via FUELWATCH_API_URL env var)
    #[arg(long, env = "FUELWATCH_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Engine configuration file (defaults to ~/.config/fuelwatch/config.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a JSON file of observations locally
    Analyze {
        /// File containing a JSON array of observations, oldest first
        file: PathBuf,

        /// Also print a daily or weekly summary
        #[arg(long, value_parser = parse_report_kind)]
        report: Option<ReportKind>,
    },

    /// Send a JSON file of observations to the agent
    Submit {
        /// File containing a JSON array of observations, oldest first
        file: PathBuf,
    },

    /// Ask the agent to broadcast a fleet report
    Report {
        /// Report kind (daily, weekly)
        #[arg(value_parser = parse_report_kind)]
        kind: ReportKind,
    },

    /// Show agent health
    Status,

    /// Configuration commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved engine configuration
    Show,
}

fn parse_report_kind(value: &str) -> Result<ReportKind, String> {
    value.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_writer(std::io::stderr)
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .init();
    }

    // Execute command
    match cli.command {
        Commands::Analyze { file, report } => {
            let (engine_config, _) = config::resolve_engine_config(cli.config.as_deref())?;
            analyze::analyze(&file, &engine_config, report, cli.format)?;
        }
        Commands::Submit { file } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            agent::submit(&client, &file, cli.format).await?;
        }
        Commands::Report { kind } => {
            let client = client::ApiClient::new(&cli.api_url)?;
            agent::report(&client, kind, cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            agent::status(&client, cli.format).await?;
        }
        Commands::Config(ConfigCommands::Show) => {
            let (engine_config, source) = config::resolve_engine_config(cli.config.as_deref())?;
            commands::config::show(&engine_config, source.as_deref(), cli.format)?;
        }
    }

    Ok(())
}
