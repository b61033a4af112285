//! FuelWatch agent - fuel consumption anomaly detection service
//!
//! Accepts observation batches over HTTP, classifies them, and notifies the
//! configured recipients when a generator turns suspicious.

use anyhow::{Context, Result};
use fuelwatch_agent::{api, config::AgentConfig};
use fuelwatch_core::{
    health::HealthRegistry, Dispatcher, EngineConfig, EngineMetrics, FuelEngine, LogNotifier,
    StructuredLogger,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting fuelwatch-agent");

    let config = AgentConfig::load()?;
    let engine_config = EngineConfig::load(config.engine_config.as_deref())
        .context("Failed to load engine configuration")?;
    info!(
        api_port = config.api_port,
        recipients = engine_config.recipients.len(),
        window_size = engine_config.window_size,
        z_threshold = engine_config.z_threshold,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    api::register_components(&health_registry).await;

    let logger = StructuredLogger::new("agent");
    logger.log_startup(AGENT_VERSION, engine_config.recipients.len());

    let engine = FuelEngine::new(&engine_config);
    let dispatcher = Dispatcher::from_config(Arc::new(LogNotifier), &engine_config)
        .with_metrics(EngineMetrics::new());

    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        engine,
        dispatcher,
    ));

    health_registry.set_ready(true).await;

    tokio::select! {
        result = api::serve(config.api_port, app_state) => {
            if let Err(e) = &result {
                error!(error = %e, "API server stopped");
            }
            result?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
