//! Agent configuration

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// API server port for ingestion, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Engine configuration file (TOML, JSON or YAML)
    #[serde(default)]
    pub engine_config: Option<PathBuf>,
}

fn default_api_port() -> u16 {
    8080
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            engine_config: None,
        }
    }
}

impl AgentConfig {
    /// Load configuration from `AGENT_`-prefixed environment variables
    pub fn load() -> Result<Self> {
        Self::load_with_prefix("AGENT")
    }

    fn load_with_prefix(prefix: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix(prefix).try_parsing(true))
            .build()
            .context("Failed to read agent environment")?;

        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }
}
