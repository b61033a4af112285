//! Configuration resolution for the CLI

use anyhow::{Context, Result};
use fuelwatch_core::EngineConfig;
use std::path::{Path, PathBuf};

/// Engine configuration used by local commands
///
/// Resolution order: `--config`, then `~/.config/fuelwatch/config.toml` when
/// it exists, then built-in defaults. `FUELWATCH_` environment variables
/// override whichever file is used.
pub fn resolve_engine_config(
    override_path: Option<&Path>,
) -> Result<(EngineConfig, Option<PathBuf>)> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    let config = EngineConfig::load(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("Failed to load config from {}", p.display()),
        None => "Failed to load config from environment".to_string(),
    })?;

    Ok((config, path))
}

/// Get the default configuration file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(".config").join("fuelwatch").join("config.toml"))
}
