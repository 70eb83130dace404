//! Engine configuration file loading.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use regiondig::EngineConfig;
use tracing::{debug, info};

/// `<config_dir>/regiondig/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("regiondig").join("config.toml"))
}

/// Load the engine configuration.
///
/// An explicit path must exist. Without one, the default location is tried
/// and a missing file means defaults.
pub fn load(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => parse_file(path),
        None => match default_config_path() {
            Some(path) if path.exists() => parse_file(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(EngineConfig::default())
            }
        },
    }
}

fn parse_file(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: EngineConfig = toml::from_str(&content)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}
