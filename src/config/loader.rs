//! Configuration loading and saving
//!
//! Settings live in a JSON file in the per-user config directory. A missing
//! or broken file never stops the application: defaults are used instead.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, instrument, warn};

use super::defaults::CONFIG_FILE_NAME;
use super::types::Config;

/// `<config_dir>/clipkeeper/settings.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("clipkeeper"))
        .or_else(|| dirs::home_dir().map(|h| h.join(".clipkeeper")))
        .unwrap_or_else(|| std::env::temp_dir().join("clipkeeper"))
        .join(CONFIG_FILE_NAME)
}

/// Load configuration from `path`.
///
/// Returns Config::default() if the file is missing or cannot be parsed.
#[instrument(name = "load_config", skip_all, fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Config {
    if !path.exists() {
        info!("Config file not found, using defaults");
        return Config::default();
    }

    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(error = %e, "Failed to read config file, using defaults");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&contents) {
        Ok(config) => {
            info!("Successfully loaded config");
            config
        }
        Err(e) => {
            warn!(
                error = %e,
                line = e.line(),
                column = e.column(),
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}

/// Write `config` to `path` as pretty JSON, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "Config saved");
    Ok(())
}
