//! Configuration loading for the fastmux binary.

use anyhow::{Context, Result};
use std::path::Path;

use fm_core::config::AppConfig;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return the built-in defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./fastmux.toml", "~/.config/fastmux/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(AppConfig::default())
}

/// Validate configuration values.
fn validate_config(config: &AppConfig) -> Result<()> {
    if config.batch.max_parallel < 1 {
        anyhow::bail!("batch.max_parallel must be at least 1");
    }

    if let Some(path) = &config.tools.ffmpeg_path {
        if !path.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {}", path.display());
        }
    }

    Ok(())
}
