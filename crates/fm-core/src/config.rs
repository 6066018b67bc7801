//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::naming::DEFAULT_SUFFIX;

/// Default bound on concurrently running conversions.
pub const DEFAULT_MAX_PARALLEL: usize = 2;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// External tool locations.
    pub tools: ToolsConfig,
    /// Batch conversion defaults.
    pub batch: BatchConfig,
}

/// External tool locations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit path to the ffmpeg executable. When unset, a binary
    /// bundled next to the running executable and then `PATH` are
    /// searched.
    pub ffmpeg_path: Option<PathBuf>,
}

/// Batch conversion defaults, overridable per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on concurrently running conversions.
    pub max_parallel: usize,
    /// Suffix appended to output base names.
    pub suffix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}
