//! Locating the external ffmpeg executable.
//!
//! Resolution order: an explicit path from configuration, then a binary
//! bundled next to the running executable (the packaged layout), then
//! `PATH` via [`which`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fm_core::config::ToolsConfig;

/// Name of the only tool fastmux shells out to.
pub const FFMPEG: &str = "ffmpeg";

/// A resolved external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tool {
    /// Tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by
/// [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding the resolved tool, if any.
///
/// A missing tool is not an error at discovery time; it is reported by
/// [`ToolRegistry::require_ffmpeg`] when a conversion actually needs it,
/// so each affected file fails individually instead of the application
/// refusing to start.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    ffmpeg: Option<Tool>,
}

impl ToolRegistry {
    /// Resolve ffmpeg and repair its execute permission if needed.
    pub fn locate(config: &ToolsConfig) -> Self {
        let resolved = config
            .ffmpeg_path
            .as_deref()
            .filter(|p| p.exists())
            .map(Path::to_path_buf)
            .or_else(bundled_ffmpeg)
            .or_else(|| which::which(FFMPEG).ok());

        match resolved {
            Some(path) => {
                tracing::debug!("resolved ffmpeg at {}", path.display());
                ensure_executable(&path);
                Self {
                    ffmpeg: Some(Tool {
                        name: FFMPEG.to_string(),
                        path,
                    }),
                }
            }
            None => {
                tracing::warn!("ffmpeg not found; conversions will fail until it is installed");
                Self { ffmpeg: None }
            }
        }
    }

    /// The resolved ffmpeg, or [`fm_core::Error::Tool`] if discovery
    /// came up empty.
    pub fn require_ffmpeg(&self) -> fm_core::Result<&Tool> {
        self.ffmpeg
            .as_ref()
            .ok_or_else(|| fm_core::Error::tool(FFMPEG, "not found; is it installed and in PATH?"))
    }

    /// Availability information for every managed tool.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        vec![match self.ffmpeg {
            Some(ref tool) => ToolInfo {
                name: tool.name.clone(),
                available: true,
                version: detect_version(&tool.path),
                path: Some(tool.path.clone()),
            },
            None => ToolInfo {
                name: FFMPEG.to_string(),
                available: false,
                version: None,
                path: None,
            },
        }]
    }
}

/// Candidate path for an ffmpeg shipped alongside the fastmux binary.
fn bundled_ffmpeg() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    let name = if cfg!(windows) { "ffmpeg.exe" } else { FFMPEG };
    let candidate = dir.join(name);
    candidate.is_file().then_some(candidate)
}

/// Repair the execute bit on the resolved binary. A bundled ffmpeg can
/// be unpacked without its mode bits; failure here is logged and not
/// fatal -- the affected conversions will fail with a tool error.
#[cfg(unix)]
fn ensure_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(path) {
        Ok(meta) => {
            let mut perms = meta.permissions();
            if perms.mode() & 0o111 == 0 {
                perms.set_mode(0o755);
                if let Err(e) = std::fs::set_permissions(path, perms) {
                    tracing::warn!("failed to mark {} executable: {e}", path.display());
                }
            }
        }
        Err(e) => tracing::warn!("failed to stat {}: {e}", path.display()),
    }
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) {}

/// First line of `ffmpeg -version` output, if the binary runs.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(str::to_string)
}
