//! Stream-copy remux into a fast-start MP4 container.

use std::path::Path;

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Arguments shared by every ffmpeg invocation. `-loglevel error`
/// keeps stderr down to the actual diagnostics so a failure can be
/// reported verbatim.
const FFMPEG_BASE_ARGS: &[&str] = &["-hide_banner", "-nostdin", "-loglevel", "error", "-y"];

/// Repackage `input` into an MP4 at `output` without re-encoding.
///
/// Video and audio streams are copied as-is; the moov atom is moved to
/// the front of the file (`+faststart`) so playback can begin before
/// the file has fully downloaded.
///
/// # Errors
///
/// [`fm_core::Error::Tool`] if ffmpeg is unavailable or exits non-zero;
/// the message carries ffmpeg's stderr.
pub async fn remux_to_mp4(tools: &ToolRegistry, input: &Path, output: &Path) -> fm_core::Result<()> {
    let ffmpeg = tools.require_ffmpeg()?;

    tracing::debug!("remux {} -> {}", input.display(), output.display());

    ToolCommand::new(&ffmpeg.path)
        .args(FFMPEG_BASE_ARGS.iter().copied())
        .arg("-i")
        .arg(input.to_string_lossy())
        .args(["-c:v", "copy", "-c:a", "copy", "-movflags", "+faststart"])
        .arg(output.to_string_lossy())
        .run()
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::config::ToolsConfig;

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let registry = ToolRegistry::default();
        let err = remux_to_mp4(&registry, Path::new("/in/a.mov"), Path::new("/out/a.mp4"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("ffmpeg"), "got: {err}");
    }

    #[cfg(unix)]
    fn registry_with_script(dir: &Path, body: &str) -> ToolRegistry {
        let path = dir.join("ffmpeg");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        ToolRegistry::locate(&ToolsConfig {
            ffmpeg_path: Some(path),
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invokes_resolved_tool() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_script(dir.path(), "exit 0");

        remux_to_mp4(&registry, Path::new("/in/clip.mov"), Path::new("/out/clip.mp4"))
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tool_diagnostics_survive_failure() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_with_script(dir.path(), "echo 'Unsupported codec for output' >&2\nexit 1");

        let err = remux_to_mp4(&registry, Path::new("/in/clip.mov"), Path::new("/out/clip.mp4"))
            .await
            .unwrap_err();
        assert!(
            err.to_string().contains("Unsupported codec for output"),
            "got: {err}"
        );
    }
}
