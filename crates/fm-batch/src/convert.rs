//! The conversion seam between the dispatcher and ffmpeg.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use fm_av::ToolRegistry;

/// A unit of conversion work.
///
/// Implementations must be safe to invoke concurrently; the dispatcher
/// shares one instance across all in-flight tasks.
#[async_trait]
pub trait Converter: Send + Sync + 'static {
    /// Convert `input`, writing the result to `output`.
    async fn convert(&self, input: &Path, output: &Path) -> fm_core::Result<()>;
}

/// Production converter: stream-copy remux via ffmpeg.
pub struct FfmpegConverter {
    tools: Arc<ToolRegistry>,
}

impl FfmpegConverter {
    /// Create a converter over the given tool registry.
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Converter for FfmpegConverter {
    async fn convert(&self, input: &Path, output: &Path) -> fm_core::Result<()> {
        fm_av::remux_to_mp4(&self.tools, input, output).await
    }
}
