//! Execution of external tool processes.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

/// Upper bound on a single tool invocation. Remuxing is I/O bound and
/// usually quick, but a corrupt input can wedge ffmpeg indefinitely;
/// the timeout turns that into an ordinary per-file failure.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3600);

/// Output captured from a completed tool process.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Builder for a single external tool invocation.
///
/// # Example
///
/// ```no_run
/// use fm_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example() -> fm_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-version")
///     .run()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the process to completion, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// [`fm_core::Error::Tool`] when the process cannot be spawned,
    /// exceeds the timeout, or exits non-zero. For a non-zero exit the
    /// message carries the process's trimmed stderr so callers can
    /// surface the tool's own diagnostics.
    pub async fn run(self) -> fm_core::Result<ToolOutput> {
        let tool = self
            .program
            .file_name()
            .map_or_else(
                || self.program.to_string_lossy().into_owned(),
                |n| n.to_string_lossy().into_owned(),
            );

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fm_core::Error::tool(&tool, format!("failed to spawn: {e}")))?;

        // On timeout the future owning the child is dropped, which
        // kills the process (kill_on_drop above).
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| fm_core::Error::tool(&tool, format!("timed out after {:?}", self.timeout)))?
            .map_err(|e| fm_core::Error::tool(&tool, format!("I/O error waiting for process: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let diagnostic = stderr.trim();
            let message = if diagnostic.is_empty() {
                format!("exited with status {}", output.status)
            } else {
                format!("exited with status {}: {diagnostic}", output.status)
            };
            return Err(fm_core::Error::tool(&tool, message));
        }

        Ok(ToolOutput { stdout, stderr })
    }
}
