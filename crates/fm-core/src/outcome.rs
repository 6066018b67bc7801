//! Per-file conversion outcomes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Result of converting a single input file. Immutable once produced.
///
/// Failures carry the external tool's own diagnostic text so callers
/// can show users what actually went wrong with that file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// The input was repackaged successfully.
    Success {
        /// The original input file.
        input: PathBuf,
        /// Where the converted file was written.
        output: PathBuf,
    },
    /// The conversion failed; sibling tasks are unaffected.
    Failure {
        /// The original input file.
        input: PathBuf,
        /// Diagnostic text describing the failure.
        error: String,
    },
}

impl TaskOutcome {
    /// A successful outcome.
    pub fn success(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        TaskOutcome::Success {
            input: input.into(),
            output: output.into(),
        }
    }

    /// A failed outcome with its diagnostic text.
    pub fn failure(input: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        TaskOutcome::Failure {
            input: input.into(),
            error: error.into(),
        }
    }

    /// The input path this outcome belongs to.
    pub fn input(&self) -> &Path {
        match self {
            TaskOutcome::Success { input, .. } | TaskOutcome::Failure { input, .. } => input,
        }
    }

    /// Whether this outcome is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskOutcome::Failure { .. })
    }

    /// The failure's diagnostic text, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            TaskOutcome::Failure { error, .. } => Some(error),
            TaskOutcome::Success { .. } => None,
        }
    }
}
