//! Accumulation of per-task outcomes into the terminal batch result.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use fm_core::TaskOutcome;

/// Collects one outcome per admitted input and tracks which inputs
/// failed. Pure bookkeeping, no I/O; the dispatcher owns the only
/// instance for the lifetime of a batch.
///
/// The failure list follows completion order, not admission order.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    completed: usize,
    failed: Vec<PathBuf>,
    failed_set: HashSet<PathBuf>,
}

impl ResultAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one task outcome.
    pub fn record(&mut self, outcome: &TaskOutcome) {
        self.completed += 1;
        if let TaskOutcome::Failure { input, .. } = outcome {
            if self.failed_set.insert(input.clone()) {
                self.failed.push(input.clone());
            }
        }
    }

    /// Number of outcomes recorded so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Whether `input` has a recorded failure.
    pub fn is_failure(&self, input: &Path) -> bool {
        self.failed_set.contains(input)
    }

    /// Failing inputs in completion order.
    pub fn failures(&self) -> &[PathBuf] {
        &self.failed
    }

    /// Consume the aggregator, yielding the failure list.
    pub fn into_failures(self) -> Vec<PathBuf> {
        self.failed
    }
}
