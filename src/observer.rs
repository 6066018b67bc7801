//! Console rendering of batch progress.

use async_trait::async_trait;
use std::path::PathBuf;

use fm_batch::BatchObserver;
use fm_core::TaskOutcome;

/// Prints one line per finished file and a closing summary.
pub struct ConsoleObserver;

#[async_trait]
impl BatchObserver for ConsoleObserver {
    async fn on_task_done(&self, outcome: &TaskOutcome) {
        match outcome {
            TaskOutcome::Success { input, output } => {
                println!("ok   {} -> {}", input.display(), output.display());
            }
            TaskOutcome::Failure { input, error } => {
                println!("FAIL {}: {error}", input.display());
            }
        }
    }

    async fn on_batch_done(&self, failed: &[PathBuf]) {
        println!();
        if failed.is_empty() {
            println!("All files converted successfully");
        } else {
            println!("{} file(s) failed to convert:", failed.len());
            for path in failed {
                println!("  {}", path.display());
            }
        }
    }
}
