//! Batch request construction and pre-flight validation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use fm_core::{Error, OutputNaming, Result};

/// Everything needed to run one batch conversion.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Input files in selection order. Duplicates are collapsed to
    /// their first occurrence before scheduling.
    pub inputs: Vec<PathBuf>,
    /// Directory every output is written into.
    pub output_dir: PathBuf,
    /// Naming rule deriving output file names.
    pub naming: OutputNaming,
    /// Upper bound on concurrently running conversions.
    pub max_parallel: usize,
}

impl BatchRequest {
    /// Inputs reduced to first-occurrence order.
    ///
    /// Dedup uses exact path equality: no case folding, no symlink or
    /// relative-path resolution.
    pub fn unique_inputs(&self) -> Vec<PathBuf> {
        let mut seen: HashSet<&Path> = HashSet::new();
        self.inputs
            .iter()
            .filter(|p| seen.insert(p.as_path()))
            .cloned()
            .collect()
    }

    /// Pre-flight checks. A failed check rejects the whole batch
    /// before any task is admitted.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the input list is empty, the output
    /// directory is missing or not a directory, `max_parallel` is
    /// zero, or two distinct inputs would write the same output path.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            return Err(Error::Validation("input file list is empty".into()));
        }
        if self.max_parallel < 1 {
            return Err(Error::Validation("max_parallel must be at least 1".into()));
        }
        if !self.output_dir.is_dir() {
            return Err(Error::Validation(format!(
                "output directory {} does not exist or is not a directory",
                self.output_dir.display()
            )));
        }

        // Two distinct inputs mapping onto one output path would
        // overwrite each other mid-batch.
        let mut outputs: HashMap<PathBuf, &PathBuf> = HashMap::new();
        for input in &self.inputs {
            let output = self.naming.output_path(input, &self.output_dir);
            match outputs.get(&output) {
                Some(first) if *first != input => {
                    return Err(Error::Validation(format!(
                        "inputs {} and {} both map to output {}",
                        first.display(),
                        input.display(),
                        output.display()
                    )));
                }
                Some(_) => {}
                None => {
                    outputs.insert(output, input);
                }
            }
        }

        Ok(())
    }
}
