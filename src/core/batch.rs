use crate::{
    core::{presets::Operation, workflow::TaskRunner},
    error::{Result, TaskError},
    types::ProcessOutcome,
};

use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{error, info};

/// Files to process for `input`: the file itself, or the regular non-hidden
/// files directly inside a directory, sorted by name.
pub fn collect_inputs(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        return Err(TaskError::Validation(format!(
            "input {} does not exist",
            input.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        let hidden = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// [`collect_inputs`] over several paths, sorted with duplicates removed.
pub fn collect_all_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        files.extend(collect_inputs(input)?);
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<(PathBuf, ProcessOutcome)>,
    pub failed: Vec<(PathBuf, TaskError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Process every input in order. A failing file is recorded and the batch
/// moves on to the next one.
pub fn run_batch(runner: &TaskRunner<'_>, inputs: &[PathBuf], op: &Operation) -> BatchReport {
    let mut report = BatchReport::default();
    for (i, input) in inputs.iter().enumerate() {
        info!(file = %input.display(), index = i + 1, total = inputs.len(), "processing");
        match runner.process_file(input, op) {
            Ok(outcome) => report.succeeded.push((input.clone(), outcome)),
            Err(e) => {
                error!(file = %input.display(), kind = e.kind(), error = %e, "cannot process file");
                report.failed.push((input.clone(), e));
            }
        }
    }
    report
}
