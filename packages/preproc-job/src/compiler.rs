//! Job compilation: job file in, subjects and pipeline parameters out

use crate::config::{keys, sanitize, RawConfig, SanitizedConfig};
use crate::discovery::{self, SubjectDescriptor};
use crate::errors::{JobError, Result};
use crate::paths;
use crate::pipeline::{self, PipelineParameters};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Result of compiling one job
#[derive(Debug, Clone, Serialize)]
pub struct CompiledJob {
    subjects: Vec<SubjectDescriptor>,
    parameters: PipelineParameters,
}

impl CompiledJob {
    pub fn subjects(&self) -> &[SubjectDescriptor] {
        &self.subjects
    }

    pub fn parameters(&self) -> &PipelineParameters {
        &self.parameters
    }

    pub fn into_parts(self) -> (Vec<SubjectDescriptor>, PipelineParameters) {
        (self.subjects, self.parameters)
    }

    /// One-line summary, e.g. `study: 3 subject(s) [Realign, Smooth]`
    pub fn describe(&self) -> String {
        let stages: Vec<String> = self
            .parameters
            .stages()
            .enabled()
            .iter()
            .map(|s| s.to_string())
            .collect();
        format!(
            "{}: {} subject(s) [{}]",
            self.parameters.dataset_id,
            self.subjects.len(),
            stages.join(", ")
        )
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|e| JobError::io(Path::new("."), e))
}

/// Make `path` absolute against the working directory
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(paths::normalize(path))
    } else {
        Ok(paths::normalize(&current_dir()?.join(path)))
    }
}

/// Dataset root from the override (relative to cwd) or from `dataset_dir`
/// (relative to the job file's directory)
fn resolve_dataset_root(config: &SanitizedConfig, dataset_root_override: Option<&Path>) -> Result<PathBuf> {
    let job = config.source();

    let (attempted, resolved) = match dataset_root_override {
        Some(dir) => {
            let raw = dir.to_string_lossy().into_owned();
            let cwd = current_dir()?;
            let resolved = paths::resolve(&raw, Some(&cwd));
            (raw, resolved)
        }
        None => {
            let raw = config.root().str(keys::DATASET_DIR)?.ok_or_else(|| {
                JobError::config(job, keys::DATASET_DIR, "is required but not set")
            })?;
            (raw.to_string(), paths::resolve(raw, job.parent()))
        }
    };

    let dataset_root = resolved.ok_or_else(|| {
        JobError::config(
            job,
            keys::DATASET_DIR,
            format!("could not be resolved: '{}'", attempted),
        )
    })?;
    if !dataset_root.is_dir() {
        return Err(JobError::config(
            job,
            keys::DATASET_DIR,
            format!("{} is not an existing directory", dataset_root.display()),
        ));
    }
    Ok(dataset_root)
}

fn resolve_output_root(config: &SanitizedConfig, dataset_root: &Path) -> Result<PathBuf> {
    let job = config.source();
    let raw = config
        .root()
        .str(keys::OUTPUT_DIR)?
        .ok_or_else(|| JobError::config(job, keys::OUTPUT_DIR, "is required but not set"))?;
    paths::resolve(raw, Some(dataset_root)).ok_or_else(|| {
        JobError::config(
            job,
            keys::OUTPUT_DIR,
            format!(
                "could not be resolved: '{}' relative to {}",
                raw,
                dataset_root.display()
            ),
        )
    })
}

/// Compile a job file
///
/// Loads and sanitizes the job, resolves the dataset and output roots,
/// discovers every subject (creating their output directories) and
/// assembles the pipeline parameters. Any failure aborts the whole job.
pub fn compile(job_path: &Path, dataset_root_override: Option<&Path>) -> Result<CompiledJob> {
    let job_path = absolute(job_path)?;
    let raw = RawConfig::load(&job_path)?;
    let config = sanitize(&job_path, raw.into_options())?;

    let dataset_root = resolve_dataset_root(&config, dataset_root_override)?;
    let output_root = resolve_output_root(&config, &dataset_root)?;
    info!(
        "compiling {}: dataset {}, output {}",
        job_path.display(),
        dataset_root.display(),
        output_root.display()
    );

    let subjects = discovery::discover(&dataset_root, &output_root, &config)?;
    let parameters = pipeline::assemble(&config, &dataset_root, &output_root)?;

    Ok(CompiledJob {
        subjects,
        parameters,
    })
}
