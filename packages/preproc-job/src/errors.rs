//! Error types for preproc-job
//!
//! Every failure is fatal for the compilation that raised it. Variants that
//! originate from a job file carry its path so the message is actionable
//! without further context.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for job compilation
#[derive(Debug, Error)]
pub enum JobError {
    /// Job path missing or not a regular file
    #[error("Job file not found: {} is not a regular file", path.display())]
    JobFileNotFound { path: PathBuf },

    /// Malformed job file syntax
    #[error("Failed to parse job file {} (line {line}): {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Required field absent or resolving to an unusable path
    #[error("Configuration error in {}: field '{field}' {message}", job.display())]
    Config {
        job: PathBuf,
        field: String,
        message: String,
    },

    /// Value failed type coercion for its key
    #[error("Invalid value for '{key}' in {}: '{value}' ({reason})", job.display())]
    ConfigValue {
        job: PathBuf,
        key: String,
        value: String,
        reason: String,
    },

    /// Subject data could not be discovered
    #[error("Discovery failed for job {}: {message}", job.display())]
    Discovery {
        job: PathBuf,
        subject: Option<String>,
        message: String,
    },

    /// IO error
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parsing error
    #[error("YAML parsing error in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl JobError {
    /// Create a configuration error
    pub fn config(job: &Path, field: impl Into<String>, message: impl Into<String>) -> Self {
        JobError::Config {
            job: job.to_path_buf(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a value coercion error
    pub fn config_value(
        job: &Path,
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        JobError::ConfigValue {
            job: job.to_path_buf(),
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a discovery error scoped to one subject
    pub fn discovery(job: &Path, subject: impl Into<String>, message: impl Into<String>) -> Self {
        let subject = subject.into();
        JobError::Discovery {
            job: job.to_path_buf(),
            message: format!("subject {}: {}", subject, message.into()),
            subject: Some(subject),
        }
    }

    /// Create a discovery error not tied to a single subject
    pub fn discovery_global(job: &Path, message: impl Into<String>) -> Self {
        JobError::Discovery {
            job: job.to_path_buf(),
            subject: None,
            message: message.into(),
        }
    }

    /// Wrap an IO error with the path it happened on
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        JobError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::JobFileNotFound { .. } => "JobFileNotFoundError",
            JobError::Parse { .. } | JobError::Yaml { .. } => "JobParseError",
            JobError::Config { .. } => "ConfigError",
            JobError::ConfigValue { .. } => "ConfigValueError",
            JobError::Discovery { .. } => "DiscoveryError",
            JobError::Io { .. } => "IoError",
        }
    }
}

/// Result type alias for job compilation
pub type Result<T> = std::result::Result<T, JobError>;
