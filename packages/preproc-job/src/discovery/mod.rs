//! Subject discovery
//!
//! Enumerates subject directories under the dataset root, filters them,
//! and globs every session's functional images plus the optional
//! anatomical image relative to each subject directory.
//!
//! Discovery is all-or-nothing: output directories are only created once
//! every accepted subject has complete data.

pub mod subject;
pub mod wildcard;

pub use subject::{FunctionalData, SubjectDescriptor};
pub use wildcard::EntryKind;

use crate::config::{keys, SanitizedConfig};
use crate::errors::{JobError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default subject pattern: every immediate child directory
pub const DEFAULT_SUBJECT_PATTERN: &str = "*";

/// Discovery-relevant options, read once from the sanitized config
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOptions {
    pub subject_pattern: String,
    pub subject_cap: Option<usize>,
    pub include: HashSet<String>,
    pub exclude: HashSet<String>,
    /// `(label, pattern)` per session, in job-file order
    pub sessions: Vec<(String, String)>,
    pub anat_pattern: Option<String>,
}

impl DiscoveryOptions {
    pub fn from_config(config: &SanitizedConfig) -> Result<Self> {
        let job = config.source();
        let root = config.root();

        let subject_pattern = root
            .str(keys::SUBJECT_DIRS)?
            .unwrap_or(DEFAULT_SUBJECT_PATTERN)
            .to_string();

        let subject_cap = root
            .i64(keys::SUBJECT_COUNT)?
            .map(|n| {
                usize::try_from(n).map_err(|_| {
                    JobError::config_value(job, keys::SUBJECT_COUNT, n.to_string(), "must not be negative")
                })
            })
            .transpose()?;

        let sessions = config.session_patterns()?;
        if sessions.is_empty() {
            return Err(JobError::config(
                job,
                "session_<id>_func",
                "is required: no functional session pattern configured",
            ));
        }
        if let Some(expected) = root.i64(keys::SESSION_COUNT)? {
            if expected != sessions.len() as i64 {
                warn!(
                    "{}: {} = {} but {} session pattern(s) configured",
                    job.display(),
                    keys::SESSION_COUNT,
                    expected,
                    sessions.len()
                );
            }
        }

        Ok(Self {
            subject_pattern,
            subject_cap,
            include: root.string_list(keys::INCLUDE_SUBJECTS)?.into_iter().collect(),
            exclude: root.string_list(keys::EXCLUDE_SUBJECTS)?.into_iter().collect(),
            sessions,
            anat_pattern: root.str(keys::ANAT)?.map(str::to_string),
        })
    }

    /// Whether a subject id survives the include/exclude filters
    pub fn accepts(&self, subject_id: &str) -> bool {
        if self.exclude.contains(subject_id) {
            return false;
        }
        self.include.is_empty() || self.include.contains(subject_id)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Output directory mirroring `data_dir`'s base name, flattened when it
/// repeats the subject's own directory name
fn mirrored_output_dir(output_dir: &Path, data_dir: Option<&Path>, subject_id: &str) -> PathBuf {
    match data_dir.map(file_name) {
        Some(name) if !name.is_empty() && name != subject_id => output_dir.join(name),
        _ => output_dir.to_path_buf(),
    }
}

fn glob(job: &Path, key: &str, base: &Path, pattern: &str, kind: EntryKind) -> Result<Vec<PathBuf>> {
    wildcard::expand(base, pattern, kind).map_err(|e| {
        JobError::config_value(job, key, pattern, format!("invalid wildcard pattern: {}", e))
    })
}

/// Discover one subject's data; no filesystem writes
fn discover_subject(
    job: &Path,
    subject_dir: &Path,
    subject_id: &str,
    output_root: &Path,
    options: &DiscoveryOptions,
) -> Result<SubjectDescriptor> {
    let output_dir = output_root.join(subject_id);
    let mut functional_data = Vec::with_capacity(options.sessions.len());
    let mut session_output_dirs = Vec::with_capacity(options.sessions.len());

    for (label, pattern) in &options.sessions {
        let key = format!("session_{}_func", label);
        let matches = glob(job, &key, subject_dir, pattern, EntryKind::File)?;
        let data = FunctionalData::from_matches(matches).ok_or_else(|| {
            JobError::discovery(
                job,
                subject_id,
                format!(
                    "no functional images for session '{}' matching {}",
                    label,
                    subject_dir.join(pattern).display()
                ),
            )
        })?;
        debug!(
            "subject {}: session {} has {} image(s)",
            subject_id,
            label,
            data.paths().len()
        );
        session_output_dirs.push(mirrored_output_dir(&output_dir, data.first().parent(), subject_id));
        functional_data.push(data);
    }

    let anatomical_data = match &options.anat_pattern {
        None => None,
        Some(pattern) => {
            let matches = glob(job, keys::ANAT, subject_dir, pattern, EntryKind::File)?;
            if matches.len() > 1 {
                warn!(
                    "subject {}: {} anatomical images match {}, using the first",
                    subject_id,
                    matches.len(),
                    pattern
                );
            }
            let anat = matches.into_iter().next().ok_or_else(|| {
                JobError::discovery(
                    job,
                    subject_id,
                    format!("anatomical image not found: {}", subject_dir.join(pattern).display()),
                )
            })?;
            Some(anat)
        }
    };

    let anatomical_output_dir = match &anatomical_data {
        Some(anat) => mirrored_output_dir(&output_dir, anat.parent(), subject_id),
        None => output_dir.clone(),
    };

    Ok(SubjectDescriptor {
        subject_id: subject_id.to_string(),
        session_ids: options.sessions.iter().map(|(label, _)| label.clone()).collect(),
        functional_data,
        anatomical_data,
        output_dir,
        session_output_dirs,
        anatomical_output_dir,
    })
}

/// Create every output directory of every subject (idempotent)
fn create_output_dirs(job: &Path, subjects: &[SubjectDescriptor]) -> Result<()> {
    for subject in subjects {
        for dir in subject.output_dirs() {
            fs::create_dir_all(dir).map_err(|e| {
                JobError::discovery(
                    job,
                    subject.subject_id.as_str(),
                    format!("cannot create output directory {}: {}", dir.display(), e),
                )
            })?;
        }
    }
    Ok(())
}

/// Discover every accepted subject under `dataset_root`
///
/// Subjects come back in lexicographic order of their directory names.
/// Any subject with missing session or anatomical data aborts the whole
/// discovery.
pub fn discover(
    dataset_root: &Path,
    output_root: &Path,
    config: &SanitizedConfig,
) -> Result<Vec<SubjectDescriptor>> {
    let job = config.source();
    let options = DiscoveryOptions::from_config(config)?;

    let candidates = glob(
        job,
        keys::SUBJECT_DIRS,
        dataset_root,
        &options.subject_pattern,
        EntryKind::Dir,
    )?;
    debug!(
        "{} candidate subject dir(s) matching {}",
        candidates.len(),
        dataset_root.join(&options.subject_pattern).display()
    );

    let mut subjects: Vec<SubjectDescriptor> = Vec::new();
    for subject_dir in &candidates {
        if options.subject_cap.is_some_and(|cap| subjects.len() >= cap) {
            break;
        }
        let subject_id = file_name(subject_dir);
        if !options.accepts(&subject_id) {
            debug!("skipping subject {}", subject_id);
            continue;
        }
        if subjects.iter().any(|s| s.subject_id == subject_id) {
            return Err(JobError::discovery(
                job,
                subject_id,
                format!("matched twice by subject pattern '{}'", options.subject_pattern),
            ));
        }
        subjects.push(discover_subject(job, subject_dir, &subject_id, output_root, &options)?);
    }

    if subjects.is_empty() {
        return Err(JobError::discovery_global(
            job,
            format!(
                "no subjects found matching {}",
                dataset_root.join(&options.subject_pattern).display()
            ),
        ));
    }

    create_output_dirs(job, &subjects)?;
    info!("discovered {} subject(s)", subjects.len());
    Ok(subjects)
}
