//! Per-subject data descriptor

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Functional images of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FunctionalData {
    /// One (typically 4D) image
    Single(PathBuf),
    /// One image per volume, in name order
    Volumes(Vec<PathBuf>),
}

impl FunctionalData {
    /// Collapse a single match to `Single`; `None` for no matches
    pub fn from_matches(mut matches: Vec<PathBuf>) -> Option<Self> {
        match matches.len() {
            0 => None,
            1 => matches.pop().map(FunctionalData::Single),
            _ => Some(FunctionalData::Volumes(matches)),
        }
    }

    /// First image; its directory names the session
    pub fn first(&self) -> &Path {
        match self {
            FunctionalData::Single(p) => p,
            FunctionalData::Volumes(v) => &v[0],
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        match self {
            FunctionalData::Single(p) => std::slice::from_ref(p),
            FunctionalData::Volumes(v) => v,
        }
    }
}

/// Everything the preprocessing collaborator needs to know about one subject
///
/// Built once by discovery; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectDescriptor {
    pub subject_id: String,
    /// Session labels, same order for every subject of a job
    pub session_ids: Vec<String>,
    /// One entry per session
    pub functional_data: Vec<FunctionalData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anatomical_data: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// One entry per session
    pub session_output_dirs: Vec<PathBuf>,
    pub anatomical_output_dir: PathBuf,
}

impl SubjectDescriptor {
    pub fn session_count(&self) -> usize {
        self.session_ids.len()
    }

    /// Every directory discovery creates for this subject
    pub fn output_dirs(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.output_dir.as_path())
            .chain(self.session_output_dirs.iter().map(PathBuf::as_path))
            .chain(std::iter::once(self.anatomical_output_dir.as_path()))
    }
}
