//! Test fixture generators
//!
//! Layout of every workspace:
//!
//! ```text
//! <tmp>/
//!   job.ini        job files
//!   data/          dataset root, one directory per subject
//!   out/           output root (`output_dir = ../out`)
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary dataset plus job files
pub struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        fs::create_dir_all(tmp.path().join("data")).expect("create dataset root");
        Self { tmp }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    pub fn data(&self) -> PathBuf {
        self.root().join("data")
    }

    pub fn out(&self) -> PathBuf {
        self.root().join("out")
    }

    /// Create an empty file under the dataset root
    pub fn touch(&self, rel: &str) -> PathBuf {
        let path = self.data().join(rel);
        fs::create_dir_all(path.parent().expect("file has a parent")).expect("create parent");
        fs::write(&path, b"").expect("write file");
        path
    }

    /// Create an empty directory under the dataset root
    pub fn mkdir(&self, rel: &str) -> PathBuf {
        let path = self.data().join(rel);
        fs::create_dir_all(&path).expect("create dir");
        path
    }

    /// Subjects with a single-file `rest` session and a T1 image each
    pub fn with_subjects(self, ids: &[&str]) -> Self {
        for id in ids {
            self.touch(&format!("{id}/rest/bold.nii"));
            self.touch(&format!("{id}/anat/t1.nii"));
        }
        self
    }

    pub fn write_job(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).expect("write job file");
        path
    }
}

/// Minimal INI job over `data/` with one `rest` session, plus `extra` lines
pub fn fixture_ini_job(extra: &str) -> String {
    format!(
        "dataset_dir = data\n\
         output_dir = ../out\n\
         session_rest_func = rest/bold.nii\n\
         {extra}\n"
    )
}

/// Same job, wrapped in a `[config]` section as older job files are
pub fn fixture_wrapped_ini_job(extra: &str) -> String {
    format!("[config]\n{}", fixture_ini_job(extra))
}

/// YAML job over `data/` with one `rest` session, plus `extra` lines
pub fn fixture_yaml_job(extra: &str) -> String {
    format!(
        "dataset_dir: data\n\
         output_dir: ../out\n\
         session_rest_func: rest/bold.nii\n\
         {extra}\n"
    )
}
