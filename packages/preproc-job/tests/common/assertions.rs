//! Assertion helpers for compiled jobs

use preproc_job::{CompiledJob, JobError, Result};

/// Subject ids in compiled order
pub fn subject_ids(job: &CompiledJob) -> Vec<String> {
    job.subjects().iter().map(|s| s.subject_id.clone()).collect()
}

/// Assert that compilation failed with the given error kind
pub fn assert_error_kind<T: std::fmt::Debug>(result: Result<T>, kind: &str) -> JobError {
    match result {
        Ok(value) => panic!("expected {kind}, compiled successfully: {value:?}"),
        Err(e) => {
            assert_eq!(e.kind(), kind, "unexpected error: {e}");
            e
        }
    }
}

/// Every subject has one functional entry and one output dir per session
pub fn assert_sessions_consistent(job: &CompiledJob) {
    for subject in job.subjects() {
        assert_eq!(
            subject.session_ids.len(),
            subject.functional_data.len(),
            "subject {}",
            subject.subject_id
        );
        assert_eq!(
            subject.session_ids.len(),
            subject.session_output_dirs.len(),
            "subject {}",
            subject.subject_id
        );
    }
    if let Some(first) = job.subjects().first() {
        for subject in job.subjects() {
            assert_eq!(subject.session_ids, first.session_ids);
        }
    }
}

/// Every output directory of every subject exists
pub fn assert_output_dirs_created(job: &CompiledJob) {
    for subject in job.subjects() {
        for dir in subject.output_dirs() {
            assert!(dir.is_dir(), "missing output dir {}", dir.display());
        }
    }
}
