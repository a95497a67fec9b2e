/*
 * preproc-job - Job-configuration compiler for fMRI preprocessing
 *
 * Turns a declarative job file into:
 * - one SubjectDescriptor per discovered subject (functional sessions,
 *   optional anatomical image, output directories)
 * - one PipelineParameters record shared by every subject
 *
 * Pipeline:
 *   job file -> RawConfig -> SanitizedConfig -> (discovery, assembly)
 *
 * No image I/O happens here; the preprocessing backend consumes the
 * compiled structures.
 */

// Public modules
pub mod compiler;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod paths;
pub mod pipeline;

// Re-exports
pub use compiler::{compile, CompiledJob};
pub use config::{ConfigValue, RawConfig, SanitizedConfig};
pub use discovery::{discover, FunctionalData, SubjectDescriptor};
pub use errors::{JobError, Result};
pub use pipeline::{
    assemble, CoregDirection, CoregisterParams, NormalizeParams, PipelineParameters,
    RealignParams, SegmentParams, SliceOrder, SliceTimingParams, SmoothingParams, StageControl,
    StageId,
};
