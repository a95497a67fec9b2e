//! Pipeline parameter assembly
//!
//! Every stage is either absent (disabled) or present with a complete
//! parameter record. Nothing configured for a disabled stage survives
//! into [`PipelineParameters`].

use crate::config::{keys, ConfigValue, SanitizedConfig, Scope};
use crate::errors::{JobError, Result};
use crate::paths;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_FUNC_VOXEL_SIZES: [f64; 3] = [3.0, 3.0, 3.0];
pub const DEFAULT_ANAT_VOXEL_SIZES: [f64; 3] = [1.0, 1.0, 1.0];
pub const DEFAULT_FWHM: f64 = 0.0;

/// Processing stages, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    SliceTiming,
    Realign,
    Coregister,
    Segment,
    Normalize,
    Smooth,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::SliceTiming,
        StageId::Realign,
        StageId::Coregister,
        StageId::Segment,
        StageId::Normalize,
        StageId::Smooth,
    ];

    /// Name of the stage block in a job file
    pub fn block_name(self) -> &'static str {
        match self {
            StageId::SliceTiming => "slice_timing",
            StageId::Realign => "realign",
            StageId::Coregister => "coregister",
            StageId::Segment => "segment",
            StageId::Normalize => "normalize",
            StageId::Smooth => "smooth",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageId::SliceTiming => "SliceTiming",
            StageId::Realign => "Realign",
            StageId::Coregister => "Coregister",
            StageId::Segment => "Segment",
            StageId::Normalize => "Normalize",
            StageId::Smooth => "Smooth",
        };
        write!(f, "{}", name)
    }
}

/// Slice acquisition order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SliceOrder {
    /// Named order such as `ascending`
    Named(String),
    /// Explicit slice indices
    Explicit(Vec<i64>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SliceTimingParams {
    pub repetition_time: f64,
    pub acquisition_time: Option<f64>,
    pub slice_order: Option<SliceOrder>,
    pub interleaved: Option<bool>,
    pub slice_count: Option<i64>,
    pub reference_slice: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RealignParams {
    pub reslice_output: bool,
    pub register_to_mean: bool,
}

/// Which image moves during coregistration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoregDirection {
    FuncToAnat,
    AnatToFunc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoregisterParams {
    pub reslice_output: bool,
    pub direction: CoregDirection,
}

/// Segmentation has no tunables yet; presence alone enables it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SegmentParams {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeParams {
    pub functional_voxel_sizes: Vec<f64>,
    pub anatomical_voxel_sizes: Vec<f64>,
    pub dartel_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothingParams {
    /// Kernel width in mm, one value or one per axis
    pub fwhm: Vec<f64>,
}

/// On/off summary of every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageControl {
    pub slice_timing: bool,
    pub realign: bool,
    pub coregister: bool,
    pub segment: bool,
    pub normalize: bool,
    pub smooth: bool,
}

impl StageControl {
    pub fn is_enabled(&self, stage: StageId) -> bool {
        match stage {
            StageId::SliceTiming => self.slice_timing,
            StageId::Realign => self.realign,
            StageId::Coregister => self.coregister,
            StageId::Segment => self.segment,
            StageId::Normalize => self.normalize,
            StageId::Smooth => self.smooth,
        }
    }

    /// Enabled stages in pipeline order
    pub fn enabled(&self) -> Vec<StageId> {
        StageId::ALL
            .into_iter()
            .filter(|s| self.is_enabled(*s))
            .collect()
    }
}

/// Job-wide processing parameters, shared by every subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineParameters {
    pub dataset_root: PathBuf,
    pub output_root: PathBuf,
    pub dataset_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_description: Option<String>,
    /// Parallelism hint for the preprocessing collaborator
    pub job_count: Option<usize>,
    pub caching_enabled: bool,
    pub report_enabled: bool,
    pub coefficient_of_variation_enabled: bool,
    pub delete_orientation_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spm_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matlab_exec: Option<PathBuf>,

    pub slice_timing: Option<SliceTimingParams>,
    pub realign: Option<RealignParams>,
    pub coregister: Option<CoregisterParams>,
    pub segment: Option<SegmentParams>,
    pub normalize: Option<NormalizeParams>,
    pub smooth: Option<SmoothingParams>,
}

impl PipelineParameters {
    pub fn stages(&self) -> StageControl {
        StageControl {
            slice_timing: self.slice_timing.is_some(),
            realign: self.realign.is_some(),
            coregister: self.coregister.is_some(),
            segment: self.segment.is_some(),
            normalize: self.normalize.is_some(),
            smooth: self.smooth.is_some(),
        }
    }

    pub fn is_enabled(&self, stage: StageId) -> bool {
        self.stages().is_enabled(stage)
    }
}

/// Stage scope, or `None` when the stage is disabled
fn enabled_scope(config: &SanitizedConfig, stage: StageId) -> Result<Option<Scope<'_>>> {
    let scope = config.stage(stage.block_name());
    if !scope.disabled(stage.block_name())? {
        return Ok(Some(scope));
    }

    debug!("stage {} disabled", stage);
    if let Some(ConfigValue::Section(block)) = config.get(stage.block_name()) {
        let disable_key = keys::disable_key(stage.block_name());
        let ignored: Vec<&str> = block
            .keys()
            .filter(|k| *k != keys::DISABLE && *k != disable_key)
            .collect();
        if !ignored.is_empty() {
            warn!(
                "{}: stage '{}' is disabled, ignoring [{}]",
                config.source().display(),
                stage.block_name(),
                ignored.join(", ")
            );
        }
    }
    Ok(None)
}

fn slice_order(config: &SanitizedConfig, scope: &Scope<'_>) -> Result<Option<SliceOrder>> {
    match scope.get(keys::SLICE_ORDER) {
        None => Ok(None),
        Some(ConfigValue::Str(name)) => Ok(Some(SliceOrder::Named(name.clone()))),
        Some(ConfigValue::Int(i)) => Ok(Some(SliceOrder::Explicit(vec![*i]))),
        Some(ConfigValue::Ints(order)) => Ok(Some(SliceOrder::Explicit(order.clone()))),
        Some(other) => Err(JobError::config_value(
            config.source(),
            keys::SLICE_ORDER,
            other.to_string(),
            format!("expected an order name or slice indices, found {}", other.type_name()),
        )),
    }
}

fn assemble_slice_timing(config: &SanitizedConfig) -> Result<Option<SliceTimingParams>> {
    let Some(scope) = enabled_scope(config, StageId::SliceTiming)? else {
        return Ok(None);
    };
    let Some(repetition_time) = scope.f64(keys::TR)? else {
        debug!("no {} configured, slice timing disabled", keys::TR);
        return Ok(None);
    };
    Ok(Some(SliceTimingParams {
        repetition_time,
        acquisition_time: scope.f64(keys::TA)?,
        slice_order: slice_order(config, &scope)?,
        interleaved: scope.bool(keys::INTERLEAVED)?,
        slice_count: scope.i64(keys::SLICE_COUNT)?,
        reference_slice: scope.i64(keys::REF_SLICE)?,
    }))
}

fn assemble_realign(config: &SanitizedConfig) -> Result<Option<RealignParams>> {
    let Some(scope) = enabled_scope(config, StageId::Realign)? else {
        return Ok(None);
    };
    Ok(Some(RealignParams {
        reslice_output: scope.bool_or(keys::RESLICE_REALIGN, false)?,
        register_to_mean: scope.bool_or(keys::REGISTER_TO_MEAN, true)?,
    }))
}

fn assemble_coregister(config: &SanitizedConfig) -> Result<Option<CoregisterParams>> {
    let Some(scope) = enabled_scope(config, StageId::Coregister)? else {
        return Ok(None);
    };
    let direction = if scope.bool_or(keys::COREG_FUNC_TO_ANAT, true)? {
        CoregDirection::FuncToAnat
    } else {
        CoregDirection::AnatToFunc
    };
    Ok(Some(CoregisterParams {
        reslice_output: scope.bool_or(keys::COREGISTER_RESLICE, false)?,
        direction,
    }))
}

fn assemble_segment(config: &SanitizedConfig) -> Result<Option<SegmentParams>> {
    Ok(enabled_scope(config, StageId::Segment)?.map(|_| SegmentParams::default()))
}

fn assemble_normalize(config: &SanitizedConfig) -> Result<Option<NormalizeParams>> {
    let Some(scope) = enabled_scope(config, StageId::Normalize)? else {
        return Ok(None);
    };
    Ok(Some(NormalizeParams {
        functional_voxel_sizes: scope
            .f64_list(keys::FUNC_VOXEL_SIZES)?
            .unwrap_or_else(|| DEFAULT_FUNC_VOXEL_SIZES.to_vec()),
        anatomical_voxel_sizes: scope
            .f64_list(keys::ANAT_VOXEL_SIZES)?
            .unwrap_or_else(|| DEFAULT_ANAT_VOXEL_SIZES.to_vec()),
        dartel_enabled: scope.bool_or(keys::DARTEL, false)?,
    }))
}

fn assemble_smooth(config: &SanitizedConfig) -> Result<Option<SmoothingParams>> {
    let Some(scope) = enabled_scope(config, StageId::Smooth)? else {
        return Ok(None);
    };
    Ok(Some(SmoothingParams {
        fwhm: scope
            .f64_list(keys::FWHM)?
            .unwrap_or_else(|| vec![DEFAULT_FWHM]),
    }))
}

/// Free text as written; an unquoted comma list is joined back with ", "
fn free_text(config: &SanitizedConfig, key: &str) -> Option<String> {
    config.root().get(key).map(|value| match value {
        ConfigValue::Str(text) => text.clone(),
        other => other.to_string(),
    })
}

/// Expand a tool location; a configured but unexpandable value is an error
fn tool_path(config: &SanitizedConfig, key: &str) -> Result<Option<PathBuf>> {
    match config.root().str(key)? {
        None => Ok(None),
        Some(raw) => paths::expand(raw).map(Some).ok_or_else(|| {
            JobError::config(
                config.source(),
                key,
                format!("could not be expanded: '{}'", raw),
            )
        }),
    }
}

/// Build the pipeline parameters of a job
pub fn assemble(
    config: &SanitizedConfig,
    dataset_root: &Path,
    output_root: &Path,
) -> Result<PipelineParameters> {
    let root = config.root();

    let job_count = root
        .i64(keys::JOB_COUNT)?
        .map(|n| {
            usize::try_from(n).map_err(|_| {
                JobError::config_value(config.source(), keys::JOB_COUNT, n.to_string(), "must not be negative")
            })
        })
        .transpose()?;

    let dataset_id = free_text(config, keys::DATASET_ID)
        .unwrap_or_else(|| dataset_root.display().to_string());

    Ok(PipelineParameters {
        dataset_root: dataset_root.to_path_buf(),
        output_root: output_root.to_path_buf(),
        dataset_id,
        dataset_description: free_text(config, keys::DATASET_DESCRIPTION),
        job_count,
        caching_enabled: root.bool_or(keys::CACHING, true)?,
        report_enabled: root.bool_or(keys::REPORT, true)?,
        coefficient_of_variation_enabled: root.bool_or(keys::CV_TC, true)?,
        delete_orientation_metadata: root.bool_or(keys::DELETE_ORIENT, false)?,
        spm_dir: tool_path(config, keys::SPM_DIR)?,
        matlab_exec: tool_path(config, keys::MATLAB_EXEC)?,
        slice_timing: assemble_slice_timing(config)?,
        realign: assemble_realign(config)?,
        coregister: assemble_coregister(config)?,
        segment: assemble_segment(config)?,
        normalize: assemble_normalize(config)?,
        smooth: assemble_smooth(config)?,
    })
}
