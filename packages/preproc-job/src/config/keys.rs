//! Recognized option keys
//!
//! Canonical keys are the names historical job files use. Descriptive
//! aliases are folded onto them during sanitization.

use once_cell::sync::Lazy;
use regex::Regex;

pub const DATASET_DIR: &str = "dataset_dir";
pub const OUTPUT_DIR: &str = "output_dir";
pub const DATASET_ID: &str = "dataset_id";
pub const DATASET_DESCRIPTION: &str = "dataset_description";
pub const SUBJECT_DIRS: &str = "subject_dirs";
pub const SUBJECT_COUNT: &str = "nsubjects";
pub const SESSION_COUNT: &str = "nsessions";
pub const INCLUDE_SUBJECTS: &str = "include_only_these_subject_ids";
pub const EXCLUDE_SUBJECTS: &str = "exclude_these_subject_ids";
pub const ANAT: &str = "anat";

pub const JOB_COUNT: &str = "n_jobs";
pub const CACHING: &str = "caching";
pub const REPORT: &str = "report";
pub const CV_TC: &str = "cv_tc";
pub const DELETE_ORIENT: &str = "deleteorient";
pub const SPM_DIR: &str = "spm_dir";
pub const MATLAB_EXEC: &str = "matlab_exec";

pub const TR: &str = "TR";
pub const TA: &str = "TA";
pub const SLICE_ORDER: &str = "slice_order";
pub const INTERLEAVED: &str = "interleaved";
pub const SLICE_COUNT: &str = "nslices";
pub const REF_SLICE: &str = "refslice";

pub const RESLICE_REALIGN: &str = "reslice_realign";
pub const REGISTER_TO_MEAN: &str = "register_to_mean";
pub const COREGISTER_RESLICE: &str = "coregister_reslice";
pub const COREG_FUNC_TO_ANAT: &str = "coreg_func_to_anat";
pub const FUNC_VOXEL_SIZES: &str = "func_voxel_sizes";
pub const ANAT_VOXEL_SIZES: &str = "anat_voxel_sizes";
pub const DARTEL: &str = "dartel";
pub const FWHM: &str = "fwhm";

/// Plain `disable` inside a stage block
pub const DISABLE: &str = "disable";

/// Scalars evaluated as arithmetic literals
pub const NUMERIC_SCALAR_KEYS: &[&str] = &[
    TR,
    TA,
    SLICE_COUNT,
    REF_SLICE,
    SUBJECT_COUNT,
    SESSION_COUNT,
    JOB_COUNT,
];

/// Numeric scalars that must be whole numbers
pub const INTEGER_KEYS: &[&str] = &[SLICE_COUNT, REF_SLICE, SUBJECT_COUNT, SESSION_COUNT, JOB_COUNT];

/// Numeric scalars that must not be negative
pub const NON_NEGATIVE_KEYS: &[&str] = &[SUBJECT_COUNT, SESSION_COUNT, JOB_COUNT, SLICE_COUNT];

/// Values parsed into flat number sequences
pub const NUMERIC_LIST_KEYS: &[&str] = &[FWHM, ANAT_VOXEL_SIZES, FUNC_VOXEL_SIZES, SLICE_ORDER];

/// Descriptive alias → canonical key
pub const KEY_ALIASES: &[(&str, &str)] = &[
    ("repetition_time", TR),
    ("acquisition_time", TA),
    ("slice_count", SLICE_COUNT),
    ("reference_slice", REF_SLICE),
    ("subject_count", SUBJECT_COUNT),
    ("session_count", SESSION_COUNT),
    ("job_count", JOB_COUNT),
];

const GLOBAL_KEYS: &[&str] = &[
    DATASET_DIR,
    OUTPUT_DIR,
    DATASET_ID,
    DATASET_DESCRIPTION,
    SUBJECT_DIRS,
    SUBJECT_COUNT,
    SESSION_COUNT,
    INCLUDE_SUBJECTS,
    EXCLUDE_SUBJECTS,
    ANAT,
    JOB_COUNT,
    CACHING,
    REPORT,
    CV_TC,
    DELETE_ORIENT,
    SPM_DIR,
    MATLAB_EXEC,
];

/// Stage block names, in pipeline order, with the options each one owns
pub const STAGE_SECTIONS: &[(&str, &[&str])] = &[
    (
        "slice_timing",
        &[TR, TA, SLICE_ORDER, INTERLEAVED, SLICE_COUNT, REF_SLICE],
    ),
    ("realign", &[RESLICE_REALIGN, REGISTER_TO_MEAN]),
    ("coregister", &[COREGISTER_RESLICE, COREG_FUNC_TO_ANAT]),
    ("segment", &[]),
    ("normalize", &[FUNC_VOXEL_SIZES, ANAT_VOXEL_SIZES, DARTEL]),
    ("smooth", &[FWHM]),
];

static SESSION_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^session_(.+)_func$").expect("valid session key regex"));

/// Canonical name for `key` (identity for non-aliases)
pub fn canonical(key: &str) -> &str {
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(key)
}

/// `disable_<stage>` key for a stage block
pub fn disable_key(stage: &str) -> String {
    format!("disable_{}", stage)
}

/// Session label of a `session_<label>_func` key
pub fn session_label(key: &str) -> Option<&str> {
    SESSION_KEY_RE
        .captures(key)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

pub fn is_stage_section(name: &str) -> bool {
    STAGE_SECTIONS.iter().any(|(stage, _)| *stage == name)
}

/// Whether `key` means anything at option root level
pub fn is_known(key: &str) -> bool {
    let key = canonical(key);
    GLOBAL_KEYS.contains(&key)
        || is_stage_section(key)
        || session_label(key).is_some()
        || STAGE_SECTIONS
            .iter()
            .any(|(stage, owned)| owned.contains(&key) || disable_key(stage) == key)
}

/// Every root-level key, for suggestions
fn all_known_keys() -> Vec<String> {
    let mut keys: Vec<String> = GLOBAL_KEYS.iter().map(|k| k.to_string()).collect();
    for (stage, owned) in STAGE_SECTIONS {
        keys.push(stage.to_string());
        keys.push(disable_key(stage));
        keys.extend(owned.iter().map(|k| k.to_string()));
    }
    keys.extend(KEY_ALIASES.iter().map(|(alias, _)| alias.to_string()));
    keys
}

/// "Did you mean ...?" for an unrecognized key
pub fn suggest(key: &str) -> Option<String> {
    let candidates = all_known_keys();
    let (closest, distance) = candidates
        .iter()
        .map(|c| (c, levenshtein_distance(key, c)))
        .min_by_key(|(_, d)| *d)?;
    // Unrelated keys get no suggestion
    if distance <= key.len().max(3) / 3 + 1 {
        Some(format!("Did you mean '{}'?", closest))
    } else {
        None
    }
}

/// Simple Levenshtein distance implementation
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1: Vec<char> = s1.chars().collect();
    let s2: Vec<char> = s2.chars().collect();
    let mut matrix = vec![vec![0; s2.len() + 1]; s1.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=s2.len() {
        matrix[0][j] = j;
    }

    for (i, c1) in s1.iter().enumerate() {
        for (j, c2) in s2.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            matrix[i + 1][j + 1] = (matrix[i][j + 1] + 1) // deletion
                .min(matrix[i + 1][j] + 1) // insertion
                .min(matrix[i][j] + cost); // substitution
        }
    }

    matrix[s1.len()][s2.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("fwhm", "fwhm"), 0);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn test_canonical_aliases() {
        assert_eq!(canonical("repetition_time"), "TR");
        assert_eq!(canonical("job_count"), "n_jobs");
        assert_eq!(canonical("fwhm"), "fwhm");
    }

    #[test]
    fn test_session_label() {
        assert_eq!(session_label("session_1_func"), Some("1"));
        assert_eq!(session_label("session_rest_a_func"), Some("rest_a"));
        assert_eq!(session_label("session__func"), None);
        assert_eq!(session_label("sessions_1_func"), None);
    }

    #[test]
    fn test_known_keys() {
        assert!(is_known("TR"));
        assert!(is_known("repetition_time"));
        assert!(is_known("disable_realign"));
        assert!(is_known("session_2_func"));
        assert!(is_known("normalize"));
        assert!(!is_known("fwmh_typo"));
    }

    #[test]
    fn test_suggest_close_key() {
        let suggestion = suggest("reslice_realing").unwrap();
        assert!(suggestion.contains("reslice_realign"));
        assert!(suggest("zzzzzzzzzzzz").is_none());
    }
}
