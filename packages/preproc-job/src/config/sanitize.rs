//! Value sanitizer
//!
//! Coerces raw string leaves into typed values according to the role of
//! their key:
//!
//! 1. boolean-like and null-like words (`yes`, `False`, `auto`, ...) become
//!    booleans or null, except for `slice_order`, whose words are data;
//! 2. numeric scalar keys are evaluated as arithmetic literals;
//! 3. numeric list keys are parsed into flat sequences, a singleton
//!    collapsing to a scalar;
//! 4. everything else passes through.

use super::expr::{self, Number};
use super::keys;
use super::raw::{RawValue, Section};
use super::sanitized::SanitizedConfig;
use super::value::ConfigValue;
use crate::errors::{JobError, Result};
use std::path::Path;
use tracing::warn;

const TRUE_WORDS: &[&str] = &["true", "yes"];
const FALSE_WORDS: &[&str] = &["false", "no"];
const NULL_WORDS: &[&str] = &["none", "auto", "unspecified", "unknown"];

/// Sanitizes the entries of one job file
pub struct Sanitizer<'a> {
    job: &'a Path,
}

impl<'a> Sanitizer<'a> {
    pub fn new(job: &'a Path) -> Self {
        Self { job }
    }

    fn value_error(&self, key: &str, value: impl Into<String>, reason: impl Into<String>) -> JobError {
        JobError::config_value(self.job, key, value, reason)
    }

    /// Sanitize a single leaf entry; `key` must already be canonical
    pub fn sanitize_entry(&self, key: &str, raw: &RawValue) -> Result<ConfigValue> {
        match raw {
            RawValue::Null => Ok(ConfigValue::Null),
            RawValue::Section(_) => Err(self.value_error(
                key,
                "[section]",
                "expected a value, found a section",
            )),
            RawValue::Scalar(s) => self.sanitize_scalar(key, s),
            RawValue::List(items) => self.sanitize_list(key, items),
        }
    }

    fn sanitize_scalar(&self, key: &str, raw: &str) -> Result<ConfigValue> {
        if key == keys::SLICE_ORDER {
            return self.sanitize_slice_order(raw);
        }

        let lowered = raw.trim().to_lowercase();
        if TRUE_WORDS.contains(&lowered.as_str()) {
            return self.reject_non_numeric(key, raw, ConfigValue::Bool(true));
        }
        if FALSE_WORDS.contains(&lowered.as_str()) {
            return self.reject_non_numeric(key, raw, ConfigValue::Bool(false));
        }
        if NULL_WORDS.contains(&lowered.as_str()) {
            return Ok(ConfigValue::Null);
        }

        if keys::NUMERIC_SCALAR_KEYS.contains(&key) {
            return self.evaluate_scalar(key, raw);
        }
        if keys::NUMERIC_LIST_KEYS.contains(&key) {
            return self.parse_number_list(key, &[raw], false);
        }
        Ok(ConfigValue::Str(raw.to_string()))
    }

    fn sanitize_list(&self, key: &str, items: &[String]) -> Result<ConfigValue> {
        if keys::NUMERIC_SCALAR_KEYS.contains(&key) {
            return match items {
                [single] => self.evaluate_scalar(key, single),
                _ => Err(self.value_error(key, items.join(", "), "expected a single number")),
            };
        }
        if keys::NUMERIC_LIST_KEYS.contains(&key) {
            let tokens: Vec<&str> = items.iter().map(String::as_str).collect();
            return self.parse_number_list(key, &tokens, key == keys::SLICE_ORDER);
        }
        Ok(ConfigValue::StrList(items.to_vec()))
    }

    /// Named orders stay lower-cased tokens; anything numeric must be integers
    fn sanitize_slice_order(&self, raw: &str) -> Result<ConfigValue> {
        let trimmed = raw.trim();
        let looks_numeric = trimmed.starts_with('[')
            || trimmed.contains(',')
            || trimmed.starts_with(|c: char| c.is_ascii_digit());
        if looks_numeric {
            self.parse_number_list(keys::SLICE_ORDER, &[trimmed], true)
        } else if trimmed.is_empty() {
            Ok(ConfigValue::Null)
        } else {
            Ok(ConfigValue::Str(trimmed.to_lowercase()))
        }
    }

    fn reject_non_numeric(&self, key: &str, raw: &str, value: ConfigValue) -> Result<ConfigValue> {
        if keys::NUMERIC_SCALAR_KEYS.contains(&key) || keys::NUMERIC_LIST_KEYS.contains(&key) {
            return Err(self.value_error(key, raw, "expected a number, found a boolean"));
        }
        Ok(value)
    }

    fn evaluate_scalar(&self, key: &str, raw: &str) -> Result<ConfigValue> {
        let number = expr::evaluate(raw).map_err(|e| self.value_error(key, raw, e.to_string()))?;

        if keys::NON_NEGATIVE_KEYS.contains(&key) && number.as_f64() < 0.0 {
            return Err(self.value_error(key, raw, "must not be negative"));
        }
        if keys::INTEGER_KEYS.contains(&key) {
            return number
                .as_i64()
                .map(ConfigValue::Int)
                .ok_or_else(|| self.value_error(key, raw, "expected a whole number"));
        }
        Ok(match number {
            Number::Int(i) => ConfigValue::Int(i),
            Number::Float(f) => ConfigValue::Float(f),
        })
    }

    fn parse_number_list(&self, key: &str, tokens: &[&str], integer: bool) -> Result<ConfigValue> {
        let joined = tokens.join(",").replace('[', "").replace(']', "");
        let parts: Vec<&str> = joined
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();

        let bad = |reason: &str| self.value_error(key, tokens.join(","), reason);

        if integer {
            let values = parts
                .iter()
                .map(|p| p.parse::<i64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| bad("expected a list of integers"))?;
            Ok(match values.len() {
                0 => ConfigValue::Null,
                1 => ConfigValue::Int(values[0]),
                _ => ConfigValue::Ints(values),
            })
        } else {
            let values = parts
                .iter()
                .map(|p| p.parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| bad("expected a list of numbers"))?;
            Ok(match values.len() {
                0 => ConfigValue::Null,
                1 => ConfigValue::Float(values[0]),
                _ => ConfigValue::Floats(values),
            })
        }
    }

    /// Sanitize a whole section, folding key aliases onto canonical names
    pub fn sanitize_section(&self, raw: Section<RawValue>) -> Result<Section<ConfigValue>> {
        let mut out = Section::new();
        for (key, value) in raw {
            let canonical = keys::canonical(&key).to_string();
            if out.contains_key(&canonical) {
                return Err(self.value_error(
                    &canonical,
                    key.as_str(),
                    format!("'{}' is given more than once (directly or via an alias)", canonical),
                ));
            }
            let value = match value {
                RawValue::Section(section) => ConfigValue::Section(self.sanitize_section(section)?),
                other => self.sanitize_entry(&canonical, &other)?,
            };
            out.insert(canonical, value);
        }
        Ok(out)
    }
}

/// Drop null entries at every depth
pub fn prune_nulls(section: &mut Section<ConfigValue>) {
    section.retain(|_, value| !value.is_null());
    for (_, value) in section.iter_mut() {
        if let ConfigValue::Section(inner) = value {
            prune_nulls(inner);
        }
    }
}

fn warn_unknown_keys(job: &Path, options: &Section<ConfigValue>) {
    for (key, value) in options.iter() {
        if !keys::is_known(key) {
            match keys::suggest(key) {
                Some(hint) => warn!("{}: unknown option '{}'. {}", job.display(), key, hint),
                None => warn!("{}: unknown option '{}'", job.display(), key),
            }
            continue;
        }
        if let ConfigValue::Section(inner) = value {
            let owned = keys::STAGE_SECTIONS
                .iter()
                .find(|(stage, _)| *stage == key)
                .map(|(_, owned)| *owned)
                .unwrap_or(&[]);
            for inner_key in inner.keys() {
                let fits = owned.contains(&inner_key)
                    || inner_key == keys::DISABLE
                    || inner_key == keys::disable_key(key);
                if !fits {
                    warn!(
                        "{}: option '{}' has no effect inside the [{}] block",
                        job.display(),
                        inner_key,
                        key
                    );
                }
            }
        }
    }
}

/// Sanitize a raw option tree and prune nulls, once, before anything reads it
pub fn sanitize(job: &Path, raw: Section<RawValue>) -> Result<SanitizedConfig> {
    let mut options = Sanitizer::new(job).sanitize_section(raw)?;
    prune_nulls(&mut options);
    warn_unknown_keys(job, &options);
    Ok(SanitizedConfig::new(job.to_path_buf(), options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(key: &str, raw: &str) -> Result<ConfigValue> {
        Sanitizer::new(Path::new("job.ini")).sanitize_entry(key, &RawValue::Scalar(raw.into()))
    }

    fn list(key: &str, items: &[&str]) -> Result<ConfigValue> {
        let items = items.iter().map(|s| s.to_string()).collect();
        Sanitizer::new(Path::new("job.ini")).sanitize_entry(key, &RawValue::List(items))
    }

    #[test]
    fn test_boolean_words() {
        assert_eq!(entry("caching", "Yes").unwrap(), ConfigValue::Bool(true));
        assert_eq!(entry("caching", "TRUE").unwrap(), ConfigValue::Bool(true));
        assert_eq!(entry("report", "no").unwrap(), ConfigValue::Bool(false));
        assert_eq!(entry("report", "False").unwrap(), ConfigValue::Bool(false));
    }

    #[test]
    fn test_null_words() {
        for word in ["none", "Auto", "UNSPECIFIED", "unknown"] {
            assert_eq!(entry("TA", word).unwrap(), ConfigValue::Null);
        }
    }

    #[test]
    fn test_slice_order_words_are_data() {
        assert_eq!(
            entry("slice_order", "Ascending").unwrap(),
            ConfigValue::Str("ascending".into())
        );
        assert_eq!(entry("slice_order", "TRUE").unwrap(), ConfigValue::Str("true".into()));
        assert_eq!(entry("slice_order", "none").unwrap(), ConfigValue::Str("none".into()));
    }

    #[test]
    fn test_slice_order_explicit_list() {
        assert_eq!(
            entry("slice_order", "[1, 3, 5, 2, 4]").unwrap(),
            ConfigValue::Ints(vec![1, 3, 5, 2, 4])
        );
        assert_eq!(
            list("slice_order", &["2", "1"]).unwrap(),
            ConfigValue::Ints(vec![2, 1])
        );
        assert!(matches!(
            entry("slice_order", "1, 2.5"),
            Err(JobError::ConfigValue { .. })
        ));
    }

    #[test]
    fn test_numeric_scalars() {
        assert_eq!(entry("TR", "2*1.5").unwrap(), ConfigValue::Float(3.0));
        assert_eq!(entry("TR", "2").unwrap(), ConfigValue::Int(2));
        assert_eq!(entry("nslices", "36").unwrap(), ConfigValue::Int(36));
        assert_eq!(entry("n_jobs", "4/2").unwrap(), ConfigValue::Int(2));
        assert_eq!(list("nsubjects", &["3"]).unwrap(), ConfigValue::Int(3));
    }

    #[test]
    fn test_numeric_scalar_errors_name_key_and_value() {
        let err = entry("TR", "two").unwrap_err();
        match err {
            JobError::ConfigValue { key, value, .. } => {
                assert_eq!(key, "TR");
                assert_eq!(value, "two");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(entry("nslices", "35.5").is_err());
        assert!(entry("nsubjects", "-1").is_err());
        assert!(entry("TR", "yes").is_err());
        assert!(list("TR", &["1", "2"]).is_err());
    }

    #[test]
    fn test_numeric_lists() {
        assert_eq!(
            entry("func_voxel_sizes", "3,3,3").unwrap(),
            ConfigValue::Floats(vec![3.0, 3.0, 3.0])
        );
        assert_eq!(
            list("anat_voxel_sizes", &["[1", "1", "1]"]).unwrap(),
            ConfigValue::Floats(vec![1.0, 1.0, 1.0])
        );
        assert_eq!(entry("fwhm", "8").unwrap(), ConfigValue::Float(8.0));
        assert_eq!(list("fwhm", &["[5]"]).unwrap(), ConfigValue::Float(5.0));
        assert_eq!(entry("fwhm", "").unwrap(), ConfigValue::Null);
        assert!(entry("fwhm", "5,x").is_err());
    }

    #[test]
    fn test_pass_through() {
        assert_eq!(
            entry("dataset_dir", "~/data").unwrap(),
            ConfigValue::Str("~/data".into())
        );
        assert_eq!(
            list("exclude_these_subject_ids", &["sub002", "sub004"]).unwrap(),
            ConfigValue::StrList(vec!["sub002".into(), "sub004".into()])
        );
    }

    #[test]
    fn test_aliases_fold_and_conflict() {
        let sanitizer = Sanitizer::new(Path::new("job.ini"));
        let mut raw = Section::new();
        raw.insert("repetition_time", RawValue::Scalar("2.5".into()));
        let out = sanitizer.sanitize_section(raw).unwrap();
        assert_eq!(out.get("TR"), Some(&ConfigValue::Float(2.5)));

        let mut raw = Section::new();
        raw.insert("TR", RawValue::Scalar("2".into()));
        raw.insert("repetition_time", RawValue::Scalar("2.5".into()));
        assert!(sanitizer.sanitize_section(raw).is_err());
    }

    #[test]
    fn test_prune_nulls_recursively() {
        let mut inner = Section::new();
        inner.insert("TA", ConfigValue::Null);
        inner.insert("TR", ConfigValue::Float(2.0));
        let mut root = Section::new();
        root.insert("anat", ConfigValue::Null);
        root.insert("slice_timing", ConfigValue::Section(inner));

        prune_nulls(&mut root);
        assert!(!root.contains_key("anat"));
        match root.get("slice_timing") {
            Some(ConfigValue::Section(s)) => {
                assert_eq!(s.len(), 1);
                assert!(s.contains_key("TR"));
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn prop_boolean_words_any_case(word in "[Tt][Rr][Uu][Ee]|[Yy][Ee][Ss]|[Ff][Aa][Ll][Ss][Ee]|[Nn][Oo]") {
            let expected = matches!(word.to_lowercase().as_str(), "true" | "yes");
            prop_assert_eq!(entry("dartel", &word).unwrap(), ConfigValue::Bool(expected));
        }

        #[test]
        fn prop_voxel_sizes_display_roundtrip(sizes in proptest::collection::vec(1u32..10, 1..4)) {
            let token = sizes.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            let value = entry("func_voxel_sizes", &token).unwrap();
            prop_assert_eq!(value.to_string(), token.clone());
            prop_assert_eq!(entry("func_voxel_sizes", &value.to_string()).unwrap(), value);
        }
    }
}
