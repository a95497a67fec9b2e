//! Sanitized option tree and typed lookups

use super::keys;
use super::raw::Section;
use super::value::ConfigValue;
use crate::errors::{JobError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Immutable, null-free option tree of one job
///
/// Absent keys and explicit nulls are indistinguishable here: nulls were
/// pruned before construction.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    #[serde(skip)]
    source: PathBuf,
    #[serde(flatten)]
    options: Section<ConfigValue>,
}

impl SanitizedConfig {
    pub fn new(source: PathBuf, options: Section<ConfigValue>) -> Self {
        Self { source, options }
    }

    /// Job file these options came from
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn options(&self) -> &Section<ConfigValue> {
        &self.options
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.options.get(key)
    }

    /// Lookups at option root
    pub fn root(&self) -> Scope<'_> {
        Scope {
            config: self,
            block: None,
        }
    }

    /// Lookups inside a stage block, falling back to option root
    pub fn stage<'a>(&'a self, stage: &'a str) -> Scope<'a> {
        let block = match self.options.get(stage) {
            Some(ConfigValue::Section(section)) => Some((stage, section)),
            _ => None,
        };
        Scope {
            config: self,
            block,
        }
    }

    /// `(label, pattern)` for every `session_<label>_func` key, in file order
    pub fn session_patterns(&self) -> Result<Vec<(String, String)>> {
        self.options
            .iter()
            .filter_map(|(key, value)| keys::session_label(key).map(|label| (key, label, value)))
            .map(|(key, label, value)| match value {
                ConfigValue::Str(pattern) => Ok((label.to_string(), pattern.clone())),
                other => Err(JobError::config_value(
                    &self.source,
                    key,
                    other.to_string(),
                    format!("expected a wildcard pattern, found {}", other.type_name()),
                )),
            })
            .collect()
    }
}

/// Typed view over the options, optionally scoped to a stage block
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    config: &'a SanitizedConfig,
    block: Option<(&'a str, &'a Section<ConfigValue>)>,
}

impl<'a> Scope<'a> {
    /// Stage block entry first, then option root
    pub fn get(&self, key: &str) -> Option<&'a ConfigValue> {
        self.block
            .and_then(|(_, section)| section.get(key))
            .or_else(|| self.config.options.get(key))
    }

    fn mismatch(&self, key: &str, value: &ConfigValue, expected: &str) -> JobError {
        JobError::config_value(
            &self.config.source,
            key,
            value.to_string(),
            format!("expected {}, found {}", expected, value.type_name()),
        )
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.mismatch(key, other, "a boolean")),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        Ok(self.bool(key)?.unwrap_or(default))
    }

    pub fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Int(i)) => Ok(Some(*i as f64)),
            Some(ConfigValue::Float(f)) => Ok(Some(*f)),
            Some(other) => Err(self.mismatch(key, other, "a number")),
        }
    }

    pub fn i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(self.mismatch(key, other, "an integer")),
        }
    }

    pub fn str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(ConfigValue::Str(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.mismatch(key, other, "a string")),
        }
    }

    /// Number sequence; a collapsed scalar comes back as one element
    pub fn f64_list(&self, key: &str) -> Result<Option<Vec<f64>>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_f64_list()
                .map(Some)
                .ok_or_else(|| self.mismatch(key, value, "a list of numbers")),
        }
    }

    /// Strings given either as a list or as one comma-separated token
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(ConfigValue::StrList(items)) => Ok(items.clone()),
            Some(ConfigValue::Str(s)) => Ok(s
                .split(',')
                .map(|item| item.trim().trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'')))
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()),
            Some(other) => Err(self.mismatch(key, other, "a list of strings")),
        }
    }

    /// `disable` / `disable_<stage>` in the block, else `disable_<stage>` at root
    pub fn disabled(&self, stage: &str) -> Result<bool> {
        let disable_key = keys::disable_key(stage);
        if let Some((_, section)) = self.block {
            for key in [keys::DISABLE, disable_key.as_str()] {
                match section.get(key) {
                    Some(ConfigValue::Bool(b)) => return Ok(*b),
                    Some(other) => return Err(self.mismatch(key, other, "a boolean")),
                    None => {}
                }
            }
        }
        Ok(self.config.root().bool(&disable_key)?.unwrap_or(false))
    }

    /// Name of the stage block backing this scope, if present in the job
    pub fn block_name(&self) -> Option<&'a str> {
        self.block.map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entries: Vec<(&str, ConfigValue)>) -> SanitizedConfig {
        SanitizedConfig::new(
            PathBuf::from("job.ini"),
            entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        )
    }

    #[test]
    fn test_stage_block_takes_precedence() {
        let mut block = Section::new();
        block.insert("reslice_realign", ConfigValue::Bool(true));
        let cfg = config(vec![
            ("reslice_realign", ConfigValue::Bool(false)),
            ("register_to_mean", ConfigValue::Bool(false)),
            ("realign", ConfigValue::Section(block)),
        ]);

        let scope = cfg.stage("realign");
        assert_eq!(scope.bool("reslice_realign").unwrap(), Some(true));
        assert_eq!(scope.bool("register_to_mean").unwrap(), Some(false));
        assert_eq!(cfg.root().bool("reslice_realign").unwrap(), Some(false));
        assert_eq!(scope.block_name(), Some("realign"));
    }

    #[test]
    fn test_disabled_lookup() {
        let mut block = Section::new();
        block.insert("disable", ConfigValue::Bool(true));
        let cfg = config(vec![
            ("disable_normalize", ConfigValue::Bool(true)),
            ("segment", ConfigValue::Section(block)),
        ]);
        assert!(cfg.stage("normalize").disabled("normalize").unwrap());
        assert!(cfg.stage("segment").disabled("segment").unwrap());
        assert!(!cfg.stage("realign").disabled("realign").unwrap());
    }

    #[test]
    fn test_type_mismatch_is_config_value_error() {
        let cfg = config(vec![("caching", ConfigValue::Str("maybe".into()))]);
        let err = cfg.root().bool("caching").unwrap_err();
        match err {
            JobError::ConfigValue { key, value, reason, .. } => {
                assert_eq!(key, "caching");
                assert_eq!(value, "maybe");
                assert!(reason.contains("expected a boolean"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_string_list_forms() {
        let cfg = config(vec![
            ("a", ConfigValue::Str("[\"sub002\"]".into())),
            ("b", ConfigValue::Str("sub001, sub003".into())),
            ("c", ConfigValue::StrList(vec!["x".into()])),
            ("d", ConfigValue::Int(3)),
        ]);
        let root = cfg.root();
        assert_eq!(root.string_list("a").unwrap(), vec!["sub002"]);
        assert_eq!(root.string_list("b").unwrap(), vec!["sub001", "sub003"]);
        assert_eq!(root.string_list("c").unwrap(), vec!["x"]);
        assert!(root.string_list("missing").unwrap().is_empty());
        assert_eq!(root.string_list("d").unwrap_err().kind(), "ConfigValueError");
    }

    #[test]
    fn test_session_patterns_in_file_order() {
        let cfg = config(vec![
            ("session_2_func", ConfigValue::Str("s2/*.nii".into())),
            ("anat", ConfigValue::Str("anat.nii".into())),
            ("session_1_func", ConfigValue::Str("s1/*.nii".into())),
        ]);
        let sessions = cfg.session_patterns().unwrap();
        assert_eq!(
            sessions,
            vec![
                ("2".to_string(), "s2/*.nii".to_string()),
                ("1".to_string(), "s1/*.nii".to_string())
            ]
        );
    }

    #[test]
    fn test_numbers_widen() {
        let cfg = config(vec![("TR", ConfigValue::Int(2)), ("fwhm", ConfigValue::Float(6.0))]);
        assert_eq!(cfg.root().f64("TR").unwrap(), Some(2.0));
        assert_eq!(cfg.root().f64_list("fwhm").unwrap(), Some(vec![6.0]));
        assert!(cfg.root().i64("fwhm").is_err());
    }
}
