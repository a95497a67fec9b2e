//! Raw job description
//!
//! Reads a job file into an untyped tree of string leaves. Two syntaxes are
//! accepted: ConfigObj-style INI (the historical format) and YAML. Both
//! produce the same [`RawValue`] tree, so nothing downstream knows which
//! reader ran.

use crate::errors::{JobError, Result};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::path::{Path, PathBuf};

/// Name of the wrapping section used by historical job files
pub const OPTIONS_SECTION: &str = "config";

/// Insertion-ordered string-keyed map
///
/// Key order carries meaning: sessions are taken in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<T> {
    entries: Vec<(String, T)>,
}

impl<T> Section<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace; a replaced entry keeps its original position
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<T> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut T) -> bool,
    {
        self.entries.retain_mut(|(k, v)| f(k, v));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntoIterator for Section<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<T> FromIterator<(String, T)> for Section<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut section = Section::new();
        for (k, v) in iter {
            section.insert(k, v);
        }
        section
    }
}

impl<T: Serialize> Serialize for Section<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Untyped leaf or nested section, exactly as written in the job file
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Explicit null (YAML `~`)
    Null,
    Scalar(String),
    List(Vec<String>),
    Section(Section<RawValue>),
}

/// Job file syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFormat {
    /// ConfigObj-style `key = value` with `[section]` headers
    Ini,
    Yaml,
}

impl JobFormat {
    /// Pick the reader from the file extension (INI unless `.yaml`/`.yml`)
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => JobFormat::Yaml,
            _ => JobFormat::Ini,
        }
    }
}

/// Raw job description; discarded once sanitized
#[derive(Debug, Clone)]
pub struct RawConfig {
    /// Absolute path of the job file
    pub path: PathBuf,
    pub root: Section<RawValue>,
}

impl RawConfig {
    /// Read a job file from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(JobError::JobFileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| JobError::io(path, e))?;
        match JobFormat::from_path(path) {
            JobFormat::Ini => Self::parse_ini(path, &content),
            JobFormat::Yaml => Self::parse_yaml(path, &content),
        }
    }

    /// Parse ConfigObj-style INI text
    pub fn parse_ini(path: &Path, content: &str) -> Result<Self> {
        let parse_err = |line: usize, message: String| JobError::Parse {
            path: path.to_path_buf(),
            line,
            message,
        };

        let mut root = Section::new();
        let mut current: Vec<String> = Vec::new();

        for (idx, raw_line) in content.lines().enumerate() {
            let lineno = idx + 1;
            let trimmed = raw_line.trim_start();
            if trimmed.starts_with(';') {
                continue;
            }
            let line = strip_inline_comment(trimmed).trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                let depth = line.chars().take_while(|c| *c == '[').count();
                let closing = line.chars().rev().take_while(|c| *c == ']').count();
                if depth != closing || line.len() < depth * 2 {
                    return Err(parse_err(lineno, "unbalanced section brackets".to_string()));
                }
                let name = line[depth..line.len() - depth].trim();
                if name.is_empty() {
                    return Err(parse_err(lineno, "empty section name".to_string()));
                }
                if depth > current.len() + 1 {
                    return Err(parse_err(
                        lineno,
                        format!("section '{}' is nested deeper than its parent", name),
                    ));
                }
                current.truncate(depth - 1);
                let parent = section_at(&mut root, &current)
                    .ok_or_else(|| parse_err(lineno, "invalid section nesting".to_string()))?;
                if parent.contains_key(name) {
                    return Err(parse_err(lineno, format!("duplicate section '{}'", name)));
                }
                parent.insert(name, RawValue::Section(Section::new()));
                current.push(name.to_string());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(parse_err(
                    lineno,
                    format!("expected 'key = value', got '{}'", line),
                ));
            };
            let key = unquote(key.trim());
            if key.is_empty() {
                return Err(parse_err(lineno, "empty key".to_string()));
            }
            let value = parse_ini_value(value.trim()).map_err(|m| parse_err(lineno, m))?;
            let section = section_at(&mut root, &current)
                .ok_or_else(|| parse_err(lineno, "invalid section nesting".to_string()))?;
            if section.contains_key(key) {
                return Err(parse_err(lineno, format!("duplicate key '{}'", key)));
            }
            section.insert(key, value);
        }

        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Parse YAML text; scalars are kept as their textual form
    pub fn parse_yaml(path: &Path, content: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|source| JobError::Yaml {
                path: path.to_path_buf(),
                source,
            })?;
        let root = match value {
            serde_yaml::Value::Null => Section::new(),
            serde_yaml::Value::Mapping(m) => yaml_mapping(path, "", m)?,
            _ => {
                return Err(JobError::config(
                    path,
                    "<root>",
                    "must be a mapping of option keys",
                ))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            root,
        })
    }

    /// Option tree: the `[config]` section when present, else the whole root
    pub fn into_options(mut self) -> Section<RawValue> {
        match self.root.remove(OPTIONS_SECTION) {
            Some(RawValue::Section(options)) => options,
            Some(other) => {
                self.root.insert(OPTIONS_SECTION, other);
                self.root
            }
            None => self.root,
        }
    }
}

fn section_at<'a>(
    root: &'a mut Section<RawValue>,
    path: &[String],
) -> Option<&'a mut Section<RawValue>> {
    let mut section = root;
    for name in path {
        section = match section.get_mut(name)? {
            RawValue::Section(s) => s,
            _ => return None,
        };
    }
    Some(section)
}

/// Quote state of an INI value scan
///
/// A quote only opens at the start of a value or list item; elsewhere it is
/// a literal character (`John's study`).
#[derive(Default)]
struct QuoteScanner {
    quote: Option<char>,
    in_item: bool,
}

impl QuoteScanner {
    /// Feed one character; true when it is outside quotes
    fn feed(&mut self, c: char, separators: &[char]) -> bool {
        if let Some(q) = self.quote {
            if c == q {
                self.quote = None;
            }
            return false;
        }
        match c {
            '"' | '\'' if !self.in_item => {
                self.quote = Some(c);
                self.in_item = true;
                false
            }
            c if separators.contains(&c) => {
                self.in_item = false;
                true
            }
            c if c.is_whitespace() => true,
            _ => {
                self.in_item = true;
                true
            }
        }
    }
}

fn strip_inline_comment(line: &str) -> &str {
    let mut scanner = QuoteScanner::default();
    for (i, c) in line.char_indices() {
        if scanner.feed(c, &['=', ',', '[']) && c == '#' {
            return &line[..i];
        }
    }
    line
}

fn unquote(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' || first == b'\'') && first == last {
            return &s[1..s.len() - 1];
        }
    }
    s
}

/// Split on commas that are not inside quotes
fn split_commas(s: &str) -> std::result::Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut scanner = QuoteScanner::default();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if scanner.feed(c, &[',']) && c == ',' {
            parts.push(s[start..i].trim());
            start = i + 1;
        }
    }
    if scanner.quote.is_some() {
        return Err(format!("unterminated quote in '{}'", s));
    }
    parts.push(s[start..].trim());
    Ok(parts)
}

fn parse_ini_value(value: &str) -> std::result::Result<RawValue, String> {
    if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
        let items = split_commas(&value[1..value.len() - 1])?
            .into_iter()
            .filter(|item| !item.is_empty())
            .map(|item| unquote(item).to_string())
            .collect();
        return Ok(RawValue::List(items));
    }

    let mut parts = split_commas(value)?;
    if parts.len() == 1 {
        return Ok(RawValue::Scalar(unquote(parts[0]).to_string()));
    }
    // "a," is a one-element list
    if parts.last().is_some_and(|p| p.is_empty()) {
        parts.pop();
    }
    Ok(RawValue::List(
        parts.into_iter().map(|p| unquote(p).to_string()).collect(),
    ))
}

fn yaml_key(path: &Path, parent: &str, key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        other => Err(JobError::config_value(
            path,
            parent,
            format!("{:?}", other),
            "mapping keys must be scalars",
        )),
    }
}

fn yaml_scalar(path: &Path, key: &str, value: serde_yaml::Value) -> Result<Option<String>> {
    match value {
        serde_yaml::Value::Null => Ok(None),
        serde_yaml::Value::Bool(b) => Ok(Some(b.to_string())),
        serde_yaml::Value::Number(n) => Ok(Some(n.to_string())),
        serde_yaml::Value::String(s) => Ok(Some(s)),
        serde_yaml::Value::Tagged(t) => yaml_scalar(path, key, t.value),
        other => Err(JobError::config_value(
            path,
            key,
            format!("{:?}", other),
            "list items must be scalars",
        )),
    }
}

fn yaml_mapping(path: &Path, parent: &str, mapping: serde_yaml::Mapping) -> Result<Section<RawValue>> {
    let mut section = Section::new();
    for (key, value) in mapping {
        let key = yaml_key(path, parent, key)?;
        let raw = yaml_value(path, &key, value)?;
        section.insert(key, raw);
    }
    Ok(section)
}

fn yaml_value(path: &Path, key: &str, value: serde_yaml::Value) -> Result<RawValue> {
    Ok(match value {
        serde_yaml::Value::Null => RawValue::Null,
        serde_yaml::Value::Sequence(items) => RawValue::List(
            items
                .into_iter()
                .map(|item| -> Result<String> {
                    Ok(yaml_scalar(path, key, item)?.unwrap_or_else(|| "none".into()))
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(m) => RawValue::Section(yaml_mapping(path, key, m)?),
        serde_yaml::Value::Tagged(t) => yaml_value(path, key, t.value)?,
        scalar => match yaml_scalar(path, key, scalar)? {
            Some(s) => RawValue::Scalar(s),
            None => RawValue::Null,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ini(content: &str) -> Result<RawConfig> {
        RawConfig::parse_ini(Path::new("/jobs/job.ini"), content)
    }

    #[test]
    fn test_ini_scalars_lists_and_sections() {
        let raw = ini(r#"
# dataset
[config]
dataset_dir = /data/study   # trailing comment
fwhm = 5, 5, 5
func_voxel_sizes = [3, 3, 3]
exclude_these_subject_ids = sub002,
dataset_description = "a, quoted # value"
"#)
        .unwrap();

        let options = raw.into_options();
        assert_eq!(
            options.get("dataset_dir"),
            Some(&RawValue::Scalar("/data/study".into()))
        );
        assert_eq!(
            options.get("fwhm"),
            Some(&RawValue::List(vec!["5".into(), "5".into(), "5".into()]))
        );
        assert_eq!(
            options.get("func_voxel_sizes"),
            Some(&RawValue::List(vec!["3".into(), "3".into(), "3".into()]))
        );
        assert_eq!(
            options.get("exclude_these_subject_ids"),
            Some(&RawValue::List(vec!["sub002".into()]))
        );
        assert_eq!(
            options.get("dataset_description"),
            Some(&RawValue::Scalar("a, quoted # value".into()))
        );
    }

    #[test]
    fn test_ini_quote_inside_unquoted_value_is_literal() {
        let raw = ini(
            "dataset_description = John's resting-state study # note\n\
             exclude_these_subject_ids = o'brien, 'sub 2'\n",
        )
        .unwrap();
        assert_eq!(
            raw.root.get("dataset_description"),
            Some(&RawValue::Scalar("John's resting-state study".into()))
        );
        assert_eq!(
            raw.root.get("exclude_these_subject_ids"),
            Some(&RawValue::List(vec!["o'brien".into(), "sub 2".into()]))
        );
        assert!(matches!(
            ini("anat = 'unterminated\n"),
            Err(JobError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_ini_nested_sections() {
        let raw = ini("[config]\nTR = 2\n[[realign]]\nreslice_realign = yes\n").unwrap();
        let options = raw.into_options();
        match options.get("realign") {
            Some(RawValue::Section(s)) => {
                assert_eq!(s.get("reslice_realign"), Some(&RawValue::Scalar("yes".into())))
            }
            other => panic!("expected section, got {other:?}"),
        }
    }

    #[test]
    fn test_ini_preserves_key_order() {
        let raw = ini("session_b_func = b/*.nii\nsession_a_func = a/*.nii\n").unwrap();
        let keys: Vec<_> = raw.root.keys().collect();
        assert_eq!(keys, vec!["session_b_func", "session_a_func"]);
    }

    #[test]
    fn test_ini_duplicate_key_is_parse_error() {
        let err = ini("TR = 2\nTR = 3\n").unwrap_err();
        match err {
            JobError::Parse { line, message, .. } => {
                assert_eq!(line, 2);
                assert!(message.contains("duplicate key 'TR'"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_ini_malformed_line() {
        assert!(matches!(ini("just text\n"), Err(JobError::Parse { line: 1, .. })));
        assert!(matches!(ini("[config\n"), Err(JobError::Parse { .. })));
        assert!(matches!(ini("[[too_deep]]\n"), Err(JobError::Parse { .. })));
    }

    #[test]
    fn test_yaml_scalars_become_text() {
        let raw = RawConfig::parse_yaml(
            Path::new("job.yaml"),
            "config:\n  TR: 2.5\n  caching: true\n  fwhm: [6, 6, 6]\n  anat: ~\n",
        )
        .unwrap();
        let options = raw.into_options();
        assert_eq!(options.get("TR"), Some(&RawValue::Scalar("2.5".into())));
        assert_eq!(options.get("caching"), Some(&RawValue::Scalar("true".into())));
        assert_eq!(
            options.get("fwhm"),
            Some(&RawValue::List(vec!["6".into(), "6".into(), "6".into()]))
        );
        assert_eq!(options.get("anat"), Some(&RawValue::Null));
    }

    #[test]
    fn test_yaml_root_must_be_mapping() {
        let err = RawConfig::parse_yaml(Path::new("job.yaml"), "- a\n- b\n").unwrap_err();
        assert!(matches!(err, JobError::Config { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(JobFormat::from_path(Path::new("a.yml")), JobFormat::Yaml);
        assert_eq!(JobFormat::from_path(Path::new("a.YAML")), JobFormat::Yaml);
        assert_eq!(JobFormat::from_path(Path::new("a.conf")), JobFormat::Ini);
        assert_eq!(JobFormat::from_path(Path::new("job")), JobFormat::Ini);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RawConfig::load(Path::new("/definitely/not/here.ini")).unwrap_err();
        assert!(matches!(err, JobError::JobFileNotFound { .. }));
    }
}
