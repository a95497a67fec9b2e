//! Typed option values

use super::raw::Section;
use serde::Serialize;
use std::fmt;

/// A sanitized option value
///
/// The `Display` form is a job-file token that sanitizes back to the same
/// value for the same key (`8` for a collapsed `fwhm`, `3,3,3` for voxel sizes).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Integer sequence (`slice_order`)
    Ints(Vec<i64>),
    /// Float sequence (voxel sizes, fwhm)
    Floats(Vec<f64>),
    /// Free text; lower-cased only for `slice_order` tokens
    Str(String),
    /// Pass-through list of strings (subject id filters)
    StrList(Vec<String>),
    Section(Section<ConfigValue>),
}

impl ConfigValue {
    /// Short name used in type-mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Int(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Ints(_) => "integer list",
            ConfigValue::Floats(_) => "float list",
            ConfigValue::Str(_) => "string",
            ConfigValue::StrList(_) => "string list",
            ConfigValue::Section(_) => "section",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    /// Numeric view as a flat sequence (scalars become one element)
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            ConfigValue::Int(i) => Some(vec![*i as f64]),
            ConfigValue::Float(f) => Some(vec![*f]),
            ConfigValue::Ints(v) => Some(v.iter().map(|i| *i as f64).collect()),
            ConfigValue::Floats(v) => Some(v.clone()),
            _ => None,
        }
    }
}

fn join<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Null => write!(f, "none"),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(i) => write!(f, "{}", i),
            ConfigValue::Float(x) => write!(f, "{}", x),
            ConfigValue::Ints(v) => write!(f, "{}", join(v, ",")),
            ConfigValue::Floats(v) => write!(f, "{}", join(v, ",")),
            ConfigValue::Str(s) => write!(f, "{}", s),
            ConfigValue::StrList(v) => write!(f, "{}", join(v, ", ")),
            ConfigValue::Section(s) => {
                let body = s
                    .iter()
                    .map(|(k, v)| format!("{} = {}", k, v))
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "{{{}}}", body)
            }
        }
    }
}
