//! Path resolution
//!
//! Expands `~` and `$VAR` / `${VAR}` tokens, roots relative paths at a base
//! directory and normalizes `.`/`..` lexically. Resolution never fails
//! loudly: `None` tells the caller the configured path is unusable, and the
//! caller decides which error to raise.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Component, Path, PathBuf};

static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("valid env var regex")
});

/// Expand `~` / `~/...` to the home directory
fn expand_home(path: &str) -> Option<String> {
    if path == "~" || path.starts_with("~/") {
        let home = dirs::home_dir()?;
        return Some(format!("{}{}", home.display(), &path[1..]));
    }
    Some(path.to_string())
}

/// Substitute environment variables; `None` if any is unset
fn expand_env(path: &str) -> Option<String> {
    let mut unresolved = false;
    let expanded = ENV_VAR_RE.replace_all(path, |caps: &Captures| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                unresolved = true;
                String::new()
            }
        }
    });
    if unresolved {
        None
    } else {
        Some(expanded.into_owned())
    }
}

/// Lexically collapse `.` and `..` (no filesystem access, symlinks kept)
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Expand home/env tokens only, without rooting (tool locations on `$PATH`)
pub fn expand(path: &str) -> Option<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    let expanded = expand_env(&expand_home(path)?)?;
    Some(PathBuf::from(expanded))
}

/// Resolve `path` to an absolute path, rooting relative results at `relative_to`
pub fn resolve(path: &str, relative_to: Option<&Path>) -> Option<PathBuf> {
    let expanded = expand(path)?;
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        relative_to?.join(expanded)
    };
    if !joined.is_absolute() {
        return None;
    }
    Some(normalize(&joined))
}
