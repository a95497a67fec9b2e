//! Shell-style wildcard matching over the filesystem
//!
//! `*`, `?`, `[abc]`, `[a-z]` and `[!abc]` are matched per path component,
//! never across `/`. Entries whose name starts with `.` only match a
//! component that itself starts with `.`. Results are sorted.

use crate::paths;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Which filesystem entries may satisfy the final component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Any,
    Dir,
    File,
}

impl EntryKind {
    fn accepts(self, path: &Path) -> bool {
        match self {
            EntryKind::Any => path.exists(),
            EntryKind::Dir => path.is_dir(),
            EntryKind::File => path.is_file(),
        }
    }
}

/// Whether `component` contains wildcard syntax
pub fn has_magic(component: &str) -> bool {
    component.contains(&['*', '?', '['][..])
}

/// Translate one wildcard component into an anchored regex
pub fn component_regex(component: &str) -> Result<Regex, regex::Error> {
    let chars: Vec<char> = component.chars().collect();
    let mut re = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            '[' => {
                // A ']' right after '[' or '[!' is a literal member
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '!' || chars[j] == '^') {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }
                if j >= chars.len() {
                    re.push_str(r"\[");
                } else {
                    let mut class = String::from("[");
                    let mut k = i + 1;
                    if chars[k] == '!' || chars[k] == '^' {
                        class.push('^');
                        k += 1;
                    }
                    for &c in &chars[k..j] {
                        if c == '-' {
                            class.push('-');
                        } else {
                            class.push_str(&regex::escape(&c.to_string()));
                        }
                    }
                    class.push(']');
                    re.push_str(&class);
                    i = j;
                }
            }
            c => re.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    re.push('$');
    Regex::new(&re)
}

/// Entries of `dir` whose names match `component`, sorted by name
fn matching_children(dir: &Path, component: &str) -> Result<Vec<PathBuf>, regex::Error> {
    let re = component_regex(component)?;
    let allow_hidden = component.starts_with('.');
    let mut matches = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("skipping unreadable entry under {}: {}", dir.display(), e);
                continue;
            }
        };
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') && !allow_hidden {
            continue;
        }
        if re.is_match(&name) {
            matches.push(entry.path().to_path_buf());
        }
    }

    Ok(matches)
}

/// Expand `pattern` (absolute, or relative to `base`) into matching paths
pub fn expand(base: &Path, pattern: &str, kind: EntryKind) -> Result<Vec<PathBuf>, regex::Error> {
    let pattern_path = Path::new(pattern);
    let mut root = if pattern_path.is_absolute() {
        PathBuf::new()
    } else {
        base.to_path_buf()
    };
    let mut components = Vec::new();

    for component in pattern_path.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => root.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => components.push("..".to_string()),
            Component::Normal(name) => components.push(name.to_string_lossy().into_owned()),
        }
    }

    let mut current = vec![root];
    for component in &components {
        let mut next = Vec::new();
        for dir in &current {
            if has_magic(component) {
                if dir.is_dir() {
                    next.extend(matching_children(dir, component)?);
                }
            } else {
                let candidate = dir.join(component);
                if candidate.exists() {
                    next.push(candidate);
                }
            }
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }

    let mut results: Vec<PathBuf> = current
        .into_iter()
        .filter(|p| kind.accepts(p))
        .map(|p| paths::normalize(&p))
        .collect();
    results.sort();
    results.dedup();
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_component_regex() {
        let re = component_regex("sub*").unwrap();
        assert!(re.is_match("sub001"));
        assert!(!re.is_match("xsub001"));

        let re = component_regex("run?.nii").unwrap();
        assert!(re.is_match("run1.nii"));
        assert!(!re.is_match("run10.nii"));
        assert!(!re.is_match("run1Xnii"));

        let re = component_regex("s[0-2][!a]").unwrap();
        assert!(re.is_match("s1b"));
        assert!(!re.is_match("s3b"));
        assert!(!re.is_match("s1a"));

        let re = component_regex("odd[name").unwrap();
        assert!(re.is_match("odd[name"));
    }

    #[test]
    fn test_expand_sorted_and_filtered_by_kind() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "sub002/func/bold.nii");
        touch(tmp.path(), "sub001/func/bold.nii");
        touch(tmp.path(), "notes.txt");
        fs::create_dir_all(tmp.path().join(".hidden")).unwrap();

        let dirs = expand(tmp.path(), "*", EntryKind::Dir).unwrap();
        assert_eq!(
            dirs,
            vec![tmp.path().join("sub001"), tmp.path().join("sub002")]
        );

        let any = expand(tmp.path(), "*", EntryKind::Any).unwrap();
        assert_eq!(any.len(), 3);

        let files = expand(tmp.path(), "sub*/func/*.nii", EntryKind::File).unwrap();
        assert_eq!(
            files,
            vec![
                tmp.path().join("sub001/func/bold.nii"),
                tmp.path().join("sub002/func/bold.nii")
            ]
        );
    }

    #[test]
    fn test_expand_literal_and_missing() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "anat/t1.nii");
        assert_eq!(
            expand(tmp.path(), "anat/t1.nii", EntryKind::File).unwrap(),
            vec![tmp.path().join("anat/t1.nii")]
        );
        assert!(expand(tmp.path(), "anat/t2.nii", EntryKind::File).unwrap().is_empty());
        assert!(expand(tmp.path(), "anat", EntryKind::File).unwrap().is_empty());
    }

    #[test]
    fn test_expand_parent_components_normalized() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "shared/b.nii");
        touch(tmp.path(), "shared/a.nii");
        fs::create_dir_all(tmp.path().join("sub001")).unwrap();

        let found = expand(&tmp.path().join("sub001"), "../shared/*.nii", EntryKind::File).unwrap();
        assert_eq!(
            found,
            vec![tmp.path().join("shared/a.nii"), tmp.path().join("shared/b.nii")]
        );
        let literal = expand(&tmp.path().join("sub001"), "./../shared/a.nii", EntryKind::File).unwrap();
        assert_eq!(literal, vec![tmp.path().join("shared/a.nii")]);
    }

    #[test]
    fn test_expand_absolute_pattern_ignores_base() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a/x.nii");
        let pattern = format!("{}/a/*.nii", tmp.path().display());
        let found = expand(Path::new("/nonexistent"), &pattern, EntryKind::File).unwrap();
        assert_eq!(found, vec![tmp.path().join("a/x.nii")]);
    }
}
