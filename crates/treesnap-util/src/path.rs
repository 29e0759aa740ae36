//! Path utilities.
//!
//! This module provides utilities for working with file paths.

use std::path::{Component, Path, PathBuf};

/// Get the treesnap data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/treesnap` if set
/// - `~/.local/share/treesnap` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("treesnap"))
}

/// Check if a path is within a base directory.
///
/// Both paths are canonicalized when they exist; otherwise their
/// normalized forms are compared.
pub fn is_within(path: &Path, base: &Path) -> bool {
    let canonical_path = path.canonicalize().ok();
    let canonical_base = base.canonicalize().ok();

    match (canonical_path, canonical_base) {
        (Some(p), Some(b)) => p.starts_with(&b),
        _ => normalize(path).starts_with(normalize(base)),
    }
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Make a path relative to `base`, joined with forward slashes.
///
/// Returns `None` if the path is not within `base` or is `base` itself.
/// Non-UTF-8 components are converted lossily.
pub fn relative_slash_path(path: &Path, base: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;

    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        normalize(&base.join(path))
    }
}
