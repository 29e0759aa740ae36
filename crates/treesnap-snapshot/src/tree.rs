//! File tree enumeration.
//!
//! Walks a directory and lists its regular files as `/`-separated paths
//! relative to the root, sorted lexicographically. Symlinks are not
//! followed and, like other special files, are skipped. Errors on
//! individual entries are collected rather than aborting the walk.
//!
//! Names that are not valid UTF-8 are displayed lossily, so every entry
//! also keeps its real relative path for reading the file back.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use treesnap_util::path::relative_slash_path;
use walkdir::WalkDir;

/// A problem encountered on one entry during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkIssue {
    /// Entry that could not be read, if known.
    pub path: Option<PathBuf>,
    /// Description of the failure.
    pub message: String,
}

/// A regular file found under a tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    /// `/`-separated relative name, lossy for non-UTF-8 components.
    pub name: String,
    /// Exact path relative to the root.
    pub path: PathBuf,
}

/// Result of enumerating a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileListing {
    /// Files ordered by name.
    pub files: Vec<TreeFile>,
    /// Entries that were skipped because they could not be read.
    pub errors: Vec<WalkIssue>,
}

impl FileListing {
    /// Whether every entry was read successfully.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Relative names in listing order.
    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|f| f.name.clone()).collect()
    }
}

/// List every regular file under `root`.
pub fn list_files(root: &Path) -> FileListing {
    let mut listing = FileListing::default();

    if !root.is_dir() {
        warn!(root = %root.display(), "Tree root is not a directory");
        listing.errors.push(WalkIssue {
            path: Some(root.to_path_buf()),
            message: "not a directory".to_string(),
        });
        return listing;
    }

    for entry in WalkDir::new(root).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "Skipping unreadable entry");
                listing.errors.push(WalkIssue {
                    path: e.path().map(Path::to_path_buf),
                    message: e.to_string(),
                });
                continue;
            }
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            debug!(path = %entry.path().display(), "Skipping non-regular file");
            continue;
        }

        let (Some(name), Ok(path)) = (
            relative_slash_path(entry.path(), root),
            entry.path().strip_prefix(root),
        ) else {
            continue;
        };
        if entry.path().to_str().is_none() {
            debug!(path = ?entry.path(), "File name is not valid UTF-8");
        }
        listing.files.push(TreeFile {
            name,
            path: path.to_path_buf(),
        });
    }

    listing
        .files
        .sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
    debug!(
        root = %root.display(),
        files = listing.files.len(),
        issues = listing.errors.len(),
        "Enumerated tree"
    );
    listing
}
