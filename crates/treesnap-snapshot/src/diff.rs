//! Line-based unified diffs between two file trees.
//!
//! The left tree (a snapshot's stored copy) decides which files are
//! compared. A file missing on the right is shown as fully deleted. Files
//! that exist only on the right are ignored unless
//! [`DiffMode::Bidirectional`] is selected, in which case they are shown as
//! fully added after the left-side files.
//!
//! Output is a flat list of [`DiffLine`]s. Text is never escaped; renderers
//! decide how to present it.

use crate::tree::{list_files, TreeFile};
use serde::{Deserialize, Serialize};
use similar::{ChangeTag, DiffOp, TextDiff};
use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

/// Default number of unchanged lines shown around each change.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

/// Label prefix for the snapshot side of a file header.
pub const SNAPSHOT_LABEL: &str = "snapshot";

/// Label prefix for the working-tree side of a file header.
pub const CURRENT_LABEL: &str = "current";

/// Which files take part in a tree comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffMode {
    /// Only files present in the snapshot are compared.
    #[default]
    SnapshotOnly,
    /// Files present only in the working tree are reported as additions too.
    Bidirectional,
}

/// Options for a tree comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffOptions {
    /// Unchanged lines shown around each change.
    pub context_lines: usize,
    /// Which files are compared.
    pub mode: DiffMode,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
            mode: DiffMode::default(),
        }
    }
}

/// One line of diff output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiffLine {
    /// Start of a file's diff.
    FileHeader { old: String, new: String },
    /// Start of a hunk. Starts are 1-based; an empty range points at the
    /// line before it.
    HunkHeader {
        old_start: usize,
        old_len: usize,
        new_start: usize,
        new_len: usize,
    },
    /// Unchanged line.
    Context { text: String },
    /// Line only in the new version.
    Addition { text: String },
    /// Line only in the old version.
    Deletion { text: String },
    /// The file differs but is not valid UTF-8 text.
    BinaryFile { path: String },
    /// The file could not be read.
    Unreadable { path: String, message: String },
}

impl DiffLine {
    /// Whether this line is an addition or deletion.
    pub fn is_change(&self) -> bool {
        matches!(self, DiffLine::Addition { .. } | DiffLine::Deletion { .. })
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffLine::FileHeader { old, new } => write!(f, "--- {}\n+++ {}", old, new),
            DiffLine::HunkHeader {
                old_start,
                old_len,
                new_start,
                new_len,
            } => write!(
                f,
                "@@ -{} +{} @@",
                format_range(*old_start, *old_len),
                format_range(*new_start, *new_len)
            ),
            DiffLine::Context { text } => write!(f, " {}", text),
            DiffLine::Addition { text } => write!(f, "+{}", text),
            DiffLine::Deletion { text } => write!(f, "-{}", text),
            DiffLine::BinaryFile { path } => write!(f, "Binary file {} differs", path),
            DiffLine::Unreadable { path, message } => {
                write!(f, "Could not read {}: {}", path, message)
            }
        }
    }
}

/// Format a hunk range the way unified diffs do (`5`, `5,3`, `4,0`).
fn format_range(start: usize, len: usize) -> String {
    if len == 1 {
        start.to_string()
    } else {
        format!("{},{}", start, len)
    }
}

/// Counts over a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub lines_added: usize,
    pub lines_removed: usize,
    pub binary_files: usize,
    pub unreadable_files: usize,
}

impl DiffSummary {
    /// Tally a sequence of diff lines.
    pub fn from_lines(lines: &[DiffLine]) -> Self {
        let mut summary = Self::default();
        for line in lines {
            match line {
                DiffLine::FileHeader { .. } => summary.files_changed += 1,
                DiffLine::Addition { .. } => summary.lines_added += 1,
                DiffLine::Deletion { .. } => summary.lines_removed += 1,
                DiffLine::BinaryFile { .. } => summary.binary_files += 1,
                DiffLine::Unreadable { .. } => summary.unreadable_files += 1,
                DiffLine::HunkHeader { .. } | DiffLine::Context { .. } => {}
            }
        }
        summary
    }

    /// Whether nothing differs.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s) changed, {} insertion(s)(+), {} deletion(s)(-)",
            self.files_changed, self.lines_added, self.lines_removed
        )?;
        if self.binary_files > 0 {
            write!(f, ", {} binary", self.binary_files)?;
        }
        if self.unreadable_files > 0 {
            write!(f, ", {} unreadable", self.unreadable_files)?;
        }
        Ok(())
    }
}

/// Unified diff of two texts. Identical texts produce no lines.
pub fn diff_text(
    old: &str,
    new: &str,
    old_label: &str,
    new_label: &str,
    context_lines: usize,
) -> Vec<DiffLine> {
    if old == new {
        return Vec::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let groups = diff.grouped_ops(context_lines);
    if groups.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![DiffLine::FileHeader {
        old: old_label.to_string(),
        new: new_label.to_string(),
    }];

    for group in &groups {
        lines.push(hunk_header(group));
        for op in group {
            for change in diff.iter_changes(op) {
                let text = line_text(change.value());
                lines.push(match change.tag() {
                    ChangeTag::Equal => DiffLine::Context { text },
                    ChangeTag::Insert => DiffLine::Addition { text },
                    ChangeTag::Delete => DiffLine::Deletion { text },
                });
            }
        }
    }

    lines
}

fn hunk_header(group: &[DiffOp]) -> DiffLine {
    let (Some(first), Some(last)) = (group.first(), group.last()) else {
        return DiffLine::HunkHeader {
            old_start: 0,
            old_len: 0,
            new_start: 0,
            new_len: 0,
        };
    };

    let old = first.old_range().start..last.old_range().end;
    let new = first.new_range().start..last.new_range().end;

    DiffLine::HunkHeader {
        old_start: hunk_start(old.start, old.len()),
        old_len: old.len(),
        new_start: hunk_start(new.start, new.len()),
        new_len: new.len(),
    }
}

fn hunk_start(index: usize, len: usize) -> usize {
    if len == 0 {
        index
    } else {
        index + 1
    }
}

fn line_text(value: &str) -> String {
    let line = value.strip_suffix('\n').unwrap_or(value);
    line.strip_suffix('\r').unwrap_or(line).to_string()
}

/// Compare the tree at `snapshot_root` against `current_root`.
pub async fn diff_trees(
    snapshot_root: &Path,
    current_root: &Path,
    options: &DiffOptions,
) -> Vec<DiffLine> {
    let listing = list_files(snapshot_root);
    let mut lines = Vec::new();

    for issue in &listing.errors {
        let path = issue
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| snapshot_root.display().to_string());
        lines.push(DiffLine::Unreadable {
            path,
            message: issue.message.clone(),
        });
    }

    for file in &listing.files {
        lines.extend(diff_file(snapshot_root, current_root, file, options.context_lines).await);
    }

    if options.mode == DiffMode::Bidirectional {
        let known: BTreeSet<&Path> = listing.files.iter().map(|f| f.path.as_path()).collect();
        let current = list_files(current_root);
        for file in current.files.iter().filter(|f| !known.contains(f.path.as_path())) {
            lines.extend(diff_file(snapshot_root, current_root, file, options.context_lines).await);
        }
    }

    debug!(
        snapshot = %snapshot_root.display(),
        current = %current_root.display(),
        lines = lines.len(),
        "Computed tree diff"
    );
    lines
}

/// Diff one file between the two roots. Missing files count as empty.
async fn diff_file(
    snapshot_root: &Path,
    current_root: &Path,
    file: &TreeFile,
    context_lines: usize,
) -> Vec<DiffLine> {
    let relative = file.name.as_str();
    let old = match read_optional(&snapshot_root.join(&file.path)).await {
        Ok(bytes) => bytes.unwrap_or_default(),
        Err(e) => return vec![unreadable(relative, &e)],
    };
    let new = match read_optional(&current_root.join(&file.path)).await {
        Ok(bytes) => bytes.unwrap_or_default(),
        Err(e) => return vec![unreadable(relative, &e)],
    };

    if old == new {
        return Vec::new();
    }

    match (String::from_utf8(old), String::from_utf8(new)) {
        (Ok(old), Ok(new)) => diff_text(
            &old,
            &new,
            &format!("{}/{}", SNAPSHOT_LABEL, relative),
            &format!("{}/{}", CURRENT_LABEL, relative),
            context_lines,
        ),
        _ => {
            debug!(path = relative, "Skipping line diff of non-text file");
            vec![DiffLine::BinaryFile {
                path: relative.to_string(),
            }]
        }
    }
}

async fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn unreadable(relative: &str, error: &io::Error) -> DiffLine {
    warn!(path = relative, error = %error, "Could not read file for diff");
    DiffLine::Unreadable {
        path: relative.to_string(),
        message: error.to_string(),
    }
}
