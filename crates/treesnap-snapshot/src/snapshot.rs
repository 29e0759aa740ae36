//! Snapshot data structures.

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Number of hex characters in a generated snapshot id.
pub const SNAPSHOT_ID_LEN: usize = 7;

/// Author recorded when no identity can be determined.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Unique identifier for a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    /// Create a new random short snapshot ID.
    ///
    /// Uniqueness against existing snapshots is enforced by the caller.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(hex[..SNAPSHOT_ID_LEN].to_string())
    }

    /// Create a snapshot ID from a string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the ID is safe to use as a single directory name.
    pub fn is_valid_slot_name(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains(['/', '\\'])
    }
}

impl std::fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

/// A point-in-time copy of the working tree.
///
/// Field names on disk follow the ledger document format, so `author` is
/// stored as `user` and `storage_path` as `snapshot_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unique identifier for this snapshot.
    pub id: SnapshotId,

    /// Local capture time, second precision.
    pub timestamp: NaiveDateTime,

    /// Who took the snapshot.
    #[serde(rename = "user")]
    pub author: String,

    /// Free-text annotation, possibly empty.
    pub message: String,

    /// Directory holding the stored copy of the tree.
    #[serde(rename = "snapshot_path")]
    pub storage_path: PathBuf,

    /// Files captured, relative to the tree root with `/` separators.
    pub files: Vec<String>,
}

impl Snapshot {
    /// Create a new snapshot record stamped with the current local time.
    pub fn new(
        id: SnapshotId,
        author: impl Into<String>,
        message: impl Into<String>,
        storage_path: PathBuf,
        files: Vec<String>,
    ) -> Self {
        Self {
            id,
            timestamp: now_local(),
            author: author.into(),
            message: message.into(),
            storage_path,
            files,
        }
    }

    /// Path of a captured file inside the storage slot.
    pub fn stored_file(&self, path: &str) -> PathBuf {
        self.storage_path.join(Path::new(path))
    }
}

/// Current local time truncated to whole seconds.
pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Best-effort identity of the current user.
pub fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
}
