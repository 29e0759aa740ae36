//! History ledger.
//!
//! The ledger is a single JSON document holding every snapshot record in
//! creation order:
//!
//! ```text
//! [
//!   {
//!     "id": "1a2b3c4",
//!     "timestamp": "2024-03-05T09:15:30",
//!     "user": "alice",
//!     "message": "init",
//!     "snapshot_path": "/data/snapshots/1a2b3c4",
//!     "files": ["a.txt", "b/c.txt"]
//!   }
//! ]
//! ```
//!
//! Every mutation rewrites the whole document. Appends hold an in-process
//! mutex plus an exclusive advisory lock on `<ledger>.lock` for the full
//! load-push-save cycle, so concurrent writers cannot drop each other's
//! records.

use crate::{Snapshot, SnapshotError, SnapshotId, SnapshotResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Durable, ordered record of all snapshots.
pub struct Ledger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Ledger {
    /// Create a ledger backed by the document at `path`.
    ///
    /// Nothing is read or written until the first operation.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the ledger document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records in storage order.
    ///
    /// A missing document is an empty history. A malformed one is an error.
    pub async fn load(&self) -> SnapshotResult<Vec<Snapshot>> {
        debug!(path = %self.path.display(), "Loading ledger");

        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SnapshotError::Io(e)),
        };

        serde_json::from_str(&content).map_err(|source| SnapshotError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Replace the document with `snapshots`.
    ///
    /// The new document is written to a temporary sibling and renamed over
    /// the old one.
    pub async fn save(&self, snapshots: &[Snapshot]) -> SnapshotResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(snapshots)?;
        let temp_path = self.sibling("tmp");
        fs::write(&temp_path, content).await?;
        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!(
                    path = %temp_path.display(),
                    error = %cleanup,
                    "Failed to remove temporary ledger"
                );
            }
            return Err(SnapshotError::Io(e));
        }

        debug!(path = %self.path.display(), records = snapshots.len(), "Saved ledger");
        Ok(())
    }

    /// Append one record.
    pub async fn append(&self, snapshot: Snapshot) -> SnapshotResult<()> {
        let _guard = self.write_lock.lock().await;
        let _file_lock = LedgerLock::acquire(self.sibling("lock")).await?;

        let mut snapshots = self.load().await?;
        if snapshots.iter().any(|s| s.id == snapshot.id) {
            return Err(SnapshotError::DuplicateId(snapshot.id.to_string()));
        }

        let id = snapshot.id.clone();
        snapshots.push(snapshot);
        self.save(&snapshots).await?;

        info!(id = %id, records = snapshots.len(), "Appended snapshot to ledger");
        Ok(())
    }

    /// Find a record by id.
    pub async fn find(&self, id: &SnapshotId) -> SnapshotResult<Option<Snapshot>> {
        Ok(self.load().await?.into_iter().find(|s| &s.id == id))
    }

    /// Path next to the ledger document, e.g. `.history.json.lock`.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "ledger".to_string());
        self.path.with_file_name(format!(".{}.{}", name, suffix))
    }
}

/// Exclusive advisory lock held for the lifetime of the guard.
struct LedgerLock {
    file: File,
    path: PathBuf,
}

impl LedgerLock {
    /// Block (off the async runtime) until the lock file is exclusively held.
    async fn acquire(path: PathBuf) -> SnapshotResult<Self> {
        let lock = tokio::task::spawn_blocking(move || -> io::Result<Self> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&path)?;
            file.lock_exclusive()?;
            Ok(Self { file, path })
        })
        .await
        .map_err(io::Error::other)??;

        debug!(path = %lock.path.display(), "Acquired ledger lock");
        Ok(lock)
    }
}

impl Drop for LedgerLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Failed to release ledger lock");
        }
    }
}
