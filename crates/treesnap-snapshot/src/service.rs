//! Snapshot service.

use crate::copy::replace_tree;
use crate::diff::{diff_trees, DiffLine, DiffOptions};
use crate::ledger::Ledger;
use crate::snapshot::current_user;
use crate::tree::list_files;
use crate::{Snapshot, SnapshotConfig, SnapshotError, SnapshotId, SnapshotResult};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Attempts at drawing an unused snapshot id before giving up.
const MAX_ID_ATTEMPTS: u32 = 16;

/// Creates, restores, lists and diffs snapshots of one working tree.
///
/// Storage layout:
/// ```text
/// snapshots_root/
///   <snapshot_id>/         # full copy of the working tree
///     <relative_path>
/// ledger_path              # JSON array of snapshot records
/// ```
///
/// Reads of the working tree (`create`, `diff`) share a lock; `restore`
/// takes it exclusively.
pub struct SnapshotService {
    config: SnapshotConfig,
    ledger: Ledger,
    tree_lock: RwLock<()>,
    create_lock: Mutex<()>,
}

impl SnapshotService {
    /// Create a service, creating the working tree and snapshots root if
    /// they don't exist.
    ///
    /// Relative locations are resolved against the current directory once,
    /// so recorded slot paths stay valid from any later directory.
    pub async fn new(config: SnapshotConfig) -> SnapshotResult<Self> {
        let config = config.resolve_paths(&std::env::current_dir()?);
        config.validate()?;

        fs::create_dir_all(&config.working_tree).await?;
        fs::create_dir_all(&config.snapshots_root).await?;

        debug!(
            working_tree = %config.working_tree.display(),
            snapshots_root = %config.snapshots_root.display(),
            ledger = %config.ledger_path.display(),
            "Snapshot service ready"
        );

        Ok(Self {
            ledger: Ledger::new(config.ledger_path.clone()),
            config,
            tree_lock: RwLock::new(()),
            create_lock: Mutex::new(()),
        })
    }

    /// The configuration this service was built with.
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// The ledger backing this service.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Capture the working tree.
    ///
    /// The record is only written once the copy has fully succeeded; if
    /// recording fails the copy is removed again.
    pub async fn create(&self, message: &str, author: Option<&str>) -> SnapshotResult<Snapshot> {
        let _create = self.create_lock.lock().await;

        let id = self.fresh_id().await?;
        let slot = self.slot_dir(&id);

        {
            let _read = self.tree_lock.read().await;
            replace_tree(&self.config.working_tree, &slot).await?;
        }

        let listing = list_files(&slot);
        if !listing.is_complete() {
            for issue in &listing.errors {
                warn!(id = %id, path = ?issue.path, error = %issue.message, "Incomplete file index");
            }
        }

        let snapshot = Snapshot::new(
            id,
            self.resolve_author(author),
            message,
            slot.clone(),
            listing.names(),
        );

        if let Err(e) = self.ledger.append(snapshot.clone()).await {
            if let Err(cleanup) = fs::remove_dir_all(&slot).await {
                warn!(slot = %slot.display(), error = %cleanup, "Failed to remove unrecorded snapshot");
            }
            return Err(e);
        }

        info!(
            "Created snapshot {} with {} files",
            snapshot.id,
            snapshot.files.len()
        );
        Ok(snapshot)
    }

    /// Replace the working tree with a snapshot's stored copy.
    ///
    /// The copy is read from this service's snapshots root, not the
    /// recorded `storage_path`. The current working tree is not
    /// snapshotted first.
    pub async fn restore(&self, id: &SnapshotId) -> SnapshotResult<Snapshot> {
        let snapshot = self.get(id).await?;

        {
            let _write = self.tree_lock.write().await;
            replace_tree(&self.slot_dir(&snapshot.id), &self.config.working_tree).await?;
        }

        info!(
            "Restored snapshot {} ({} files)",
            snapshot.id,
            snapshot.files.len()
        );
        Ok(snapshot)
    }

    /// Diff a snapshot against the working tree using the configured options.
    pub async fn diff_against_current(&self, id: &SnapshotId) -> SnapshotResult<Vec<DiffLine>> {
        self.diff_with(id, self.config.diff_options()).await
    }

    /// Diff a snapshot against the working tree.
    pub async fn diff_with(
        &self,
        id: &SnapshotId,
        options: DiffOptions,
    ) -> SnapshotResult<Vec<DiffLine>> {
        let snapshot = self.get(id).await?;

        let _read = self.tree_lock.read().await;
        Ok(diff_trees(&self.slot_dir(&snapshot.id), &self.config.working_tree, &options).await)
    }

    /// All snapshots, newest first.
    pub async fn list(&self) -> SnapshotResult<Vec<Snapshot>> {
        let mut snapshots = self.ledger.load().await?;
        snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(snapshots)
    }

    /// Get a snapshot by ID.
    pub async fn get(&self, id: &SnapshotId) -> SnapshotResult<Snapshot> {
        if !id.is_valid_slot_name() {
            return Err(SnapshotError::not_found(id.as_str()));
        }
        self.ledger
            .find(id)
            .await?
            .ok_or_else(|| SnapshotError::not_found(id.as_str()))
    }

    /// Draw an id not used by any recorded snapshot or existing slot.
    async fn fresh_id(&self) -> SnapshotResult<SnapshotId> {
        let taken: HashSet<SnapshotId> = self
            .ledger
            .load()
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = SnapshotId::generate();
            if taken.contains(&id) || fs::try_exists(self.slot_dir(&id)).await? {
                debug!(id = %id, "Snapshot id collision, retrying");
                continue;
            }
            return Ok(id);
        }

        Err(SnapshotError::IdExhausted(MAX_ID_ATTEMPTS))
    }

    fn resolve_author(&self, author: Option<&str>) -> String {
        author
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .or_else(|| self.config.default_author.clone())
            .unwrap_or_else(current_user)
    }

    /// Get the directory for a snapshot.
    fn slot_dir(&self, id: &SnapshotId) -> PathBuf {
        self.config.snapshots_root.join(id.as_str())
    }
}
