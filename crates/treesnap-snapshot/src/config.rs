//! Snapshot service configuration.
//!
//! All filesystem locations are explicit so each service instance (and
//! each test) can work against its own directories. Configuration can be
//! loaded from a JSON file; relative paths in the file are resolved
//! against the file's directory and missing fields take their defaults.
//!
//! ```json
//! {
//!   "working_tree": "data/current",
//!   "snapshots_root": "data/snapshots",
//!   "ledger_path": "history.json",
//!   "context_lines": 3,
//!   "diff_mode": "snapshot_only"
//! }
//! ```

use crate::diff::{DiffMode, DiffOptions, DEFAULT_CONTEXT_LINES};
use crate::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use treesnap_util::path::{is_within, resolve};

/// Environment variable selecting the data directory.
pub const DATA_DIR_ENV: &str = "TREESNAP_DATA_DIR";

/// Upper bound for `context_lines`.
pub const MAX_CONTEXT_LINES: usize = 1000;

/// Configuration for a [`SnapshotService`](crate::SnapshotService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// The live directory under management.
    pub working_tree: PathBuf,

    /// Directory holding one storage slot per snapshot.
    pub snapshots_root: PathBuf,

    /// Ledger document path.
    pub ledger_path: PathBuf,

    /// Unchanged lines shown around each change in diffs.
    pub context_lines: usize,

    /// Which files diffs compare.
    pub diff_mode: DiffMode,

    /// Author recorded when the caller supplies none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_author: Option<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self::for_data_dir(default_data_dir())
    }
}

impl SnapshotConfig {
    /// Standard layout under a single data directory:
    /// `current/`, `snapshots/` and `history.json`.
    pub fn for_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            working_tree: data_dir.join("current"),
            snapshots_root: data_dir.join("snapshots"),
            ledger_path: data_dir.join("history.json"),
            context_lines: DEFAULT_CONTEXT_LINES,
            diff_mode: DiffMode::default(),
            default_author: None,
        }
    }

    /// Default layout, honoring `TREESNAP_DATA_DIR` when set.
    pub fn from_env() -> Self {
        match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => Self::for_data_dir(PathBuf::from(dir)),
            _ => Self::default(),
        }
    }

    /// Load and validate a configuration file.
    pub async fn load_file(path: &Path) -> SnapshotResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            SnapshotError::invalid_config(format!("{}: {}", path.display(), e))
        })?;

        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let config = config.resolve_paths(base);
        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Resolve relative locations against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        self.working_tree = resolve(base, &self.working_tree);
        self.snapshots_root = resolve(base, &self.snapshots_root);
        self.ledger_path = resolve(base, &self.ledger_path);
        self
    }

    /// Diff options derived from this configuration.
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            context_lines: self.context_lines,
            mode: self.diff_mode,
        }
    }

    /// Reject layouts where one managed location contains another.
    pub fn validate(&self) -> SnapshotResult<()> {
        if self.context_lines > MAX_CONTEXT_LINES {
            return Err(SnapshotError::invalid_config(format!(
                "context_lines must be at most {}, got {}",
                MAX_CONTEXT_LINES, self.context_lines
            )));
        }

        if is_within(&self.working_tree, &self.snapshots_root)
            || is_within(&self.snapshots_root, &self.working_tree)
        {
            return Err(SnapshotError::invalid_config(format!(
                "working tree {} and snapshots root {} must not contain each other",
                self.working_tree.display(),
                self.snapshots_root.display()
            )));
        }

        if is_within(&self.ledger_path, &self.working_tree)
            || is_within(&self.ledger_path, &self.snapshots_root)
        {
            return Err(SnapshotError::invalid_config(format!(
                "ledger {} must live outside the working tree and snapshots root",
                self.ledger_path.display()
            )));
        }

        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    treesnap_util::path::data_dir().unwrap_or_else(|| PathBuf::from(".treesnap"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn data_dir_layout() {
        let config = SnapshotConfig::for_data_dir("/srv/treesnap");
        assert_eq!(config.working_tree, PathBuf::from("/srv/treesnap/current"));
        assert_eq!(config.snapshots_root, PathBuf::from("/srv/treesnap/snapshots"));
        assert_eq!(config.ledger_path, PathBuf::from("/srv/treesnap/history.json"));
        assert_eq!(config.context_lines, 3);
        assert_eq!(config.diff_mode, DiffMode::SnapshotOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_working_tree_is_rejected() {
        let mut config = SnapshotConfig::for_data_dir("/srv/treesnap");
        config.snapshots_root = PathBuf::from("/srv/treesnap/current/.snapshots");
        assert!(matches!(
            config.validate(),
            Err(SnapshotError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ledger_inside_working_tree_is_rejected() {
        let mut config = SnapshotConfig::for_data_dir("/srv/treesnap");
        config.ledger_path = PathBuf::from("/srv/treesnap/current/history.json");
        assert!(config.validate().is_err());
    }

    #[test]
    fn oversized_context_is_rejected() {
        let mut config = SnapshotConfig::for_data_dir("/srv/treesnap");
        config.context_lines = MAX_CONTEXT_LINES + 1;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_file_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("treesnap.json");
        std::fs::write(
            &path,
            r#"{
                "working_tree": "work",
                "snapshots_root": "store/snapshots",
                "ledger_path": "store/history.json",
                "context_lines": 5,
                "diff_mode": "bidirectional",
                "default_author": "ci"
            }"#,
        )
        .unwrap();

        let config = SnapshotConfig::load_file(&path).await.unwrap();
        assert_eq!(config.working_tree, dir.path().join("work"));
        assert_eq!(config.snapshots_root, dir.path().join("store/snapshots"));
        assert_eq!(config.ledger_path, dir.path().join("store/history.json"));
        assert_eq!(config.diff_options().context_lines, 5);
        assert_eq!(config.diff_options().mode, DiffMode::Bidirectional);
        assert_eq!(config.default_author.as_deref(), Some("ci"));
    }

    #[tokio::test]
    async fn load_file_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("treesnap.json");
        std::fs::write(&path, "{ \"context_lines\": ").unwrap();

        let err = SnapshotConfig::load_file(&path).await.unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidConfig(_)));
    }

    #[test]
    fn round_trips_through_json() {
        let config = SnapshotConfig::for_data_dir("/srv/treesnap");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("default_author"));
        let parsed: SnapshotConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
