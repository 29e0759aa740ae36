//! Snapshot engine for treesnap.
//!
//! This crate captures point-in-time copies of a working directory and
//! provides:
//! - Full-tree snapshots with metadata (timestamp, author, message, files)
//! - Restore of the working tree to a prior snapshot
//! - Unified diffs between a snapshot and the working tree
//! - A durable JSON ledger of all snapshots
//!
//! # Example
//!
//! ```no_run
//! use treesnap_snapshot::{SnapshotConfig, SnapshotService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = SnapshotService::new(SnapshotConfig::for_data_dir("/var/lib/treesnap")).await?;
//!
//! // Capture the working tree
//! let snapshot = service.create("Before refactor", None).await?;
//!
//! // ... edit files under /var/lib/treesnap/current ...
//!
//! for line in service.diff_against_current(&snapshot.id).await? {
//!     println!("{line}");
//! }
//!
//! // Roll back if needed
//! service.restore(&snapshot.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod copy;
pub mod diff;
mod error;
pub mod ledger;
mod service;
mod snapshot;
pub mod tree;

pub use config::SnapshotConfig;
pub use diff::{DiffLine, DiffMode, DiffOptions, DiffSummary};
pub use error::{SnapshotError, SnapshotResult};
pub use ledger::Ledger;
pub use service::SnapshotService;
pub use snapshot::{current_user, Snapshot, SnapshotId, UNKNOWN_AUTHOR};
pub use tree::{list_files, FileListing, TreeFile, WalkIssue};
