//! Snapshot error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

/// Errors that can occur during snapshot operations.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot not found.
    #[error("Snapshot not found: {0}")]
    NotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Copying a tree failed at a specific path.
    #[error("Failed to copy {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ledger document could not be parsed.
    #[error("Failed to parse ledger {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with this id is already in the ledger.
    #[error("Snapshot id already recorded: {0}")]
    DuplicateId(String),

    /// No unused snapshot id could be generated.
    #[error("Could not generate a unique snapshot id after {0} attempts")]
    IdExhausted(u32),

    /// Configuration is unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SnapshotError {
    /// Create a not found error.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    /// Create a copy error for the given path.
    pub fn copy(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Copy {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether this error came from the filesystem.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Copy { .. })
    }

    /// Whether this error is an unknown snapshot id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_formats_id() {
        let err = SnapshotError::not_found("abc1234");
        assert_eq!(err.to_string(), "Snapshot not found: abc1234");
        assert!(err.is_not_found());
        assert!(!err.is_io());
    }

    #[test]
    fn copy_error_is_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = SnapshotError::copy("/data/current/secret.txt", io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("/data/current/secret.txt"));
    }

    #[test]
    fn io_error_wraps() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = SnapshotError::from(io_err);
        assert!(err.is_io());
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn parse_error_names_ledger() {
        let json_err = serde_json::from_str::<Vec<String>>("{not json").unwrap_err();
        let err = SnapshotError::Parse {
            path: PathBuf::from("history.json"),
            source: json_err,
        };
        assert!(err.to_string().starts_with("Failed to parse ledger history.json"));
    }

    #[test]
    fn id_exhausted_displays_attempts() {
        let err = SnapshotError::IdExhausted(16);
        assert_eq!(
            err.to_string(),
            "Could not generate a unique snapshot id after 16 attempts"
        );
    }
}
