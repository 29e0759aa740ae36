//! Whole-tree replacement.
//!
//! [`replace_tree`] makes `dst` mirror `src` without ever leaving `dst`
//! half-populated: the new tree is built in a hidden staging sibling,
//! the old `dst` is moved aside, and the staging directory is renamed
//! into place. The old tree is only deleted once the swap succeeded.
//!
//! ```text
//! parent/
//!   dst/                      # previous contents until the swap
//!   .dst.staging-<token>/     # new copy being built
//!   .dst.old-<token>/         # previous contents during the swap
//! ```

use crate::{SnapshotError, SnapshotResult};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use treesnap_util::path::is_within;
use uuid::Uuid;
use walkdir::WalkDir;

/// Replace the contents of `dst` with a full copy of `src`.
///
/// On error the previous `dst` (if any) is left untouched and no staging
/// directory remains. The parent of `dst` is created if needed.
pub async fn replace_tree(src: &Path, dst: &Path) -> SnapshotResult<()> {
    let metadata = fs::metadata(src)
        .await
        .map_err(|e| SnapshotError::copy(src, e))?;
    if !metadata.is_dir() {
        return Err(SnapshotError::copy(
            src,
            io::Error::new(io::ErrorKind::InvalidInput, "source is not a directory"),
        ));
    }
    if is_within(dst, src) {
        return Err(SnapshotError::copy(
            dst,
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "destination lies inside the source tree",
            ),
        ));
    }

    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            SnapshotError::copy(
                dst,
                io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
            )
        })?;
    let parent = match dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .await
        .map_err(|e| SnapshotError::copy(&parent, e))?;

    let token = Uuid::new_v4().simple().to_string();
    let staging = parent.join(format!(".{}.staging-{}", name, &token[..12]));
    let backup = parent.join(format!(".{}.old-{}", name, &token[..12]));

    let copied = match copy_tree(src, &staging).await {
        Ok(count) => count,
        Err(e) => {
            remove_quietly(&staging).await;
            return Err(e);
        }
    };

    let had_previous = match fs::symlink_metadata(dst).await {
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            remove_quietly(&staging).await;
            return Err(SnapshotError::copy(dst, e));
        }
    };

    if had_previous {
        if let Err(e) = fs::rename(dst, &backup).await {
            remove_quietly(&staging).await;
            return Err(SnapshotError::copy(dst, e));
        }
    }

    if let Err(e) = fs::rename(&staging, dst).await {
        if had_previous {
            if let Err(rollback) = fs::rename(&backup, dst).await {
                warn!(
                    dst = %dst.display(),
                    backup = %backup.display(),
                    error = %rollback,
                    "Failed to move previous tree back into place"
                );
            }
        }
        remove_quietly(&staging).await;
        return Err(SnapshotError::copy(dst, e));
    }

    if had_previous {
        remove_quietly(&backup).await;
    }

    info!(
        src = %src.display(),
        dst = %dst.display(),
        files = copied,
        "Replaced tree"
    );
    Ok(())
}

/// Copy every directory and regular file under `src` into `dst`.
///
/// Returns the number of files copied.
async fn copy_tree(src: &Path, dst: &Path) -> SnapshotResult<usize> {
    fs::create_dir_all(dst)
        .await
        .map_err(|e| SnapshotError::copy(dst, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false).min_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| src.to_path_buf());
            SnapshotError::copy(path, e.into())
        })?;

        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)
                .await
                .map_err(|e| SnapshotError::copy(&target, e))?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)
                .await
                .map_err(|e| SnapshotError::copy(entry.path(), e))?;
            copied += 1;
        } else {
            debug!(path = %entry.path().display(), "Not copying non-regular file");
        }
    }

    Ok(copied)
}

/// Remove a file or directory, logging instead of failing.
async fn remove_quietly(path: &Path) {
    let result = match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to remove temporary tree");
    }
}
