//! Test fixtures for creating reproducible directory trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A temporary directory tree with configurable contents.
///
/// # Example
///
/// ```rust
/// use treesnap_test_utils::fixtures::TestTree;
///
/// let tree = TestTree::new()
///     .with_file("x.txt", "hello\n")
///     .with_dir("empty")
///     .build();
///
/// assert!(tree.path().join("x.txt").exists());
/// assert!(tree.path().join("empty").is_dir());
/// ```
pub struct TestTree {
    /// The temporary directory backing this tree.
    temp_dir: TempDir,
    /// Files to create (path relative to root -> contents).
    files: BTreeMap<PathBuf, Vec<u8>>,
    /// Directories to create (paths relative to root).
    dirs: Vec<PathBuf>,
}

impl TestTree {
    /// Create a new test tree builder.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            files: BTreeMap::new(),
            dirs: Vec::new(),
        }
    }

    /// Add a text file. Parent directories are created automatically.
    pub fn with_file(self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.with_bytes(path, contents.into().into_bytes())
    }

    /// Add a file with raw contents.
    pub fn with_bytes(mut self, path: impl AsRef<Path>, contents: impl Into<Vec<u8>>) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), contents.into());
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Build the tree, creating all files and directories.
    pub fn build(self) -> BuiltTestTree {
        let root = self.temp_dir.path();

        for dir in &self.dirs {
            let full_path = root.join(dir);
            fs::create_dir_all(&full_path).unwrap_or_else(|e| {
                panic!("Failed to create directory {}: {}", full_path.display(), e)
            });
        }

        for (path, contents) in &self.files {
            write_path(&root.join(path), contents);
        }

        BuiltTestTree {
            temp_dir: self.temp_dir,
        }
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

/// A built test tree with files created on disk.
///
/// The temporary directory is removed when this is dropped.
pub struct BuiltTestTree {
    temp_dir: TempDir,
}

impl BuiltTestTree {
    /// Root of the tree.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Read a text file from the tree.
    pub fn read_file(&self, path: impl AsRef<Path>) -> String {
        let full_path = self.path().join(path.as_ref());
        fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read file {}: {}", full_path.display(), e))
    }

    /// Check if a file exists in the tree.
    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.path().join(path.as_ref()).exists()
    }

    /// Write a file (for modifying during tests).
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) {
        write_path(&self.path().join(path.as_ref()), contents.as_ref());
    }

    /// Delete a file from the tree.
    pub fn delete_file(&self, path: impl AsRef<Path>) {
        let full_path = self.path().join(path.as_ref());
        fs::remove_file(&full_path)
            .unwrap_or_else(|e| panic!("Failed to delete file {}: {}", full_path.display(), e));
    }

    /// Every file under the tree, keyed by `/`-separated relative path.
    pub fn contents(&self) -> BTreeMap<String, Vec<u8>> {
        read_tree(self.path())
    }
}

/// Read every regular file under `root`, keyed by `/`-separated relative path.
pub fn read_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(root)
                .expect("walk stays under root")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            let bytes = fs::read(e.path())
                .unwrap_or_else(|err| panic!("Failed to read {}: {}", e.path().display(), err));
            (relative, bytes)
        })
        .collect()
}

fn write_path(full_path: &Path, contents: &[u8]) {
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| {
            panic!(
                "Failed to create parent directory for {}: {}",
                full_path.display(),
                e
            )
        });
    }
    fs::write(full_path, contents)
        .unwrap_or_else(|e| panic!("Failed to write file {}: {}", full_path.display(), e));
}
