//! Testing utilities and fixtures for treesnap.
//!
//! - **Fixtures**: temporary directory trees built from a file list
//! - **Assertions**: helpers for comparing files and whole trees
//!
//! # Example Usage
//!
//! ```rust
//! use treesnap_test_utils::TestTree;
//!
//! let tree = TestTree::new()
//!     .with_file("a.txt", "hello\n")
//!     .with_file("b/c.txt", "nested\n")
//!     .build();
//!
//! assert!(tree.file_exists("b/c.txt"));
//! assert_eq!(tree.read_file("a.txt"), "hello\n");
//! ```

pub mod assertions;
pub mod fixtures;

pub use fixtures::{read_tree, BuiltTestTree, TestTree};
