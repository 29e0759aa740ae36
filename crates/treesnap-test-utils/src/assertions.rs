//! Assertion helpers for comparing files and directory trees.
//!
//! Failures print a line diff so mismatches are readable in test output.

use crate::fixtures::read_tree;
use std::path::Path;

/// Assert that a file's content equals expected text exactly.
pub fn assert_file_equals(path: &Path, expected: &str) {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));

    assert_strings_equal(&content, expected);
}

/// Assert that two strings are equal, with a nice diff on failure.
pub fn assert_strings_equal(actual: &str, expected: &str) {
    if actual != expected {
        let diff = similar::TextDiff::from_lines(expected, actual);
        let mut output = String::new();

        for change in diff.iter_all_changes() {
            let sign = match change.tag() {
                similar::ChangeTag::Delete => "-",
                similar::ChangeTag::Insert => "+",
                similar::ChangeTag::Equal => " ",
            };
            output.push_str(&format!("{}{}", sign, change));
        }

        panic!("Strings are not equal.\nDiff (- expected, + actual):\n{}", output);
    }
}

/// Assert that two directory trees hold the same files with identical bytes.
///
/// Empty directories are ignored.
pub fn assert_trees_equal(actual: &Path, expected: &Path) {
    let actual_files = read_tree(actual);
    let expected_files = read_tree(expected);

    let actual_names: Vec<&String> = actual_files.keys().collect();
    let expected_names: Vec<&String> = expected_files.keys().collect();
    assert_eq!(
        actual_names,
        expected_names,
        "File sets differ between {} and {}",
        actual.display(),
        expected.display()
    );

    for (name, bytes) in &actual_files {
        if bytes != &expected_files[name] {
            match (
                std::str::from_utf8(bytes),
                std::str::from_utf8(&expected_files[name]),
            ) {
                (Ok(a), Ok(e)) => {
                    assert_strings_equal(a, e);
                }
                _ => panic!("Binary file {} differs", name),
            }
        }
    }
}
