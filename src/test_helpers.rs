//! Shared test utilities for the sui test suite.
//!
//! Provides fixture setup over `fixtures/` and lookup helpers over page
//! trees that panic with the available names on a miss.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let sui = open_fixture_sui(&tmp);
//! let template = sui.template("tech-blue").unwrap();
//!
//! assert_eq!(route_list(&template.tree().unwrap())[0], "/error");
//! ```

use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

use crate::registry::Sui;
use crate::storage::LocalStorage;
use crate::tree::PageTreeNode;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures");
    for entry in WalkDir::new(&fixtures).into_iter().filter_map(|e| e.ok()) {
        let relative = entry.path().strip_prefix(&fixtures).unwrap();
        let target = tmp.path().join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).unwrap();
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
    tmp
}

/// A SUI over a fixture copy, backed by the local filesystem.
pub fn open_fixture_sui(tmp: &TempDir) -> Sui {
    Sui::open("fixtures", Arc::new(LocalStorage::new(tmp.path()))).unwrap()
}

// =========================================================================
// Tree lookups
// =========================================================================

/// Every page route in tree pre-order.
pub fn route_list(tree: &PageTreeNode) -> Vec<String> {
    tree.pages().iter().map(|p| p.route().to_string()).collect()
}

/// Child node by name. Panics if not found.
pub fn find_child<'a>(node: &'a PageTreeNode, name: &str) -> &'a PageTreeNode {
    node.children
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| {
            let names: Vec<&str> = node.children.iter().map(|c| c.name.as_str()).collect();
            panic!("node '{name}' not found under '{}'. Available: {names:?}", node.name)
        })
}

/// Assert the top two levels of a tree match an expected shape.
///
/// Each entry is `(name, children)`. Use `&[]` for leaf nodes.
pub fn assert_tree_shape(tree: &PageTreeNode, expected: &[(&str, &[&str])]) {
    let actual: Vec<&str> = tree.children.iter().map(|c| c.name.as_str()).collect();
    let expected_names: Vec<&str> = expected.iter().map(|(n, _)| *n).collect();
    assert_eq!(actual, expected_names, "top-level names mismatch");

    for (name, children) in expected {
        let actual_children: Vec<&str> = find_child(tree, name)
            .children
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            actual_children,
            children.to_vec(),
            "children of '{name}' mismatch"
        );
    }
}
