//! Test fixtures for installed dependency trees.
//!
//! Builds a project directory with a `node_modules` tree inside a temporary
//! directory. Paths passed to the helpers are relative to the project root.
//!
//! # Example
//!
//! ```rust,ignore
//! let tree = TreeFixture::new();
//! tree.package("", "app", json!({ "dependencies": { "leaf": "1" } }));
//! tree.package("node_modules/leaf", "leaf", json!({}));
//! tree.native("node_modules/leaf");
//! ```

use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::core::manifest::MANIFEST_FILE;
use crate::util::fs::symlink;

/// A temporary project with an installed dependency tree.
pub struct TreeFixture {
    _tmp: TempDir,
    root: PathBuf,
}

impl TreeFixture {
    /// Create an empty project directory.
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let root = tmp.path().join("app");
        std::fs::create_dir_all(&root).expect("failed to create project root");
        let root = root.canonicalize().expect("failed to canonicalize project root");
        TreeFixture { _tmp: tmp, root }
    }

    /// The canonical project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of `rel` inside the project.
    pub fn path(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    /// Write a package manifest at `rel`, merging `name` into `fields`.
    pub fn package(&self, rel: &str, name: &str, fields: Value) -> PathBuf {
        let dir = self.path(rel);
        std::fs::create_dir_all(&dir).expect("failed to create package dir");

        let mut manifest = json!({ "name": name, "version": "1.0.0" });
        if let (Some(target), Value::Object(extra)) = (manifest.as_object_mut(), fields) {
            target.extend(extra);
        }
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest).expect("manifest serializes"),
        )
        .expect("failed to write manifest");
        dir
    }

    /// Mark the package at `rel` as a native module.
    pub fn native(&self, rel: &str) {
        std::fs::write(self.path(rel).join("binding.gyp"), "{ \"targets\": [] }")
            .expect("failed to write binding.gyp");
    }

    /// Create a directory-or-file symlink at `link_rel` pointing to `target_rel`.
    pub fn link(&self, target_rel: &str, link_rel: &str) {
        let link = self.path(link_rel);
        if let Some(parent) = link.parent() {
            std::fs::create_dir_all(parent).expect("failed to create link parent");
        }
        symlink(&self.path(target_rel), &link).expect("failed to create symlink");
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}
