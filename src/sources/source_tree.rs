//! Scoped ownership of an extracted source tree.

use std::path::{Path, PathBuf};

use crate::util::fs::remove_dir_all_if_exists;

/// An extracted source directory that is removed when dropped.
///
/// Removal happens on both the success and the failure path of a build.
/// A failed removal is logged and otherwise ignored.
#[derive(Debug)]
pub struct SourceTree {
    path: PathBuf,
    keep: bool,
}

impl SourceTree {
    /// Take ownership of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SourceTree {
            path: path.into(),
            keep: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Leave the directory in place when this guard is dropped.
    pub fn keep(mut self) -> PathBuf {
        self.keep = true;
        self.path.clone()
    }

    /// Remove the directory now, reporting whether it worked.
    pub fn remove(mut self) -> bool {
        self.keep = true;
        remove_tree(&self.path)
    }
}

impl Drop for SourceTree {
    fn drop(&mut self) {
        if !self.keep {
            remove_tree(&self.path);
        }
    }
}

fn remove_tree(path: &Path) -> bool {
    match remove_dir_all_if_exists(path) {
        Ok(()) => {
            tracing::debug!("Removed source tree {}", path.display());
            true
        }
        Err(e) => {
            tracing::warn!("Could not remove source tree: {:#}", e);
            false
        }
    }
}
