//! The isolated installation root that Node.js is provisioned into.

use std::path::{Path, PathBuf};

use crate::core::version::NodeVersion;

/// An existing environment directory (for example a Python virtualenv).
///
/// The environment doubles as the install prefix: `configure --prefix`
/// receives [`TargetEnvironment::prefix`] unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEnvironment {
    root: PathBuf,
}

impl TargetEnvironment {
    /// Wrap an environment root. The caller is responsible for checking it exists.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        TargetEnvironment { root: root.into() }
    }

    /// The installation prefix passed to `configure`.
    pub fn prefix(&self) -> &Path {
        &self.root
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn node_bin(&self) -> PathBuf {
        self.bin_dir().join("node")
    }

    pub fn npm_bin(&self) -> PathBuf {
        self.bin_dir().join("npm")
    }

    pub fn bower_bin(&self) -> PathBuf {
        self.bin_dir().join("bower")
    }

    /// Directory that source archives are extracted under.
    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Deterministic extraction directory for a version (`src/node-v0.8.11`).
    pub fn node_src_dir(&self, version: &NodeVersion) -> PathBuf {
        self.src_dir().join(version.source_name())
    }
}
