//! Project manifests owned by the npm and bower ecosystems.
//!
//! Both files are read-only inputs. Only the handful of fields the
//! provisioner acts on are modelled; everything else is ignored.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::util::fs::read_to_string;

/// npm manifest file name.
pub const PACKAGE_MANIFEST: &str = "package.json";

/// bower manifest file name.
pub const BOWER_MANIFEST: &str = "bower.json";

/// The subset of `package.json` used for provisioning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackageManifest {
    pub name: Option<String>,

    /// `engines` block; `engines.node` pins the runtime version.
    pub engines: Engines,

    /// Declared runtime dependencies (name -> version requirement).
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Engines {
    pub node: Option<String>,
}

impl PackageManifest {
    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;

        Self::parse(&content)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    /// Parse manifest content.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// The raw `engines.node` constraint, if any.
    pub fn node_engine(&self) -> Option<&str> {
        self.engines.node.as_deref()
    }

    /// `name@version` install specs for every declared dependency.
    pub fn install_specs(&self) -> Vec<String> {
        self.dependencies
            .iter()
            .map(|(name, version)| format!("{}@{}", name, version))
            .collect()
    }
}

/// The subset of `bower.json` used for provisioning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BowerManifest {
    pub name: Option<String>,
    pub dependencies: BTreeMap<String, String>,
}

impl BowerManifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;

        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }
}
