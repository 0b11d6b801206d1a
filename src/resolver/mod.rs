//! Node version resolution.
//!
//! The version to install comes from, in order:
//! 1. an explicit override, used verbatim
//! 2. an exact `engines.node` pin (`==X.Y.Z`) in the project's `package.json`
//! 3. the configured default
//!
//! Manifest problems never fail resolution; they only mean "no pin".

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::core::{NodeVersion, PackageManifest};
use crate::util::config::ConfigError;

/// Operator marking an exact engine pin in `package.json`.
pub const EXACT_OPERATOR: &str = "==";

/// Where a resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
    Explicit,
    Manifest,
    Default,
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSource::Explicit => write!(f, "explicit override"),
            VersionSource::Manifest => write!(f, "package.json engines.node"),
            VersionSource::Default => write!(f, "default"),
        }
    }
}

/// A version together with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedVersion {
    pub version: NodeVersion,
    pub source: VersionSource,
}

/// Determine the node version for a run.
///
/// An explicit override that does not parse is an error, since the user
/// asked for it directly. Anything wrong with the manifest falls through to
/// `default`.
pub fn resolve_version(
    explicit: Option<&str>,
    manifest_path: &Path,
    default: &NodeVersion,
) -> Result<ResolvedVersion, ConfigError> {
    if let Some(raw) = explicit {
        let version = NodeVersion::parse(raw).map_err(|_| ConfigError::InvalidVersion {
            value: raw.to_string(),
            origin: "explicit override",
        })?;
        tracing::debug!("Using explicit node version {}", version);
        return Ok(ResolvedVersion {
            version,
            source: VersionSource::Explicit,
        });
    }

    if let Some(version) = manifest_engine_version(manifest_path) {
        tracing::debug!(
            "Using node version {} pinned in {}",
            version,
            manifest_path.display()
        );
        return Ok(ResolvedVersion {
            version,
            source: VersionSource::Manifest,
        });
    }

    tracing::debug!("Using default node version {}", default);
    Ok(ResolvedVersion {
        version: default.clone(),
        source: VersionSource::Default,
    })
}

/// Exact engine pin from a manifest, if there is a usable one.
fn manifest_engine_version(manifest_path: &Path) -> Option<NodeVersion> {
    if !manifest_path.exists() {
        tracing::debug!("No manifest at {}", manifest_path.display());
        return None;
    }

    let manifest = match PackageManifest::load(manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::debug!("Ignoring unreadable manifest: {:#}", e);
            return None;
        }
    };

    let constraint = manifest.node_engine()?;
    let version = exact_engine_version(constraint);
    if version.is_none() {
        tracing::debug!(
            "engines.node `{}` is not an exact `==` pin; ignoring",
            constraint
        );
    }
    version
}

/// Parse an `engines.node` constraint, accepting only `==X.Y.Z`.
pub fn exact_engine_version(constraint: &str) -> Option<NodeVersion> {
    let rest = constraint.trim().strip_prefix(EXACT_OPERATOR)?.trim();

    // `===1.0` or `==1.0 || 2.0` are not exact pins
    if rest.starts_with(['=', '<', '>', '~', '^']) || rest.contains(char::is_whitespace) {
        return None;
    }

    NodeVersion::parse(rest).ok()
}

/// Extract the install identifier from a package version string.
///
/// `0.0.1-0.10.26` splits on the first dash into the package's own version
/// and the node version to install.
pub fn override_from_package_version(package_version: &str) -> Option<String> {
    package_version
        .split_once('-')
        .map(|(_, node)| node.trim())
        .filter(|node| !node.is_empty())
        .map(str::to_string)
}
