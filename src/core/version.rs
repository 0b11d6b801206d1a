//! Node.js version identifiers.
//!
//! Node versions are dotted numeric triples (`0.8.11`). They are compared
//! numerically so that `0.10.0` sorts above `0.5.0`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a string is not a usable Node version.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid node version `{input}`: expected MAJOR[.MINOR[.PATCH]]")]
pub struct InvalidVersion {
    pub input: String,
}

/// A resolved Node.js version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeVersion {
    version: Version,
}

impl NodeVersion {
    /// Create a version from its numeric components.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        NodeVersion {
            version: Version::new(major, minor, patch),
        }
    }

    /// Parse a version string, allowing a leading `v` and missing components.
    pub fn parse(s: &str) -> Result<Self, InvalidVersion> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);

        parse_version_lenient(bare)
            .map(|version| NodeVersion { version })
            .ok_or_else(|| InvalidVersion {
                input: s.to_string(),
            })
    }

    /// The version as reported by `node --version` (`v0.8.11`).
    pub fn tag(&self) -> String {
        format!("v{}", self)
    }

    /// Directory and archive stem for this version's sources (`node-v0.8.11`).
    pub fn source_name(&self) -> String {
        format!("node-v{}", self)
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.version)
    }
}

impl FromStr for NodeVersion {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeVersion::parse(s)
    }
}

impl PartialOrd for NodeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.version.cmp(&other.version)
    }
}

impl Serialize for NodeVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        NodeVersion::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Parse a version string, allowing for incomplete versions.
pub fn parse_version_lenient(s: &str) -> Option<Version> {
    // Exact parse first, but node versions never carry build metadata
    if let Ok(v) = s.parse::<Version>() {
        if v.build.is_empty() {
            return Some(v);
        }
        return None;
    }

    let parts: Vec<&str> = s.split('.').collect();
    match parts.len() {
        1 => {
            let major: u64 = parts[0].parse().ok()?;
            Some(Version::new(major, 0, 0))
        }
        2 => {
            let major: u64 = parts[0].parse().ok()?;
            let minor: u64 = parts[1].parse().ok()?;
            Some(Version::new(major, minor, 0))
        }
        _ => None,
    }
}
