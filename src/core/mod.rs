//! Core data types for provisioning.
//!
//! - The target environment and the paths derived from it
//! - Node version identifiers
//! - The npm and bower manifests read from the project

pub mod environment;
pub mod manifest;
pub mod version;

pub use environment::TargetEnvironment;
pub use manifest::{BowerManifest, PackageManifest, BOWER_MANIFEST, PACKAGE_MANIFEST};
pub use version::{InvalidVersion, NodeVersion};
