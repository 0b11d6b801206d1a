//! virtual-node - build Node.js from source into an isolated environment
//!
//! A provisioning run resolves a node version, fetches and extracts the
//! source tarball, runs configure/make/make install against the
//! environment prefix, removes the sources, and installs the project's npm
//! and bower dependencies.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod sources;
pub mod util;

/// Test doubles for provisioning unit tests.
///
/// Only compiled for tests. Provides a recording command runner, a canned
/// downloader and tarball fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{NodeVersion, TargetEnvironment};
pub use ops::{provision, ProvisionReport};
pub use resolver::{resolve_version, ResolvedVersion, VersionSource};
pub use util::config::Config;
