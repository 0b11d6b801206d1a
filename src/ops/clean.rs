//! Removal of leftover source trees.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::TargetEnvironment;
use crate::util::fs::{remove_dir_all_if_exists, subdirs_with_prefix};

/// Remove every `src/node-v*` directory in the environment.
///
/// Returns the removed paths. Other contents of `src/` are left alone.
pub fn clean_sources(env: &TargetEnvironment) -> Result<Vec<PathBuf>> {
    let trees = subdirs_with_prefix(&env.src_dir(), "node-v")?;
    for tree in &trees {
        tracing::debug!("Removing {}", tree.display());
        remove_dir_all_if_exists(tree)?;
    }
    Ok(trees)
}
