//! `virtual-node clean` command

use std::sync::Arc;

use anyhow::Result;

use crate::cli::CleanArgs;
use virtual_node::core::TargetEnvironment;
use virtual_node::ops::clean_sources;
use virtual_node::util::config::ConfigError;
use virtual_node::util::shell::{Shell, Status};

pub fn execute(args: CleanArgs, shell: &Arc<Shell>) -> Result<()> {
    let env_dir = args.env.env_dir.ok_or(ConfigError::MissingEnvDir)?;
    if !env_dir.is_dir() {
        return Err(ConfigError::EnvDirNotFound(env_dir).into());
    }
    let env = TargetEnvironment::new(env_dir);

    let removed = clean_sources(&env)?;
    if removed.is_empty() {
        shell.note("nothing to clean");
    }
    for path in &removed {
        shell.status(Status::Removed, path.display());
    }

    Ok(())
}
