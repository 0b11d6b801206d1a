//! `virtual-node install` command

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::InstallArgs;
use virtual_node::ops::provision;
use virtual_node::sources::HttpDownloader;
use virtual_node::util::config::Config;
use virtual_node::util::process::SystemRunner;
use virtual_node::util::shell::Shell;

pub fn execute(args: InstallArgs, shell: &Arc<Shell>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let config = Config::load(args.overrides(), &cwd)?;
    tracing::debug!("Provisioning into {}", config.env.prefix().display());

    let downloader = HttpDownloader::new(Arc::clone(shell))?;
    let report = provision(&config, &SystemRunner, &downloader, shell)?;

    if shell.is_json() {
        println!("{}", serde_json::to_string(&report)?);
    }

    Ok(())
}
