//! `virtual-node resolve` command

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cli::ResolveArgs;
use virtual_node::core::PACKAGE_MANIFEST;
use virtual_node::resolver::resolve_version;
use virtual_node::sources::node_src_url;
use virtual_node::util::config::VersionSettings;
use virtual_node::util::shell::Shell;

pub fn execute(args: ResolveArgs, shell: &Arc<Shell>) -> Result<()> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let (settings, project_dir) = VersionSettings::load(&args.version.overrides(), &cwd)?;

    let resolved = resolve_version(
        settings.explicit_version.as_deref(),
        &project_dir.join(PACKAGE_MANIFEST),
        &settings.default_version,
    )?;
    let url = node_src_url(&settings.dist_url, &resolved.version, "")
        .with_context(|| format!("invalid source URL for node {}", resolved.version))?;

    if shell.is_json() {
        let event = serde_json::json!({
            "version": resolved.version,
            "source": resolved.source,
            "url": url.as_str(),
        });
        println!("{}", event);
    } else {
        println!("{} ({})", resolved.version, resolved.source);
        println!("{}", url);
    }

    Ok(())
}
