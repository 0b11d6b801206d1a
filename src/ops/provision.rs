//! A full provisioning run.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::builder::NodeBuilder;
use crate::core::PACKAGE_MANIFEST;
use crate::ops::dependencies::{install_secondary_dependencies, DependencyReport};
use crate::resolver::{resolve_version, ResolvedVersion};
use crate::sources::{fetch_and_extract, Downloader};
use crate::util::config::Config;
use crate::util::process::CommandRunner;
use crate::util::shell::{Shell, Status};

/// Summary of a provisioning run, printed as JSON in machine-readable mode.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    #[serde(flatten)]
    pub version: ResolvedVersion,
    pub prefix: PathBuf,
    /// False when the version was already installed.
    pub built: bool,
    /// Where the source tree was left, with `keep-source`.
    pub source_kept: Option<PathBuf>,
    pub dependencies: DependencyReport,
}

impl ProvisionReport {
    pub fn warnings(&self) -> &[String] {
        &self.dependencies.warnings
    }
}

/// Resolve, fetch, build and install node into `config.env`, then install
/// the project's npm and bower dependencies.
///
/// The dependency step runs whether or not a build was needed. The
/// extracted source tree is removed afterwards, including when the build
/// fails.
pub fn provision(
    config: &Config,
    runner: &dyn CommandRunner,
    downloader: &dyn Downloader,
    shell: &Arc<Shell>,
) -> Result<ProvisionReport> {
    let resolved = resolve_version(
        config.explicit_version.as_deref(),
        &config.project_dir.join(PACKAGE_MANIFEST),
        &config.default_version,
    )?;
    let version = &resolved.version;
    shell.status(
        Status::Resolving,
        format!("node {} ({})", version, resolved.source),
    );

    let builder = NodeBuilder::new(runner, &config.env, Arc::clone(shell))
        .jobs(config.jobs)
        .configure_args(config.configure_args.iter().cloned());

    let mut source_kept = None;
    let built = if builder.is_installed(version) {
        shell.status(
            Status::Skipped,
            format!("node {} is already installed", version),
        );
        false
    } else {
        shell.status(
            Status::Fetching,
            format!("node {} from {}", version, config.dist_url),
        );
        let tree = fetch_and_extract(downloader, &config.dist_url, version, &config.env)?;

        builder.build(tree.path(), version)?;

        if config.keep_source {
            let path = tree.keep();
            shell.note(format!("kept sources in {}", path.display()));
            source_kept = Some(path);
        } else if tree.remove() {
            shell.status(Status::Removed, "node sources");
        }

        true
    };

    let dependencies = install_secondary_dependencies(
        runner,
        &config.env,
        &config.project_dir,
        &config.dependencies,
    )?;
    for warning in &dependencies.warnings {
        shell.warn(warning);
    }

    shell.status(
        Status::Installed,
        format!("node {} in {}", version, config.env.prefix().display()),
    );

    Ok(ProvisionReport {
        version: resolved,
        prefix: config.env.prefix().to_path_buf(),
        built,
        source_kept,
        dependencies,
    })
}
