//! npm and bower installs for the project, run against the provisioned node.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::{BowerManifest, PackageManifest, TargetEnvironment, BOWER_MANIFEST, PACKAGE_MANIFEST};
use crate::util::config::{DependencyOptions, NpmMode};
use crate::util::fs::is_executable;
use crate::util::process::{find_executable, CommandRunner, ProcessBuilder};

/// What happened to one dependency step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "reason")]
pub enum StepOutcome {
    Ran,
    /// Turned off in configuration.
    Disabled,
    /// Preconditions not met; the reason is also in the report's warnings.
    Skipped(String),
}

impl StepOutcome {
    pub fn ran(&self) -> bool {
        matches!(self, StepOutcome::Ran)
    }
}

/// Result of [`install_secondary_dependencies`].
#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub npm: StepOutcome,
    pub bower: StepOutcome,
    pub warnings: Vec<String>,
}

/// Run npm and bower for `project_dir` with the environment's tools first
/// on `PATH`.
///
/// Missing manifests or tools are warnings, never errors. A tool that runs
/// and exits non-zero is an error.
pub fn install_secondary_dependencies(
    runner: &dyn CommandRunner,
    env: &TargetEnvironment,
    project_dir: &Path,
    opts: &DependencyOptions,
) -> Result<DependencyReport> {
    let mut warnings = Vec::new();

    let npm = if opts.npm {
        install_npm(runner, env, project_dir, opts.npm_mode, &mut warnings)?
    } else {
        StepOutcome::Disabled
    };

    let bower = if opts.bower {
        install_bower(runner, env, project_dir, &mut warnings)?
    } else {
        StepOutcome::Disabled
    };

    Ok(DependencyReport {
        npm,
        bower,
        warnings,
    })
}

fn skip(warnings: &mut Vec<String>, message: String) -> StepOutcome {
    tracing::debug!("{}", message);
    warnings.push(message.clone());
    StepOutcome::Skipped(message)
}

fn install_npm(
    runner: &dyn CommandRunner,
    env: &TargetEnvironment,
    project_dir: &Path,
    mode: NpmMode,
    warnings: &mut Vec<String>,
) -> Result<StepOutcome> {
    let manifest_path = project_dir.join(PACKAGE_MANIFEST);
    if !manifest_path.is_file() {
        return Ok(skip(
            warnings,
            format!(
                "no {} in {}, skipping npm install",
                PACKAGE_MANIFEST,
                project_dir.display()
            ),
        ));
    }

    let Some(npm) = locate_npm(env) else {
        return Ok(skip(
            warnings,
            "npm was not found in the environment or on PATH, skipping npm install".to_string(),
        ));
    };
    tracing::debug!("Using npm at {}", npm.display());

    match mode {
        NpmMode::Aggregate => {
            let cmd = tool_command(&npm, env, project_dir).arg("install");
            runner.run(&cmd).context("npm install failed")?;
        }
        NpmMode::Individual => {
            let manifest = match PackageManifest::load(&manifest_path) {
                Ok(m) => m,
                Err(e) => return Ok(skip(warnings, format!("{:#}, skipping npm install", e))),
            };

            for spec in manifest.install_specs() {
                tracing::info!("Installing {}", spec);
                let cmd = tool_command(&npm, env, project_dir)
                    .args(["install", "-g"])
                    .arg(&spec);
                runner
                    .run(&cmd)
                    .with_context(|| format!("npm install of {} failed", spec))?;
            }
        }
    }

    Ok(StepOutcome::Ran)
}

fn install_bower(
    runner: &dyn CommandRunner,
    env: &TargetEnvironment,
    project_dir: &Path,
    warnings: &mut Vec<String>,
) -> Result<StepOutcome> {
    let manifest_path = project_dir.join(BOWER_MANIFEST);
    if !manifest_path.is_file() {
        return Ok(skip(
            warnings,
            format!(
                "no {} in {}, skipping bower install",
                BOWER_MANIFEST,
                project_dir.display()
            ),
        ));
    }

    let bower = env.bower_bin();
    if !is_executable(&bower) {
        return Ok(skip(
            warnings,
            format!(
                "bower is not installed in {}, skipping bower install",
                env.bin_dir().display()
            ),
        ));
    }

    match BowerManifest::load(&manifest_path) {
        Ok(manifest) => tracing::debug!(
            "bower.json declares {} dependencies",
            manifest.dependencies.len()
        ),
        Err(e) => tracing::debug!("{:#}", e),
    }

    let cmd = tool_command(&bower, env, project_dir).args(["install", "--config.interactive=false"]);
    runner.run(&cmd).context("bower install failed")?;

    Ok(StepOutcome::Ran)
}

/// Prefer the environment's npm over one on `PATH`.
fn locate_npm(env: &TargetEnvironment) -> Option<PathBuf> {
    let local = env.npm_bin();
    if is_executable(&local) {
        return Some(local);
    }
    find_executable("npm")
}

/// A command in the project directory that resolves node and global
/// packages inside the environment.
fn tool_command(program: &Path, env: &TargetEnvironment, project_dir: &Path) -> ProcessBuilder {
    ProcessBuilder::new(program)
        .cwd(project_dir)
        .env("PATH", env_path(env))
        .env("NPM_CONFIG_PREFIX", env.prefix().to_string_lossy())
}

fn env_path(env: &TargetEnvironment) -> String {
    let mut dirs = vec![env.bin_dir()];
    if let Some(path) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&path));
    }
    std::env::join_paths(dirs)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| env.bin_dir().to_string_lossy().into_owned())
}
