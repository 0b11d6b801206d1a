//! Builds node from an extracted source tree with configure and make.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::{NodeVersion, TargetEnvironment};
use crate::util::fs::is_executable;
use crate::util::process::{find_executable, CommandRunner, ProcessBuilder};
use crate::util::shell::{Shell, Status};

/// What [`NodeBuilder::build_and_install`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// The requested version already answers `node --version`.
    AlreadyInstalled,
    /// configure, make and make install all ran.
    Built,
}

/// Runs the autotools-style node build against an environment prefix.
pub struct NodeBuilder<'a> {
    runner: &'a dyn CommandRunner,
    env: &'a TargetEnvironment,
    shell: Arc<Shell>,
    jobs: Option<usize>,
    configure_args: Vec<String>,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, env: &'a TargetEnvironment, shell: Arc<Shell>) -> Self {
        NodeBuilder {
            runner,
            env,
            shell,
            jobs: None,
            configure_args: Vec::new(),
        }
    }

    /// Parallel jobs for `make`.
    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Extra arguments appended after `--prefix`.
    pub fn configure_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.configure_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// The version reported by the environment's node binary, if any.
    pub fn installed_version(&self) -> Option<String> {
        let node = self.env.node_bin();
        if !is_executable(&node) {
            return None;
        }

        let cmd = ProcessBuilder::new(&node).arg("--version").quiet(true);
        match self.runner.run(&cmd) {
            Ok(output) => output.first_line().map(|l| l.trim().to_string()),
            Err(e) => {
                tracing::debug!("Could not query installed node: {}", e);
                None
            }
        }
    }

    /// Whether `version` is exactly what the environment's node reports.
    pub fn is_installed(&self, version: &NodeVersion) -> bool {
        self.installed_version().as_deref() == Some(version.tag().as_str())
    }

    /// Configure, compile and install `source` into the environment prefix.
    ///
    /// Nothing runs if `version` is already installed.
    pub fn build_and_install(&self, source: &Path, version: &NodeVersion) -> Result<BuildOutcome> {
        if self.is_installed(version) {
            tracing::info!("node {} is already installed", version);
            return Ok(BuildOutcome::AlreadyInstalled);
        }

        self.build(source, version)?;
        Ok(BuildOutcome::Built)
    }

    /// Configure, compile and install `source` without checking what is
    /// already installed.
    pub fn build(&self, source: &Path, version: &NodeVersion) -> Result<()> {
        if find_executable("make").is_none() {
            tracing::warn!("`make` was not found in PATH; the build will likely fail");
        }

        let span = self.shell.span(Status::Compiling, format!("node {}", version));

        self.shell.status(Status::Configuring, format!("node {}", version));
        self.configure(source)
            .with_context(|| format!("failed to configure node {}", version))?;

        self.compile(source)
            .with_context(|| format!("failed to compile node {}", version))?;

        self.shell.status(
            Status::Installing,
            format!("node {} into {}", version, self.env.prefix().display()),
        );
        self.install(source)
            .with_context(|| format!("failed to install node {}", version))?;

        span.finish();
        Ok(())
    }

    fn configure(&self, source: &Path) -> Result<()> {
        let cmd = ProcessBuilder::new(source.join("configure"))
            .arg(format!("--prefix={}", self.env.prefix().display()))
            .args(&self.configure_args)
            .cwd(source);

        self.runner.run(&cmd)?;
        Ok(())
    }

    fn compile(&self, source: &Path) -> Result<()> {
        let mut cmd = ProcessBuilder::new("make").cwd(source);
        if let Some(jobs) = self.jobs {
            cmd = cmd.arg("-j").arg(jobs.to_string());
        }

        self.runner.run(&cmd)?;
        Ok(())
    }

    fn install(&self, source: &Path) -> Result<()> {
        let cmd = ProcessBuilder::new("make").arg("install").cwd(source);

        self.runner.run(&cmd)?;
        Ok(())
    }
}
