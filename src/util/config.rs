//! Configuration for a provisioning run.
//!
//! Settings come from three layers, highest precedence first:
//! 1. Command-line flags and their environment variables
//! 2. Project config: `<project>/.virtual-node/config.toml`
//! 3. Global config: `~/.virtual-node/config.toml`
//!
//! Anything left unset falls back to built-in defaults. The merged result is
//! a [`Config`] value that is passed explicitly into every operation.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::core::{NodeVersion, TargetEnvironment};
use crate::resolver::override_from_package_version;
use crate::util::fs::read_to_string;

/// Environment variable naming the target environment.
pub const ENV_DIR_VAR: &str = "VIRTUAL_ENV";

/// Environment variable naming the project directory.
pub const PROJECT_DIR_VAR: &str = "VIRTUAL_NODE_PROJECT_DIR";

/// Environment variable carrying an explicit node version.
pub const NODE_VERSION_VAR: &str = "VIRTUAL_NODE_VERSION";

/// Environment variable overriding the download mirror.
pub const DIST_URL_VAR: &str = "VIRTUAL_NODE_DIST_URL";

/// Version installed when nothing else pins one.
pub const DEFAULT_NODE_VERSION: &str = "0.8.11";

/// Base URL that source tarballs are downloaded from.
pub const DEFAULT_DIST_URL: &str = "https://nodejs.org/dist";

/// Directory holding config files, both in the project and in `$HOME`.
pub const CONFIG_DIR_NAME: &str = ".virtual-node";

/// Configuration errors. All of them abort the run before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no target environment: set {} or pass --env-dir", ENV_DIR_VAR)]
    MissingEnvDir,

    #[error("target environment does not exist: {}", .0.display())]
    EnvDirNotFound(PathBuf),

    #[error("invalid node version `{value}` (from {origin})")]
    InvalidVersion { value: String, origin: &'static str },

    #[error("invalid dist URL `{value}`")]
    InvalidDistUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid config file {}: {message}", .path.display())]
    File { path: PathBuf, message: String },
}

/// How npm dependencies are installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpmMode {
    /// One `npm install` scoped to the project directory.
    #[default]
    Aggregate,
    /// `npm install -g name@version` for every declared dependency.
    Individual,
}

impl FromStr for NpmMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "aggregate" => Ok(NpmMode::Aggregate),
            "individual" => Ok(NpmMode::Individual),
            _ => Err(format!(
                "invalid npm mode '{}'; expected 'aggregate' or 'individual'",
                s
            )),
        }
    }
}

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub node: NodeSettings,
    pub dependencies: DependencySettings,
}

/// `[node]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct NodeSettings {
    /// Version used when no override or manifest pin applies
    pub version: Option<String>,

    /// Mirror for source tarballs
    pub dist_url: Option<String>,

    /// Parallel jobs passed to `make -j`
    pub jobs: Option<usize>,

    /// Extra arguments appended to `configure`
    pub configure_args: Vec<String>,

    /// Keep the extracted source tree after installing
    pub keep_source: Option<bool>,
}

/// `[dependencies]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DependencySettings {
    pub npm: Option<bool>,
    pub bower: Option<bool>,
    pub npm_mode: Option<NpmMode>,
}

impl FileConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = read_to_string(path)?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: FileConfig) {
        if other.node.version.is_some() {
            self.node.version = other.node.version;
        }
        if other.node.dist_url.is_some() {
            self.node.dist_url = other.node.dist_url;
        }
        if other.node.jobs.is_some() {
            self.node.jobs = other.node.jobs;
        }
        if !other.node.configure_args.is_empty() {
            self.node.configure_args = other.node.configure_args;
        }
        if other.node.keep_source.is_some() {
            self.node.keep_source = other.node.keep_source;
        }

        if other.dependencies.npm.is_some() {
            self.dependencies.npm = other.dependencies.npm;
        }
        if other.dependencies.bower.is_some() {
            self.dependencies.bower = other.dependencies.bower;
        }
        if other.dependencies.npm_mode.is_some() {
            self.dependencies.npm_mode = other.dependencies.npm_mode;
        }
    }
}

/// Load merged file configuration from global and project locations.
///
/// Missing files are skipped; a file that exists but does not parse is an error.
pub fn load_file_config(
    global_path: Option<&Path>,
    project_path: &Path,
) -> Result<FileConfig, ConfigError> {
    let mut config = FileConfig::default();

    for path in global_path.into_iter().chain(std::iter::once(project_path)) {
        if path.exists() {
            let layer = FileConfig::load(path).map_err(|e| ConfigError::File {
                path: path.to_path_buf(),
                message: format!("{:#}", e),
            })?;
            config.merge(layer);
        }
    }

    Ok(config)
}

/// Get the global config path (`~/.virtual-node/config.toml`).
pub fn global_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME).join("config.toml"))
}

/// Get the project config path (`<project>/.virtual-node/config.toml`).
pub fn project_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR_NAME).join("config.toml")
}

/// Settings given on the command line (or through their environment variables).
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub env_dir: Option<PathBuf>,
    pub project_dir: Option<PathBuf>,
    pub node_version: Option<String>,
    /// Package version carrying an install identifier (`0.0.1-0.10.26`)
    pub package_version: Option<String>,
    pub dist_url: Option<String>,
    pub jobs: Option<usize>,
    pub npm: Option<bool>,
    pub bower: Option<bool>,
    pub npm_mode: Option<NpmMode>,
    pub keep_source: Option<bool>,
}

/// Which secondary dependency steps run, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOptions {
    pub npm: bool,
    pub bower: bool,
    pub npm_mode: NpmMode,
}

impl Default for DependencyOptions {
    fn default() -> Self {
        DependencyOptions {
            npm: true,
            bower: true,
            npm_mode: NpmMode::Aggregate,
        }
    }
}

/// Fully resolved configuration for one provisioning run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Installation root and prefix
    pub env: TargetEnvironment,

    /// Directory holding `package.json` / `bower.json`
    pub project_dir: PathBuf,

    /// Version requested explicitly, used verbatim by the resolver
    pub explicit_version: Option<String>,

    /// Fallback when neither an override nor a manifest pin applies
    pub default_version: NodeVersion,

    pub dist_url: Url,

    pub jobs: Option<usize>,

    pub configure_args: Vec<String>,

    pub keep_source: bool,

    pub dependencies: DependencyOptions,
}

impl Config {
    /// Configuration with built-in defaults for an environment and project.
    pub fn new(env: TargetEnvironment, project_dir: impl Into<PathBuf>) -> Self {
        Config {
            env,
            project_dir: project_dir.into(),
            explicit_version: None,
            default_version: default_node_version(),
            dist_url: default_dist_url(),
            jobs: None,
            configure_args: Vec::new(),
            keep_source: false,
            dependencies: DependencyOptions::default(),
        }
    }

    /// Load configuration files and apply command-line overrides.
    pub fn load(overrides: ConfigOverrides, cwd: &Path) -> Result<Self, ConfigError> {
        let (project_dir, file) = load_project_files(&overrides, cwd)?;
        Self::resolve(overrides, file, project_dir)
    }

    /// Merge overrides on top of file configuration.
    pub fn resolve(
        overrides: ConfigOverrides,
        file: FileConfig,
        project_dir: PathBuf,
    ) -> Result<Self, ConfigError> {
        let env_dir = overrides.env_dir.clone().ok_or(ConfigError::MissingEnvDir)?;
        if !env_dir.is_dir() {
            return Err(ConfigError::EnvDirNotFound(env_dir));
        }
        // Absolute but symlinks intact: this is the prefix node is built with
        let env_dir = std::path::absolute(&env_dir)
            .map_err(|_| ConfigError::EnvDirNotFound(env_dir.clone()))?;

        let VersionSettings {
            explicit_version,
            default_version,
            dist_url,
        } = VersionSettings::resolve(&overrides, &file)?;

        let defaults = DependencyOptions::default();
        let dependencies = DependencyOptions {
            npm: overrides
                .npm
                .or(file.dependencies.npm)
                .unwrap_or(defaults.npm),
            bower: overrides
                .bower
                .or(file.dependencies.bower)
                .unwrap_or(defaults.bower),
            npm_mode: overrides
                .npm_mode
                .or(file.dependencies.npm_mode)
                .unwrap_or(defaults.npm_mode),
        };

        Ok(Config {
            env: TargetEnvironment::new(env_dir),
            project_dir,
            explicit_version,
            default_version,
            dist_url,
            jobs: overrides.jobs.or(file.node.jobs),
            configure_args: file.node.configure_args,
            keep_source: overrides
                .keep_source
                .or(file.node.keep_source)
                .unwrap_or(false),
            dependencies,
        })
    }
}

/// The subset of [`Config`] needed to pick a version and its download URL.
///
/// Unlike a full [`Config`], this needs no target environment.
#[derive(Debug, Clone)]
pub struct VersionSettings {
    pub explicit_version: Option<String>,
    pub default_version: NodeVersion,
    pub dist_url: Url,
}

impl VersionSettings {
    /// Load configuration files and apply command-line overrides.
    ///
    /// Returns the project directory alongside the settings.
    pub fn load(overrides: &ConfigOverrides, cwd: &Path) -> Result<(Self, PathBuf), ConfigError> {
        let (project_dir, file) = load_project_files(overrides, cwd)?;
        Ok((Self::resolve(overrides, &file)?, project_dir))
    }

    pub fn resolve(overrides: &ConfigOverrides, file: &FileConfig) -> Result<Self, ConfigError> {
        let explicit_version = overrides.node_version.clone().or_else(|| {
            overrides
                .package_version
                .as_deref()
                .and_then(override_from_package_version)
        });

        let default_version = match file.node.version {
            Some(ref v) => NodeVersion::parse(v).map_err(|_| ConfigError::InvalidVersion {
                value: v.clone(),
                origin: "config file",
            })?,
            None => default_node_version(),
        };

        let dist_url = match overrides.dist_url.as_ref().or(file.node.dist_url.as_ref()) {
            Some(raw) => parse_dist_url(raw)?,
            None => default_dist_url(),
        };

        Ok(VersionSettings {
            explicit_version,
            default_version,
            dist_url,
        })
    }
}

/// Project directory (relative to `cwd`) and its merged config files.
fn load_project_files(
    overrides: &ConfigOverrides,
    cwd: &Path,
) -> Result<(PathBuf, FileConfig), ConfigError> {
    let project_dir = overrides
        .project_dir
        .clone()
        .map(|p| if p.is_absolute() { p } else { cwd.join(p) })
        .unwrap_or_else(|| cwd.to_path_buf());

    let global = global_config_path();
    let file = load_file_config(global.as_deref(), &project_config_path(&project_dir))?;
    Ok((project_dir, file))
}

/// The built-in default version as a value.
pub fn default_node_version() -> NodeVersion {
    NodeVersion::new(0, 8, 11)
}

fn default_dist_url() -> Url {
    parse_dist_url(DEFAULT_DIST_URL).expect("built-in dist URL parses")
}

/// Parse a mirror URL. A trailing slash is added so path segments join
/// underneath it.
pub fn parse_dist_url(raw: &str) -> Result<Url, ConfigError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };

    Url::parse(&normalized).map_err(|source| ConfigError::InvalidDistUrl {
        value: raw.to_string(),
        source,
    })
}
