//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use virtual_node::util::config::{
    ConfigOverrides, NpmMode, DIST_URL_VAR, ENV_DIR_VAR, NODE_VERSION_VAR, PROJECT_DIR_VAR,
};
use virtual_node::util::shell::{ColorChoice, Shell};

/// Build and install Node.js into an isolated project environment
#[derive(Parser)]
#[command(name = "virtual-node")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for reports
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn shell(&self) -> Shell {
        Shell::from_flags(
            self.quiet,
            self.verbose,
            self.color,
            self.message_format == MessageFormat::Json,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build node into the environment and install project dependencies
    Install(InstallArgs),

    /// Show which node version would be installed and where it comes from
    Resolve(ResolveArgs),

    /// Remove leftover node source trees from the environment
    Clean(CleanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct EnvArgs {
    /// Target environment (defaults to the active virtualenv)
    #[arg(long, env = ENV_DIR_VAR)]
    pub env_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct VersionArgs {
    /// Project directory holding package.json and bower.json
    #[arg(long, env = PROJECT_DIR_VAR)]
    pub project_dir: Option<PathBuf>,

    /// Node version to install, ignoring package.json
    #[arg(long, env = NODE_VERSION_VAR)]
    pub node_version: Option<String>,

    /// Package version carrying the node version after a dash (0.0.1-0.10.26)
    #[arg(long)]
    pub package_version: Option<String>,

    /// Mirror to download source tarballs from
    #[arg(long, env = DIST_URL_VAR)]
    pub dist_url: Option<String>,
}

impl VersionArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            project_dir: self.project_dir.clone(),
            node_version: self.node_version.clone(),
            package_version: self.package_version.clone(),
            dist_url: self.dist_url.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    #[command(flatten)]
    pub version: VersionArgs,

    /// Number of parallel make jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Skip npm install
    #[arg(long)]
    pub no_npm: bool,

    /// Skip bower install
    #[arg(long)]
    pub no_bower: bool,

    /// aggregate: one `npm install`; individual: `npm install -g` per dependency
    #[arg(long)]
    pub npm_mode: Option<NpmMode>,

    /// Leave the extracted sources in the environment
    #[arg(long)]
    pub keep_source: bool,
}

impl InstallArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            env_dir: self.env.env_dir.clone(),
            jobs: self.jobs,
            npm: self.no_npm.then_some(false),
            bower: self.no_bower.then_some(false),
            npm_mode: self.npm_mode,
            keep_source: self.keep_source.then_some(true),
            ..self.version.overrides()
        }
    }
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub version: VersionArgs,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
