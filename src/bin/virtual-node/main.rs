//! virtual-node CLI - build Node.js into an isolated environment

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("virtual_node=debug")
        } else if cli.quiet {
            EnvFilter::new("virtual_node=error")
        } else {
            EnvFilter::new("virtual_node=info")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = Arc::new(cli.shell());

    match cli.command {
        Commands::Install(args) => commands::install::execute(args, &shell),
        Commands::Resolve(args) => commands::resolve::execute(args, &shell),
        Commands::Clean(args) => commands::clean::execute(args, &shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
