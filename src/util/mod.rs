//! Shared utilities

pub mod config;
pub mod fs;
pub mod process;
pub mod shell;

pub use config::{Config, ConfigError, ConfigOverrides};
pub use process::{CommandRunner, ProcessBuilder, ProcessError, SystemRunner};
pub use shell::Shell;
