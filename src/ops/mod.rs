//! High-level operations behind the CLI commands.

pub mod clean;
pub mod dependencies;
pub mod provision;

pub use clean::clean_sources;
pub use dependencies::{install_secondary_dependencies, DependencyReport, StepOutcome};
pub use provision::{provision, ProvisionReport};
