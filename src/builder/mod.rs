//! Compiling and installing node from source.

pub mod node;

pub use node::{BuildOutcome, NodeBuilder};
