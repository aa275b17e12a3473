//! Command line interface module
//!
//! Argument parsing and validation, plus the runner that builds both repository
//! handles and drives the sync.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
