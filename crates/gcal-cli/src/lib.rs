//! The `gcal` command-line interface.
//!
//! Parses arguments, loads the JSON config document, wires the Google
//! services together and runs one command per invocation.

pub mod cli;
pub mod commands;
pub mod config;
pub mod container;
pub mod error;
pub mod output;
pub mod prompt;

pub use cli::Cli;
pub use container::Services;
pub use error::{CliError, CliResult};
