//! finrag CLI library.
//!
//! Configuration, command execution and output formatting for the `finrag`
//! binary: ingest a directory of financial documents, then search it or ask
//! questions about it.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod output;
pub mod repl;

pub use cli::{Cli, Command};
pub use config::Config;
pub use context::AppContext;
pub use error::{CliError, Result};
pub use output::Formatter;
