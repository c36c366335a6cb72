//! CLI module for declstore
//!
//! Provides the command-line interface for:
//! - add: ingest a PDF file or a directory of PDFs
//! - list: enumerate the registry
//! - update: merge a metadata patch into one document
//! - export: materialize the store into a dataset file

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run_command;
pub use errors::{CliError, CliResult};

use tracing_subscriber::EnvFilter;

/// Parse arguments, initialize logging, and run the selected command.
pub fn run() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run_command(Cli::parse_args())
}
