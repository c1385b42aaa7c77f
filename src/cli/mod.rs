//! CLI module for tablewright
//!
//! Provides command-line interface for:
//! - init: Create the database and counter table
//! - seed: Register a unique id counter
//! - write: Apply a JSON batch in one transaction
//! - page: Print one page of a table
//! - select: Run a SELECT statement

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{init, page, page_json, run_command, seed, select, write};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_document, read_request, write_response};

/// Parse arguments and run the command
pub fn run() -> CliResult<()> {
    run_command(Cli::parse_args().command)
}
