//! CLI argument definitions using clap
//!
//! Commands:
//! - tablewright init --config <path> [--schema <sql file>]
//! - tablewright seed --config <path> --table <name> --column <name> --last-id <n>
//! - tablewright write --config <path> --table <name> [--pk <column>]
//! - tablewright page --config <path> --table <name> [--page N] [--per-page N] [--order-by <column>]
//! - tablewright select --config <path> --table <name> --sql <statement>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tablewright - batch record writes and paginated reads over SQLite
#[derive(Parser, Debug)]
#[command(name = "tablewright")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database and its unique_id counter table
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./tablewright.json")]
        config: PathBuf,

        /// SQL file with table definitions to run after creation
        #[arg(long)]
        schema: Option<PathBuf>,
    },

    /// Register or reseed a unique id counter
    Seed {
        /// Path to configuration file
        #[arg(long, default_value = "./tablewright.json")]
        config: PathBuf,

        #[arg(long)]
        table: String,

        #[arg(long)]
        column: String,

        /// Last id handed out; the next allocation returns this plus one
        #[arg(long, default_value_t = 0)]
        last_id: i64,
    },

    /// Write a JSON array of recStatus-tagged records read from stdin
    Write {
        /// Path to configuration file
        #[arg(long, default_value = "./tablewright.json")]
        config: PathBuf,

        #[arg(long)]
        table: String,

        /// Primary key column, when the catalog's is not the one to use
        #[arg(long)]
        pk: Option<String>,
    },

    /// Print one page of a table
    Page {
        /// Path to configuration file
        #[arg(long, default_value = "./tablewright.json")]
        config: PathBuf,

        #[arg(long)]
        table: String,

        #[arg(long, default_value_t = 1)]
        page: u64,

        /// Rows per page; defaults to the configured default_per_page
        #[arg(long)]
        per_page: Option<u64>,

        /// Column to order by, ascending
        #[arg(long)]
        order_by: Option<String>,
    },

    /// Run a SELECT statement and print the result
    Select {
        /// Path to configuration file
        #[arg(long, default_value = "./tablewright.json")]
        config: PathBuf,

        #[arg(long)]
        table: String,

        #[arg(long)]
        sql: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write() {
        let cli = Cli::try_parse_from([
            "tablewright",
            "write",
            "--config",
            "db.json",
            "--table",
            "employees",
        ])
        .unwrap();
        match cli.command {
            Command::Write { table, pk, .. } => {
                assert_eq!(table, "employees");
                assert!(pk.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_page_defaults() {
        let cli = Cli::try_parse_from(["tablewright", "page", "--table", "employees"]).unwrap();
        match cli.command {
            Command::Page {
                config,
                page,
                per_page,
                ..
            } => {
                assert_eq!(config, PathBuf::from("./tablewright.json"));
                assert_eq!(page, 1);
                assert_eq!(per_page, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
