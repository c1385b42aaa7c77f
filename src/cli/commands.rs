//! CLI command implementations
//!
//! Each command loads the configuration, opens the database, does one unit
//! of work and prints a single JSON line. Writes run in one transaction that
//! is committed only when the write status is a success.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::observability::{log_event_with_fields, Event, Logger};
use crate::paginator::Page;
use crate::query::SortSpec;
use crate::session::{Database, SqliteSession, StorageSession};
use crate::status::ResultStatus;
use crate::table::{begin_transaction, finalise_transaction, ReadOnlyTable, WriteCapableTable};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{read_request, write_response};

/// Run a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Init { config, schema } => init(&config, schema.as_deref()),
        Command::Seed {
            config,
            table,
            column,
            last_id,
        } => seed(&config, &table, &column, last_id),
        Command::Write { config, table, pk } => {
            let data = read_request()?;
            let status = write(&config, &table, pk.as_deref(), data)?;
            report(&status)
        }
        Command::Page {
            config,
            table,
            page: page_number,
            per_page,
            order_by,
        } => {
            let page = page(&config, &table, page_number, per_page, order_by.as_deref())?;
            write_response(&page_json(&page))
        }
        Command::Select { config, table, sql } => {
            let status = select(&config, &table, &sql)?;
            report(&status)
        }
    }
}

fn load_config(path: &Path) -> CliResult<Config> {
    let config = Config::load(path)?;
    Logger::set_min_severity(config.severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &path.display().to_string())],
    );
    Ok(config)
}

fn connect(config: &Config) -> CliResult<SqliteSession> {
    let database = Database::open(config.database_path())?;
    Ok(database.connect()?)
}

fn report(status: &ResultStatus) -> CliResult<()> {
    write_response(status)?;
    if status.is_ok() {
        Ok(())
    } else {
        Err(CliError::operation_failed(status.text()))
    }
}

/// Create the database, the counter table and, optionally, the tables in `schema`
pub fn init(config_path: &Path, schema: Option<&Path>) -> CliResult<()> {
    let config = load_config(config_path)?;
    let database = Database::open(config.database_path())?;
    database.install_unique_id()?;

    if let Some(schema) = schema {
        let ddl = fs::read_to_string(schema)
            .map_err(|e| CliError::io_error(format!("Failed to read schema: {}", e)))?;
        database.execute_batch(&ddl)?;
    }

    write_response(&ResultStatus::ok(format!(
        "Initialized {}",
        config.database_path().display()
    )))
}

/// Register or reseed the counter for `table.column`
pub fn seed(config_path: &Path, table: &str, column: &str, last_id: i64) -> CliResult<()> {
    let config = load_config(config_path)?;
    let database = Database::open(config.database_path())?;
    database.seed_unique_id(table, column, last_id)?;

    write_response(&ResultStatus::ok(format!(
        "Counter {}.{} set to {}",
        table, column, last_id
    )))
}

/// Write a JSON batch in its own transaction
pub fn write(
    config_path: &Path,
    table: &str,
    pk: Option<&str>,
    data: serde_json::Value,
) -> CliResult<ResultStatus> {
    let config = load_config(config_path)?;
    let mut session = connect(&config)?;
    let table = WriteCapableTable::new(session.describe_table(table, pk)?);

    begin_transaction(&mut session)?;
    let status = table.write_json(&mut session, data);
    if let Err(e) = finalise_transaction(&mut session, &status) {
        // commit failed; nothing of this write may survive
        let _ = session.rollback();
        return Ok(ResultStatus::from(&e));
    }
    Ok(status)
}

/// Fetch one page of a table
pub fn page(
    config_path: &Path,
    table: &str,
    page: u64,
    per_page: Option<u64>,
    order_by: Option<&str>,
) -> CliResult<Page> {
    let config = load_config(config_path)?;
    let mut session = connect(&config)?;
    let table = ReadOnlyTable::new(session.describe_table(table, None)?);

    let order = order_by.unwrap_or(table.schema().primary_key());
    let query = table.query().order_by(SortSpec::asc(order));
    let per_page = per_page.unwrap_or(config.default_per_page);

    Ok(table.paginate(&mut session, &query, page, per_page)?)
}

/// Run a SELECT statement in its own transaction
pub fn select(config_path: &Path, table: &str, sql: &str) -> CliResult<ResultStatus> {
    let config = load_config(config_path)?;
    let mut session = connect(&config)?;
    let table = ReadOnlyTable::new(session.describe_table(table, None)?);

    Ok(table.run_select_sql(&mut session, sql, true))
}

/// Page window and rows as one JSON object
pub fn page_json(page: &Page) -> serde_json::Value {
    json!({
        "page": page.page(),
        "per_page": page.per_page(),
        "total_records": page.total_records(),
        "total_pages": page.total_pages(),
        "offset": page.offset(),
        "limit": page.limit(),
        "has_next": page.has_next(),
        "has_prev": page.has_prev(),
        "items": page.items(),
    })
}
