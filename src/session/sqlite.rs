//! SQLite-backed sessions
//!
//! `Database` is the connection manager: it owns the database path and hands
//! out one `SqliteSession` per connection. Sessions manage transactions with
//! explicit `BEGIN IMMEDIATE` / `COMMIT` / `ROLLBACK`; inserts and updates are
//! staged and executed in order at flush.
//!
//! The unique-id facility is the `unique_id` table, one row per
//! table/column counter, advanced with `UPDATE ... RETURNING` inside the
//! caller's transaction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::{Number, Value};

use crate::observability::{log_event_with_fields, Event};
use crate::query::{FilterOp, Query};
use crate::record::{Record, TableDescriptor, TableSchema};

use super::errors::{StorageError, StorageResult};
use super::traits::{PendingOp, StorageSession, UniqueIdSource};

const BACKEND: &str = "sqlite";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const UNIQUE_ID_DDL: &str = "CREATE TABLE IF NOT EXISTS unique_id (
    table_name  TEXT    NOT NULL,
    column_name TEXT    NOT NULL,
    last_id     INTEGER NOT NULL,
    PRIMARY KEY (table_name, column_name)
)";

const NEXT_ID_SQL: &str = "UPDATE unique_id SET last_id = last_id + 1 \
     WHERE table_name = ?1 AND column_name = ?2 RETURNING last_id";

/// Creates the `unique_id` counter table if it does not exist
pub fn install_unique_id(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(UNIQUE_ID_DDL)?;
    log_event_with_fields(Event::UniqueIdInstalled, &[("backend", BACKEND)]);
    Ok(())
}

/// Registers (or reseeds) a counter; the next allocation returns `last_id + 1`
pub fn seed_unique_id(
    conn: &Connection,
    table: &str,
    column: &str,
    last_id: i64,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO unique_id (table_name, column_name, last_id) VALUES (?1, ?2, ?3) \
         ON CONFLICT (table_name, column_name) DO UPDATE SET last_id = excluded.last_id",
        params![table, column, last_id],
    )?;
    Ok(())
}

fn configure(conn: &Connection) -> StorageResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(())
}

/// Connection manager for one SQLite database file
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Opens (creating if needed) the database file and verifies it is usable
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Self {
            path: path.as_ref().to_path_buf(),
        };
        db.raw_connection()?;
        log_event_with_fields(
            Event::DatabaseOpen,
            &[("backend", BACKEND), ("path", &db.path.display().to_string())],
        );
        Ok(db)
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn raw_connection(&self) -> StorageResult<Connection> {
        let conn = Connection::open(&self.path)?;
        configure(&conn)?;
        Ok(conn)
    }

    /// Opens a new session on its own connection
    pub fn connect(&self) -> StorageResult<SqliteSession> {
        Ok(SqliteSession::new(self.raw_connection()?))
    }

    /// Runs DDL or other setup statements outside any session
    pub fn execute_batch(&self, sql: &str) -> StorageResult<()> {
        self.raw_connection()?.execute_batch(sql)?;
        Ok(())
    }

    /// Creates the `unique_id` counter table
    pub fn install_unique_id(&self) -> StorageResult<()> {
        install_unique_id(&self.raw_connection()?)
    }

    /// Registers (or reseeds) a counter
    pub fn seed_unique_id(&self, table: &str, column: &str, last_id: i64) -> StorageResult<()> {
        seed_unique_id(&self.raw_connection()?, table, column, last_id)
    }
}

/// A session over one SQLite connection
#[derive(Debug)]
pub struct SqliteSession {
    conn: Connection,
    in_txn: bool,
    failed: bool,
    pending: Vec<PendingOp>,
}

impl SqliteSession {
    /// Wraps an already configured connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            in_txn: false,
            failed: false,
            pending: Vec::new(),
        }
    }

    /// Session over a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        Ok(Self::new(conn))
    }

    /// The underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Reads a table's columns and foreign keys from the catalog.
    ///
    /// `primary_key` overrides the declared key; without it the table's
    /// first key column is used.
    pub fn describe_table(
        &self,
        table: &str,
        primary_key: Option<&str>,
    ) -> StorageResult<TableSchema> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)? != 0,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(StorageError::table_not_found(table));
        }

        let pk = match primary_key {
            Some(pk) => pk.to_string(),
            None => columns
                .iter()
                .filter(|(_, _, key_seq)| *key_seq > 0)
                .min_by_key(|(_, _, key_seq)| *key_seq)
                .map(|(name, _, _)| name.clone())
                .ok_or_else(|| {
                    StorageError::backend(format!("table {} has no primary key", table))
                })?,
        };

        let mut schema = TableSchema::new(table, pk.as_str());
        for (name, not_null, _) in &columns {
            if *name == pk {
                continue;
            }
            schema = if *not_null {
                schema.not_null(name.as_str())
            } else {
                schema.column(name.as_str())
            };
        }

        let mut stmt = self.conn.prepare(
            "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
        )?;
        let foreign_keys = stmt
            .query_map([table], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        for (column, target, referenced) in foreign_keys {
            schema = schema.foreign_key(column, target, referenced.unwrap_or_default());
        }

        Ok(schema)
    }

    fn usable(&self) -> StorageResult<()> {
        if self.failed {
            return Err(StorageError::transaction_state(
                "transaction failed; it must be rolled back",
            ));
        }
        Ok(())
    }

    fn writable(&self) -> StorageResult<()> {
        if !self.in_txn {
            return Err(StorageError::transaction_state("no transaction is active"));
        }
        self.usable()
    }

    fn flush_pending(&mut self) -> StorageResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let staged = pending.len();
        for op in &pending {
            self.execute_op(op)?;
        }
        if staged > 0 {
            log_event_with_fields(
                Event::SessionFlush,
                &[("backend", BACKEND), ("operations", &staged.to_string())],
            );
        }
        Ok(())
    }

    fn execute_op(&self, op: &PendingOp) -> StorageResult<()> {
        match op {
            PendingOp::Insert { table, record } => {
                let sql = if record.is_empty() {
                    format!("INSERT INTO {} DEFAULT VALUES", quote_ident(table.name()))
                } else {
                    let columns: Vec<String> = record.column_names().map(quote_ident).collect();
                    let marks = vec!["?"; columns.len()].join(", ");
                    format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        quote_ident(table.name()),
                        columns.join(", "),
                        marks
                    )
                };
                let values: Vec<SqlValue> = record.iter().map(|(_, v)| to_sql(v)).collect();
                self.conn.execute(&sql, params_from_iter(values.iter()))?;
            }
            PendingOp::Update { table, key, record } => {
                if record.is_empty() {
                    return Ok(());
                }
                let assignments: Vec<String> = record
                    .column_names()
                    .map(|c| format!("{} = ?", quote_ident(c)))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = ?",
                    quote_ident(table.name()),
                    assignments.join(", "),
                    quote_ident(table.primary_key())
                );
                let mut values: Vec<SqlValue> = record.iter().map(|(_, v)| to_sql(v)).collect();
                values.push(to_sql(key));

                let changed = self.conn.execute(&sql, params_from_iter(values.iter()))?;
                if changed == 0 {
                    log_event_with_fields(
                        Event::UpdateNoMatch,
                        &[("table", table.name()), ("key", &key.to_string())],
                    );
                }
            }
        }
        Ok(())
    }

    fn query_records(&self, sql: &str, values: &[SqlValue]) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(values.iter()))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (index, name) in names.iter().enumerate() {
                record.insert(name.clone(), from_sql(row.get_ref(index)?));
            }
            records.push(record);
        }
        Ok(records)
    }
}

impl StorageSession for SqliteSession {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn begin(&mut self) -> StorageResult<()> {
        if self.in_txn {
            return Err(StorageError::transaction_state(
                "a transaction is already active",
            ));
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_txn = true;
        self.failed = false;
        self.pending.clear();
        log_event_with_fields(Event::TransactionBegin, &[("backend", BACKEND)]);
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.writable()?;
        let result = self
            .flush_pending()
            .and_then(|_| self.conn.execute_batch("COMMIT").map_err(StorageError::from));
        if let Err(e) = result {
            self.failed = true;
            return Err(e);
        }
        self.in_txn = false;
        log_event_with_fields(Event::TransactionCommit, &[("backend", BACKEND)]);
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        self.pending.clear();
        if !self.in_txn {
            return Ok(());
        }
        // SQLite may already have rolled back on some errors
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        self.in_txn = false;
        self.failed = false;
        log_event_with_fields(Event::TransactionRollback, &[("backend", BACKEND)]);
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.in_txn
    }

    fn count(&mut self, query: &Query) -> StorageResult<u64> {
        self.usable()?;
        let mut values = Vec::new();
        let sql = format!(
            "SELECT COUNT(*) FROM {}{}",
            quote_ident(query.table_name()),
            where_clause(query, &mut values)
        );
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn fetch(&mut self, query: &Query, offset: u64, limit: u64) -> StorageResult<Vec<Record>> {
        self.usable()?;
        let mut values = Vec::new();
        let filter = where_clause(query, &mut values);
        let sql = format!(
            "SELECT * FROM {}{}{} LIMIT ? OFFSET ?",
            quote_ident(query.table_name()),
            filter,
            order_clause(query)
        );
        values.push(SqlValue::Integer(clamp_i64(limit)));
        values.push(SqlValue::Integer(clamp_i64(offset)));
        self.query_records(&sql, &values)
    }

    fn insert(&mut self, table: &TableDescriptor, record: &Record) -> StorageResult<()> {
        self.writable()?;
        self.pending.push(PendingOp::Insert {
            table: table.clone(),
            record: record.clone(),
        });
        Ok(())
    }

    fn update_by_key(
        &mut self,
        table: &TableDescriptor,
        key: &Value,
        record: &Record,
    ) -> StorageResult<()> {
        self.writable()?;
        self.pending.push(PendingOp::Update {
            table: table.clone(),
            key: key.clone(),
            record: record.clone(),
        });
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.writable()?;
        let result = self.flush_pending();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn raw_execute(&mut self, sql: &str) -> StorageResult<u64> {
        self.usable()?;
        let changed = self.conn.execute(sql, [])?;
        Ok(changed as u64)
    }

    fn raw_query(&mut self, sql: &str) -> StorageResult<Vec<Record>> {
        self.usable()?;
        self.query_records(sql, &[])
    }
}

impl UniqueIdSource for SqliteSession {
    fn next_id(&mut self, table: &str, column: &str) -> StorageResult<Option<i64>> {
        self.usable()?;
        let mut stmt = self.conn.prepare_cached(NEXT_ID_SQL)?;
        let id = stmt
            .query_row(params![table, column], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(id)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn where_clause(query: &Query, values: &mut Vec<SqlValue>) -> String {
    if query.predicates().is_empty() {
        return String::new();
    }
    let terms: Vec<String> = query
        .predicates()
        .iter()
        .map(|pred| {
            let bound = match &pred.op {
                FilterOp::Eq(v)
                | FilterOp::Gte(v)
                | FilterOp::Gt(v)
                | FilterOp::Lte(v)
                | FilterOp::Lt(v) => to_sql(v),
                FilterOp::Like(pattern) => SqlValue::Text(pattern.clone()),
            };
            values.push(bound);
            format!("{} {} ?", quote_ident(&pred.field), pred.op.sql_operator())
        })
        .collect();
    format!(" WHERE {}", terms.join(" AND "))
}

fn order_clause(query: &Query) -> String {
    if query.sort().is_empty() {
        return String::new();
    }
    let keys: Vec<String> = query
        .sort()
        .iter()
        .map(|s| format!("{} {}", quote_ident(&s.field), s.direction.as_sql()))
        .collect();
    format!(" ORDER BY {}", keys.join(", "))
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Predicate, SortSpec};
    use crate::session::StorageErrorCode;
    use serde_json::json;

    fn session() -> SqliteSession {
        let mut session = SqliteSession::open_in_memory().unwrap();
        session
            .raw_execute("CREATE TABLE departments (dept_no TEXT PRIMARY KEY, dept_name TEXT NOT NULL)")
            .unwrap();
        session
            .raw_execute(
                "CREATE TABLE employees (
                    emp_no INTEGER PRIMARY KEY,
                    first_name TEXT NOT NULL,
                    dept_no TEXT REFERENCES departments (dept_no)
                )",
            )
            .unwrap();
        install_unique_id(session.connection()).unwrap();
        session
    }

    fn employees() -> TableDescriptor {
        TableDescriptor::new("employees", "emp_no")
    }

    fn emp(emp_no: i64, name: &str) -> Record {
        Record::new().with("emp_no", emp_no).with("first_name", name)
    }

    #[test]
    fn test_insert_staged_until_flush() {
        let mut session = session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        assert_eq!(session.count(&Query::table("employees")).unwrap(), 0);
        session.flush().unwrap();
        assert_eq!(session.count(&Query::table("employees")).unwrap(), 1);
        session.commit().unwrap();
        assert!(!session.in_transaction());
    }

    #[test]
    fn test_duplicate_key_is_constraint_violation() {
        let mut session = session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(7, "A")).unwrap();
        session.insert(&employees(), &emp(7, "B")).unwrap();

        let err = session.flush().unwrap_err();
        assert!(err.is_constraint_violation(), "got {}", err);
        assert_eq!(
            session.count(&Query::table("employees")).unwrap_err().code(),
            StorageErrorCode::TransactionState
        );

        session.rollback().unwrap();
        assert_eq!(session.count(&Query::table("employees")).unwrap(), 0);
    }

    #[test]
    fn test_not_null_and_foreign_key() {
        let mut session = session();
        session.begin().unwrap();
        session
            .insert(&employees(), &Record::new().with("emp_no", 1))
            .unwrap();
        assert!(session.flush().unwrap_err().is_constraint_violation());
        session.rollback().unwrap();

        session.begin().unwrap();
        session
            .insert(&employees(), &emp(1, "A").with("dept_no", "d404"))
            .unwrap();
        assert!(session.flush().unwrap_err().is_constraint_violation());
        session.rollback().unwrap();
    }

    #[test]
    fn test_update_by_key() {
        let mut session = session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        session
            .update_by_key(&employees(), &json!(1), &emp(1, "Alpha"))
            .unwrap();
        session.commit().unwrap();

        let rows = session.raw_query("SELECT first_name FROM employees").unwrap();
        assert_eq!(rows[0].get("first_name"), Some(&json!("Alpha")));
    }

    #[test]
    fn test_fetch_window() {
        let mut session = session();
        session.begin().unwrap();
        for (id, name) in [(5, "Joan"), (3, "Dan"), (4, "Nasir"), (1, "Jan")] {
            session.insert(&employees(), &emp(id, name)).unwrap();
        }
        session.commit().unwrap();

        let query = Query::table("employees")
            .filter(Predicate::like("first_name", "%AN"))
            .order_by(SortSpec::asc("emp_no"));
        assert_eq!(session.count(&query).unwrap(), 3);

        let rows = session.fetch(&query, 1, 5).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.get("emp_no").cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(3), json!(5)]);
        assert_eq!(
            rows[0].column_names().collect::<Vec<_>>(),
            vec!["emp_no", "first_name", "dept_no"]
        );
    }

    #[test]
    fn test_next_id() {
        let mut session = session();
        assert_eq!(session.next_id("employees", "emp_no").unwrap(), None);

        seed_unique_id(session.connection(), "employees", "emp_no", 499_999).unwrap();
        session.begin().unwrap();
        assert_eq!(session.next_id("employees", "emp_no").unwrap(), Some(500_000));
        assert_eq!(session.next_id("employees", "emp_no").unwrap(), Some(500_001));
        session.commit().unwrap();
    }

    #[test]
    fn test_writes_require_transaction() {
        let mut session = session();
        let err = session.insert(&employees(), &emp(1, "A")).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::TransactionState);
        assert!(session.rollback().is_ok());
    }

    #[test]
    fn test_describe_table() {
        let session = session();
        let schema = session.describe_table("employees", None).unwrap();
        assert_eq!(schema.primary_key(), "emp_no");
        assert!(!schema.column_def("first_name").unwrap().nullable);
        assert!(schema.column_def("dept_no").unwrap().nullable);
        assert_eq!(schema.foreign_keys()[0].references_table, "departments");

        let err = session.describe_table("salaries", None).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::TableNotFound);
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(to_sql(&json!(true)), SqlValue::Integer(1));
        assert_eq!(to_sql(&json!(2.5)), SqlValue::Real(2.5));
        assert_eq!(to_sql(&json!({"a": 1})), SqlValue::Text("{\"a\":1}".to_string()));
        assert_eq!(from_sql(ValueRef::Integer(3)), json!(3));
        assert_eq!(from_sql(ValueRef::Text(b"x")), json!("x"));
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
