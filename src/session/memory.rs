//! In-process transactional store
//!
//! `MemoryStore` holds committed tables and the unique-id counters behind one
//! mutex. A `MemorySession` snapshots the committed tables on `begin`, applies
//! staged writes to its snapshot on `flush`, and on `commit` replays every
//! applied write against the current committed tables under the store lock.
//! A replay that breaks a constraint fails the commit and nothing is
//! published, so overlapping sessions never overwrite each other's rows.
//!
//! Counters live outside transactions (sequence semantics): a value handed
//! out is never handed out again, even if the transaction rolls back.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use crate::observability::{log_event_with_fields, Event};
use crate::query::{compare_values, sort_records, PredicateFilter, Query};
use crate::record::{Record, TableDescriptor, TableSchema};

use super::errors::{StorageError, StorageResult};
use super::traits::{PendingOp, StorageSession, UniqueIdSource};

const BACKEND: &str = "memory";

#[derive(Debug, Clone)]
struct MemTable {
    schema: TableSchema,
    rows: Vec<Record>,
}

type Tables = BTreeMap<String, MemTable>;

#[derive(Debug, Default)]
struct StoreState {
    tables: Tables,
    counters: HashMap<(String, String), i64>,
}

/// Shared in-process store. Cloning shares the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| StorageError::backend("memory store lock poisoned"))
    }

    /// Creates a table from its schema
    pub fn create_table(&self, schema: TableSchema) -> StorageResult<()> {
        let mut state = self.lock()?;
        if state.tables.contains_key(schema.name()) {
            return Err(StorageError::backend(format!(
                "table {} already exists",
                schema.name()
            )));
        }
        state.tables.insert(
            schema.name().to_string(),
            MemTable {
                schema,
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    /// Registers (or reseeds) the counter for a table/column.
    ///
    /// The next allocation returns `last_id + 1`.
    pub fn register_counter(&self, table: &str, column: &str, last_id: i64) -> StorageResult<()> {
        let mut state = self.lock()?;
        state
            .counters
            .insert((table.to_string(), column.to_string()), last_id);
        Ok(())
    }

    /// Committed rows of a table, in storage order
    pub fn rows(&self, table: &str) -> StorageResult<Vec<Record>> {
        let state = self.lock()?;
        state
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .ok_or_else(|| StorageError::table_not_found(table))
    }

    /// Replays `ops` over the committed tables, all or nothing.
    /// Returns the number of tables written.
    fn publish(&self, ops: &[PendingOp]) -> StorageResult<usize> {
        let mut state = self.lock()?;
        let mut tables = state.tables.clone();
        let mut written = BTreeSet::new();
        for op in ops {
            apply(&mut tables, op)?;
            written.insert(op.table().name());
        }
        state.tables = tables;
        Ok(written.len())
    }

    /// Opens a new session on this store
    pub fn session(&self) -> MemorySession {
        MemorySession {
            store: self.clone(),
            txn: None,
        }
    }
}

#[derive(Debug)]
struct Transaction {
    tables: Tables,
    applied: Vec<PendingOp>,
    pending: Vec<PendingOp>,
    failed: bool,
}

impl Transaction {
    fn flush(&mut self) -> StorageResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let staged = pending.len();
        for op in pending {
            apply(&mut self.tables, &op)?;
            self.applied.push(op);
        }
        if staged > 0 {
            log_event_with_fields(
                Event::SessionFlush,
                &[("backend", BACKEND), ("operations", &staged.to_string())],
            );
        }
        Ok(())
    }
}

/// A session over a `MemoryStore`
#[derive(Debug)]
pub struct MemorySession {
    store: MemoryStore,
    txn: Option<Transaction>,
}

impl MemorySession {
    fn open_txn(&mut self) -> StorageResult<&mut Transaction> {
        match self.txn.as_mut() {
            None => Err(StorageError::transaction_state("no transaction is active")),
            Some(txn) if txn.failed => Err(failed_transaction()),
            Some(txn) => Ok(txn),
        }
    }

    fn select(&self, query: &Query) -> StorageResult<Vec<Record>> {
        match &self.txn {
            Some(txn) if txn.failed => Err(failed_transaction()),
            Some(txn) => select_rows(&txn.tables, query),
            None => {
                let state = self.store.lock()?;
                select_rows(&state.tables, query)
            }
        }
    }
}

fn failed_transaction() -> StorageError {
    StorageError::transaction_state("transaction failed; it must be rolled back")
}

impl StorageSession for MemorySession {
    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn begin(&mut self) -> StorageResult<()> {
        if self.txn.is_some() {
            return Err(StorageError::transaction_state(
                "a transaction is already active",
            ));
        }
        let tables = self.store.lock()?.tables.clone();
        self.txn = Some(Transaction {
            tables,
            applied: Vec::new(),
            pending: Vec::new(),
            failed: false,
        });
        log_event_with_fields(Event::TransactionBegin, &[("backend", BACKEND)]);
        Ok(())
    }

    fn commit(&mut self) -> StorageResult<()> {
        self.flush()?;

        let Some(mut txn) = self.txn.take() else {
            return Err(StorageError::transaction_state("no transaction is active"));
        };
        let written = match self.store.publish(&txn.applied) {
            Ok(written) => written,
            Err(e) => {
                txn.failed = true;
                self.txn = Some(txn);
                return Err(e);
            }
        };
        log_event_with_fields(
            Event::TransactionCommit,
            &[("backend", BACKEND), ("tables", &written.to_string())],
        );
        Ok(())
    }

    fn rollback(&mut self) -> StorageResult<()> {
        if self.txn.take().is_some() {
            log_event_with_fields(Event::TransactionRollback, &[("backend", BACKEND)]);
        }
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.txn.is_some()
    }

    fn count(&mut self, query: &Query) -> StorageResult<u64> {
        Ok(self.select(query)?.len() as u64)
    }

    fn fetch(&mut self, query: &Query, offset: u64, limit: u64) -> StorageResult<Vec<Record>> {
        let rows = self.select(query)?;
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect())
    }

    fn insert(&mut self, table: &TableDescriptor, record: &Record) -> StorageResult<()> {
        self.open_txn()?.pending.push(PendingOp::Insert {
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
        self.open_txn()?.pending.push(PendingOp::Update {
            table: table.clone(),
            key: key.clone(),
            record: record.clone(),
        });
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        let txn = self.open_txn()?;
        let result = txn.flush();
        if result.is_err() {
            txn.failed = true;
        }
        result
    }

    fn raw_execute(&mut self, _sql: &str) -> StorageResult<u64> {
        Err(StorageError::unsupported("raw SQL execution", BACKEND))
    }

    fn raw_query(&mut self, _sql: &str) -> StorageResult<Vec<Record>> {
        Err(StorageError::unsupported("raw SQL queries", BACKEND))
    }
}

impl UniqueIdSource for MemorySession {
    fn next_id(&mut self, table: &str, column: &str) -> StorageResult<Option<i64>> {
        let mut state = self.store.lock()?;
        Ok(state
            .counters
            .get_mut(&(table.to_string(), column.to_string()))
            .map(|last| {
                *last += 1;
                *last
            }))
    }
}

fn same_value(a: Option<&Value>, b: &Value) -> bool {
    matches!(a, Some(a) if compare_values(a, b) == Some(std::cmp::Ordering::Equal))
}

fn lookup<'a>(tables: &'a Tables, name: &str) -> StorageResult<&'a MemTable> {
    tables
        .get(name)
        .ok_or_else(|| StorageError::table_not_found(name))
}

fn check_columns(schema: &TableSchema, record: &Record) -> StorageResult<()> {
    match record.column_names().find(|c| !schema.has_column(c)) {
        Some(column) => Err(StorageError::backend(format!(
            "table {} has no column named {}",
            schema.name(),
            column
        ))),
        None => Ok(()),
    }
}

fn check_not_null(schema: &TableSchema, row: &Record) -> StorageResult<()> {
    for column in schema.columns().iter().filter(|c| !c.nullable) {
        if row.get(&column.name).map_or(true, Value::is_null) {
            return Err(StorageError::constraint_violation(format!(
                "NOT NULL constraint failed: {}.{}",
                schema.name(),
                column.name
            )));
        }
    }
    Ok(())
}

fn check_foreign_keys(tables: &Tables, schema: &TableSchema, row: &Record) -> StorageResult<()> {
    for fk in schema.foreign_keys() {
        let value = match row.get(&fk.column) {
            Some(v) if !v.is_null() => v,
            _ => continue,
        };
        let parent = lookup(tables, &fk.references_table)?;
        if !parent
            .rows
            .iter()
            .any(|r| same_value(r.get(&fk.references_column), value))
        {
            return Err(StorageError::constraint_violation(
                "FOREIGN KEY constraint failed",
            ));
        }
    }
    Ok(())
}

fn check_descriptor(schema: &TableSchema, table: &TableDescriptor) -> StorageResult<()> {
    if schema.primary_key() != table.primary_key() {
        return Err(StorageError::backend(format!(
            "table {} has primary key {}, not {}",
            schema.name(),
            schema.primary_key(),
            table.primary_key()
        )));
    }
    Ok(())
}

fn unique_violation(schema: &TableSchema) -> StorageError {
    StorageError::constraint_violation(format!(
        "UNIQUE constraint failed: {}.{}",
        schema.name(),
        schema.primary_key()
    ))
}

fn apply(tables: &mut Tables, op: &PendingOp) -> StorageResult<()> {
    match op {
        PendingOp::Insert { table, record } => apply_insert(tables, table, record),
        PendingOp::Update { table, key, record } => apply_update(tables, table, key, record),
    }
}

fn apply_insert(tables: &mut Tables, table: &TableDescriptor, record: &Record) -> StorageResult<()> {
    let mem = lookup(tables, table.name())?;
    let schema = &mem.schema;
    check_descriptor(schema, table)?;
    check_columns(schema, record)?;

    let row: Record = schema
        .columns()
        .iter()
        .map(|c| {
            let value = record.get(&c.name).cloned().unwrap_or(Value::Null);
            (c.name.clone(), value)
        })
        .collect();

    check_not_null(schema, &row)?;
    let key = row.get(schema.primary_key()).cloned().unwrap_or(Value::Null);
    if key.is_null() {
        return Err(StorageError::constraint_violation(format!(
            "NOT NULL constraint failed: {}.{}",
            schema.name(),
            schema.primary_key()
        )));
    }
    if mem
        .rows
        .iter()
        .any(|r| same_value(r.get(schema.primary_key()), &key))
    {
        return Err(unique_violation(schema));
    }
    check_foreign_keys(tables, schema, &row)?;

    if let Some(mem) = tables.get_mut(table.name()) {
        mem.rows.push(row);
    }
    Ok(())
}

fn apply_update(
    tables: &mut Tables,
    table: &TableDescriptor,
    key: &Value,
    record: &Record,
) -> StorageResult<()> {
    let mem = lookup(tables, table.name())?;
    let schema = &mem.schema;
    check_descriptor(schema, table)?;
    check_columns(schema, record)?;
    let pk = schema.primary_key();

    let matched: Vec<usize> = mem
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| same_value(r.get(pk), key))
        .map(|(i, _)| i)
        .collect();

    if matched.is_empty() {
        log_event_with_fields(
            Event::UpdateNoMatch,
            &[("table", table.name()), ("key", &key.to_string())],
        );
        return Ok(());
    }

    if let Some(new_key) = record.get(pk) {
        let rekeyed = !same_value(Some(new_key), key);
        if rekeyed && mem.rows.iter().any(|r| same_value(r.get(pk), new_key)) {
            return Err(unique_violation(schema));
        }
    }

    let mut updated = Vec::with_capacity(matched.len());
    for index in matched {
        let mut row = mem.rows[index].clone();
        for (column, value) in record.iter() {
            row.insert(column, value.clone());
        }
        check_not_null(schema, &row)?;
        check_foreign_keys(tables, schema, &row)?;
        updated.push((index, row));
    }

    if let Some(mem) = tables.get_mut(table.name()) {
        for (index, row) in updated {
            mem.rows[index] = row;
        }
    }
    Ok(())
}

fn select_rows(tables: &Tables, query: &Query) -> StorageResult<Vec<Record>> {
    let mem = lookup(tables, query.table_name())?;

    let referenced = query
        .predicates()
        .iter()
        .map(|p| p.field.as_str())
        .chain(query.sort().iter().map(|s| s.field.as_str()));
    for field in referenced {
        if !mem.schema.has_column(field) {
            return Err(StorageError::backend(format!("no such column: {}", field)));
        }
    }

    let mut rows: Vec<Record> = mem
        .rows
        .iter()
        .filter(|r| PredicateFilter::matches(r, query.predicates()))
        .cloned()
        .collect();
    sort_records(&mut rows, query.sort());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Predicate, SortSpec};
    use crate::session::StorageErrorCode;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_table(
                TableSchema::new("departments", "dept_no").not_null("dept_name"),
            )
            .unwrap();
        store
            .create_table(
                TableSchema::new("employees", "emp_no")
                    .not_null("first_name")
                    .column("dept_no")
                    .foreign_key("dept_no", "departments", "dept_no"),
            )
            .unwrap();
        store
    }

    fn employees() -> TableDescriptor {
        TableDescriptor::new("employees", "emp_no")
    }

    fn emp(emp_no: i64, name: &str) -> Record {
        Record::new().with("emp_no", emp_no).with("first_name", name)
    }

    #[test]
    fn test_writes_require_transaction() {
        let mut session = store().session();
        let err = session.insert(&employees(), &emp(1, "A")).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::TransactionState);
    }

    #[test]
    fn test_begin_twice_fails() {
        let mut session = store().session();
        session.begin().unwrap();
        assert_eq!(
            session.begin().unwrap_err().code(),
            StorageErrorCode::TransactionState
        );
    }

    #[test]
    fn test_insert_is_staged_until_flush() {
        let mut session = store().session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();

        let all = Query::table("employees");
        assert_eq!(session.count(&all).unwrap(), 0);
        session.flush().unwrap();
        assert_eq!(session.count(&all).unwrap(), 1);
    }

    #[test]
    fn test_commit_publishes_rollback_discards() {
        let store = store();
        let mut session = store.session();

        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        session.commit().unwrap();
        assert_eq!(store.rows("employees").unwrap().len(), 1);

        session.begin().unwrap();
        session.insert(&employees(), &emp(2, "B")).unwrap();
        session.flush().unwrap();
        session.rollback().unwrap();
        assert_eq!(store.rows("employees").unwrap().len(), 1);
        assert!(!session.in_transaction());
    }

    #[test]
    fn test_inserted_row_has_all_columns_in_order() {
        let store = store();
        let mut session = store.session();
        session.begin().unwrap();
        session
            .insert(&employees(), &Record::new().with("first_name", "A").with("emp_no", 3))
            .unwrap();
        session.commit().unwrap();

        let row = &store.rows("employees").unwrap()[0];
        let names: Vec<_> = row.column_names().collect();
        assert_eq!(names, vec!["emp_no", "first_name", "dept_no"]);
        assert_eq!(row.get("dept_no"), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_key_fails_at_flush_and_poisons() {
        let mut session = store().session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        session.insert(&employees(), &emp(1, "B")).unwrap();

        let err = session.flush().unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.message(), "UNIQUE constraint failed: employees.emp_no");

        let err = session.count(&Query::table("employees")).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::TransactionState);
        assert!(session.commit().is_err());
        session.rollback().unwrap();
        assert_eq!(session.count(&Query::table("employees")).unwrap(), 0);
    }

    #[test]
    fn test_not_null_violation() {
        let mut session = store().session();
        session.begin().unwrap();
        session
            .insert(&employees(), &Record::new().with("emp_no", 1))
            .unwrap();
        let err = session.flush().unwrap_err();
        assert_eq!(err.message(), "NOT NULL constraint failed: employees.first_name");
    }

    #[test]
    fn test_foreign_key_violation() {
        let mut session = store().session();
        session.begin().unwrap();
        session
            .insert(&employees(), &emp(1, "A").with("dept_no", "d009"))
            .unwrap();
        let err = session.flush().unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.message(), "FOREIGN KEY constraint failed");
    }

    #[test]
    fn test_foreign_key_satisfied_within_transaction() {
        let mut session = store().session();
        session.begin().unwrap();
        session
            .insert(
                &TableDescriptor::new("departments", "dept_no"),
                &Record::new().with("dept_no", "d001").with("dept_name", "Marketing"),
            )
            .unwrap();
        session
            .insert(&employees(), &emp(1, "A").with("dept_no", "d001"))
            .unwrap();
        session.commit().unwrap();
    }

    #[test]
    fn test_unknown_column_fails_at_flush() {
        let mut session = store().session();
        session.begin().unwrap();
        session
            .insert(&employees(), &emp(1, "A").with("salary", 10))
            .unwrap();
        let err = session.flush().unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::Backend);
    }

    #[test]
    fn test_update_by_key() {
        let store = store();
        let mut session = store.session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        session.insert(&employees(), &emp(2, "B")).unwrap();
        session
            .update_by_key(&employees(), &json!(2), &emp(2, "Bee"))
            .unwrap();
        session
            .update_by_key(&employees(), &json!(99), &emp(99, "Nobody"))
            .unwrap();
        session.commit().unwrap();

        let rows = store.rows("employees").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("first_name"), Some(&json!("A")));
        assert_eq!(rows[1].get("first_name"), Some(&json!("Bee")));
    }

    #[test]
    fn test_update_rekey_conflict() {
        let mut session = store().session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        session.insert(&employees(), &emp(2, "B")).unwrap();
        session
            .update_by_key(&employees(), &json!(2), &emp(1, "B"))
            .unwrap();
        assert!(session.flush().unwrap_err().is_constraint_violation());
    }

    #[test]
    fn test_fetch_window_filtered_sorted() {
        let mut session = store().session();
        session.begin().unwrap();
        for (id, name) in [(5, "Joan"), (3, "Dan"), (4, "Nasir"), (1, "Jan")] {
            session.insert(&employees(), &emp(id, name)).unwrap();
        }
        session.flush().unwrap();

        let query = Query::table("employees")
            .filter(Predicate::like("first_name", "%an"))
            .order_by(SortSpec::asc("emp_no"));
        assert_eq!(session.count(&query).unwrap(), 3);

        let page = session.fetch(&query, 1, 5).unwrap();
        let ids: Vec<_> = page.iter().map(|r| r.get("emp_no").cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(3), json!(5)]);
    }

    #[test]
    fn test_select_unknown_table_and_column() {
        let mut session = store().session();
        let err = session.count(&Query::table("salaries")).unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::TableNotFound);

        let query = Query::table("employees").filter(Predicate::eq("salary", 1));
        assert_eq!(session.count(&query).unwrap_err().code(), StorageErrorCode::Backend);
    }

    #[test]
    fn test_counter_is_sequence() {
        let store = store();
        store.register_counter("employees", "emp_no", 500).unwrap();

        let mut a = store.session();
        let mut b = store.session();
        a.begin().unwrap();
        assert_eq!(a.next_id("employees", "emp_no").unwrap(), Some(501));
        a.rollback().unwrap();
        assert_eq!(b.next_id("employees", "emp_no").unwrap(), Some(502));
        assert_eq!(b.next_id("employees", "missing").unwrap(), None);
    }

    #[test]
    fn test_overlapping_commit_with_same_key_fails() {
        let store = store();
        let mut a = store.session();
        let mut b = store.session();
        a.begin().unwrap();
        b.begin().unwrap();

        a.insert(&employees(), &emp(1, "A")).unwrap();
        a.commit().unwrap();

        b.insert(&employees(), &emp(1, "B")).unwrap();
        b.flush().unwrap();
        let err = b.commit().unwrap_err();
        assert!(err.is_constraint_violation());
        assert_eq!(err.message(), "UNIQUE constraint failed: employees.emp_no");

        assert!(b.in_transaction());
        assert_eq!(b.commit().unwrap_err().code(), StorageErrorCode::TransactionState);
        b.rollback().unwrap();

        let rows = store.rows("employees").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("first_name"), Some(&json!("A")));
    }

    #[test]
    fn test_overlapping_commits_keep_both_rows() {
        let store = store();
        let mut a = store.session();
        let mut b = store.session();
        a.begin().unwrap();
        b.begin().unwrap();

        a.insert(&employees(), &emp(1, "A")).unwrap();
        b.insert(&employees(), &emp(2, "B")).unwrap();
        a.commit().unwrap();
        b.commit().unwrap();

        let rows = store.rows("employees").unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.key_as_i64("emp_no")).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_fetch_huge_window() {
        let mut session = store().session();
        session.begin().unwrap();
        session.insert(&employees(), &emp(1, "A")).unwrap();
        session.flush().unwrap();

        let all = Query::table("employees");
        assert_eq!(session.fetch(&all, 0, u64::MAX).unwrap().len(), 1);
        assert!(session.fetch(&all, u64::MAX, 10).unwrap().is_empty());
    }

    #[test]
    fn test_raw_sql_unsupported() {
        let mut session = store().session();
        let err = session.raw_query("select 1").unwrap_err();
        assert_eq!(err.code(), StorageErrorCode::Unsupported);
        assert!(session.raw_execute("delete from employees").is_err());
    }
}
