//! Storage session contracts
//!
//! A session is one connection with at most one open transaction. Inserts and
//! updates are staged and only reach the store on `flush` (or `commit`, which
//! flushes first), so constraint violations surface at a known point.
//!
//! After a failed flush the transaction is poisoned: every call except
//! `rollback` fails with `TW_TRANSACTION_STATE` until the caller rolls back.

use serde_json::Value;

use crate::query::Query;
use crate::record::{Record, TableDescriptor};

use super::errors::StorageResult;

/// An active transactional connection to a relational store
pub trait StorageSession {
    /// Short backend name for logs
    fn backend(&self) -> &'static str;

    /// Opens a transaction. Fails if one is already open.
    fn begin(&mut self) -> StorageResult<()>;

    /// Flushes staged writes then commits
    fn commit(&mut self) -> StorageResult<()>;

    /// Discards staged writes and rolls back
    fn rollback(&mut self) -> StorageResult<()>;

    /// Whether a transaction is open
    fn in_transaction(&self) -> bool;

    /// Number of rows matching the query, ignoring any window
    fn count(&mut self, query: &Query) -> StorageResult<u64>;

    /// One window of matching rows, in query order
    fn fetch(&mut self, query: &Query, offset: u64, limit: u64) -> StorageResult<Vec<Record>>;

    /// Stages an insert. Requires an open transaction.
    fn insert(&mut self, table: &TableDescriptor, record: &Record) -> StorageResult<()>;

    /// Stages an update of the row whose primary key equals `key`.
    /// Requires an open transaction.
    fn update_by_key(
        &mut self,
        table: &TableDescriptor,
        key: &Value,
        record: &Record,
    ) -> StorageResult<()>;

    /// Applies staged writes, raising deferred constraint violations
    fn flush(&mut self) -> StorageResult<()>;

    /// Executes a raw statement, returning the affected row count
    fn raw_execute(&mut self, sql: &str) -> StorageResult<u64>;

    /// Runs a raw query
    fn raw_query(&mut self, sql: &str) -> StorageResult<Vec<Record>>;
}

/// Store-side counter facility producing unique integers per table/column
pub trait UniqueIdSource {
    /// Next value for the counter, or `None` when no value can be produced
    fn next_id(&mut self, table: &str, column: &str) -> StorageResult<Option<i64>>;
}

/// A write staged on a session, applied at flush
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingOp {
    Insert {
        table: TableDescriptor,
        record: Record,
    },
    Update {
        table: TableDescriptor,
        key: Value,
        record: Record,
    },
}

impl PendingOp {
    pub(crate) fn table(&self) -> &TableDescriptor {
        match self {
            PendingOp::Insert { table, .. } | PendingOp::Update { table, .. } => table,
        }
    }
}
