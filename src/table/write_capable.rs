//! Write-capable table facade
//!
//! Adds raw statement execution and batch writes to the read-only surface.
//! Batch writes never commit; pair them with `finalise_transaction`.

use serde_json::Value;

use crate::observability::ObservationScope;
use crate::paginator::{PaginateResult, Page};
use crate::query::Query;
use crate::record::{Batch, TableDescriptor, TableSchema};
use crate::session::{StorageSession, UniqueIdSource};
use crate::status::{messages, ResultStatus};
use crate::writer::{TransactionalWriter, WriteOutcome, WriteResult};

use super::read_only::{finish_scope, ReadOnlyTable};
use super::transaction::run_with_session;

/// A table that accepts inserts and updates
#[derive(Debug, Clone)]
pub struct WriteCapableTable {
    read: ReadOnlyTable,
    writer: TransactionalWriter,
}

impl WriteCapableTable {
    pub fn new(schema: TableSchema) -> Self {
        let writer = TransactionalWriter::new(schema.descriptor().clone());
        Self {
            read: ReadOnlyTable::new(schema),
            writer,
        }
    }

    pub fn schema(&self) -> &TableSchema {
        self.read.schema()
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        self.read.descriptor()
    }

    pub fn query(&self) -> Query {
        self.read.query()
    }

    /// The read-only view of this table
    pub fn as_read_only(&self) -> &ReadOnlyTable {
        &self.read
    }

    pub fn run_select_sql<S: StorageSession>(
        &self,
        session: &mut S,
        sql: &str,
        auto_session: bool,
    ) -> ResultStatus {
        self.read.run_select_sql(session, sql, auto_session)
    }

    pub fn paginate<S: StorageSession>(
        &self,
        session: &mut S,
        query: &Query,
        page: u64,
        per_page: u64,
    ) -> PaginateResult<Page> {
        self.read.paginate(session, query, page, per_page)
    }

    /// Runs an UPDATE or DELETE statement. Success carries an empty text.
    pub fn run_execute_sql<S: StorageSession>(
        &self,
        session: &mut S,
        sql: &str,
        auto_session: bool,
    ) -> ResultStatus {
        let scope = ObservationScope::with_fields("EXECUTE_SQL", &[("table", self.schema().name())]);
        let status = run_with_session(session, auto_session, "EXECUTE_SQL_FAILED", |session| {
            session.raw_execute(sql)?;
            Ok(ResultStatus::ok(""))
        });
        finish_scope(scope, &status);
        status
    }

    /// Writes a batch inside the open transaction, returning the raw outcome
    pub fn write<S>(&self, session: &mut S, batch: Batch) -> WriteResult<WriteOutcome>
    where
        S: StorageSession + UniqueIdSource,
    {
        self.writer.write(batch, session)
    }

    /// Writes a batch inside the open transaction.
    ///
    /// Success data holds `<table>_new_list` and `<table>_updated_list`.
    /// On failure the transaction is left for the caller to roll back.
    pub fn write_to_database<S>(&self, session: &mut S, batch: Batch) -> ResultStatus
    where
        S: StorageSession + UniqueIdSource,
    {
        match self.write(session, batch) {
            Ok(outcome) => ResultStatus::make_status(
                messages::DATA_SAVED,
                Some(outcome.to_data(self.schema().name())),
            ),
            Err(e) => ResultStatus::from(&e),
        }
    }

    /// Validates a JSON array against the table schema, then writes it
    pub fn write_json<S>(&self, session: &mut S, data: Value) -> ResultStatus
    where
        S: StorageSession + UniqueIdSource,
    {
        match Batch::from_json(data, self.schema()) {
            Ok(batch) => self.write_to_database(session, batch),
            Err(e) => ResultStatus::from(&e),
        }
    }
}
