//! Read-only table facade

use crate::observability::ObservationScope;
use crate::paginator::{PaginateResult, Page, Paginator};
use crate::query::Query;
use crate::record::{Record, TableDescriptor, TableSchema};
use crate::session::StorageSession;
use crate::status::{messages, ResultStatus};

use super::transaction::run_with_session;

/// A table that is only ever queried
#[derive(Debug, Clone)]
pub struct ReadOnlyTable {
    schema: TableSchema,
}

impl ReadOnlyTable {
    pub fn new(schema: TableSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        self.schema.descriptor()
    }

    /// A query over this table, to refine with filters and ordering
    pub fn query(&self) -> Query {
        Query::table(self.schema.name())
    }

    /// Runs a SELECT statement.
    ///
    /// An empty result is still a success, with the no-data text and no
    /// data. With `auto_session` the call owns the transaction if none is
    /// open: committed on success, rolled back on failure.
    pub fn run_select_sql<S: StorageSession>(
        &self,
        session: &mut S,
        sql: &str,
        auto_session: bool,
    ) -> ResultStatus {
        let scope = ObservationScope::with_fields("SELECT_SQL", &[("table", self.schema.name())]);
        let status = run_with_session(session, auto_session, "SELECT_SQL_FAILED", |session| {
            let rows = session.raw_query(sql)?;
            if rows.is_empty() {
                return Ok(ResultStatus::ok(messages::NO_DATA));
            }
            let data = rows.iter().map(Record::as_value).collect();
            Ok(ResultStatus::make_status(
                messages::DATA_RETRIEVED,
                Some(serde_json::Value::Array(data)),
            ))
        });
        finish_scope(scope, &status);
        status
    }

    /// One page of `query`; see `Paginator::paginate`
    pub fn paginate<S: StorageSession>(
        &self,
        session: &mut S,
        query: &Query,
        page: u64,
        per_page: u64,
    ) -> PaginateResult<Page> {
        Paginator::paginate(session, query, page, per_page)
    }
}

pub(super) fn finish_scope(scope: ObservationScope<'_>, status: &ResultStatus) {
    if status.is_ok() {
        scope.complete();
    } else {
        scope.fail(status.text());
    }
}
