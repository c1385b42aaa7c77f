//! Result-set pagination
//!
//! The window is computed from the total row count first, then exactly one
//! page is fetched. Requests past the last page are clamped to it; an empty
//! result has zero pages, and page, offset and limit stay at their neutral
//! values.

use crate::observability::ObservationScope;
use crate::query::Query;
use crate::session::StorageSession;

use super::errors::{PaginateError, PaginateResult};
use super::page::Page;

/// Offset/limit window for a page request, before any rows are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub page: u64,
    pub total_pages: u64,
    pub offset: u64,
    pub limit: u64,
}

impl Window {
    /// Rejects page or per-page values of zero
    pub fn check_request(page: u64, per_page: u64) -> PaginateResult<()> {
        if page == 0 || per_page == 0 {
            return Err(PaginateError::InvalidRequest { page, per_page });
        }
        Ok(())
    }

    /// Computes the window for `total_records` rows
    pub fn compute(total_records: u64, page: u64, per_page: u64) -> PaginateResult<Self> {
        Self::check_request(page, per_page)?;

        let total_pages = total_records.div_ceil(per_page);
        if total_pages == 0 {
            return Ok(Self {
                page,
                total_pages,
                offset: 0,
                limit: 0,
            });
        }

        let page = page.min(total_pages);
        Ok(Self {
            page,
            total_pages,
            offset: (page - 1) * per_page,
            limit: per_page,
        })
    }
}

/// Materializes one page of a prepared query
pub struct Paginator;

impl Paginator {
    pub fn paginate<S: StorageSession>(
        session: &mut S,
        query: &Query,
        page: u64,
        per_page: u64,
    ) -> PaginateResult<Page> {
        Window::check_request(page, per_page)?;

        let scope = ObservationScope::with_fields("PAGINATE", &[("table", query.table_name())]);
        match Self::run(session, query, page, per_page) {
            Ok(result) => {
                scope.complete_with_fields(&[
                    ("page", &result.page.to_string()),
                    ("total_records", &result.total_records.to_string()),
                ]);
                Ok(result)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn run<S: StorageSession>(
        session: &mut S,
        query: &Query,
        page: u64,
        per_page: u64,
    ) -> PaginateResult<Page> {
        let total_records = session.count(query)?;
        let window = Window::compute(total_records, page, per_page)?;

        let items = if window.limit == 0 {
            Vec::new()
        } else {
            session.fetch(query, window.offset, window.limit)?
        };

        Ok(Page {
            page: window.page,
            per_page,
            total_records,
            total_pages: window.total_pages,
            offset: window.offset,
            limit: window.limit,
            items,
        })
    }
}
