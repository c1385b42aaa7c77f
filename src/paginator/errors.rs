//! Pagination error types

use thiserror::Error;

use crate::session::StorageError;

/// Result type for pagination
pub type PaginateResult<T> = Result<T, PaginateError>;

#[derive(Debug, Error)]
pub enum PaginateError {
    /// Page numbers start at 1 and pages hold at least one row
    #[error("Invalid page request: page {page}, per_page {per_page}")]
    InvalidRequest { page: u64, per_page: u64 },

    #[error("{0}")]
    Storage(#[from] StorageError),
}
