//! Record error types
//!
//! Every variant is a caller-input defect: the batch is rejected as a whole
//! and nothing is retried.

use thiserror::Error;

/// Result type for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Malformed pending-write input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Batch entry is not a JSON object
    #[error("Record {index} is not an object")]
    NotAnObject { index: usize },

    /// Batch itself is not a JSON array
    #[error("Batch must be a JSON array of records")]
    NotAnArray,

    /// Record carries no status tag
    #[error("Record {index} has no '{field}' status")]
    MissingStatus { index: usize, field: &'static str },

    /// Record carries a status tag that is not writable
    #[error("Record {index} has unrecognized '{field}' status: {value}")]
    UnknownStatus {
        index: usize,
        field: &'static str,
        value: String,
    },

    /// Record to update carries no primary key value
    #[error("Modified record {index} has no '{column}' key")]
    MissingKey { index: usize, column: String },

    /// Record carries a column the table does not declare
    #[error("Unknown column '{column}' for table '{table}'")]
    UnknownColumn { table: String, column: String },
}
