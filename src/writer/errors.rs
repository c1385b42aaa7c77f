//! Write error types
//!
//! Error codes:
//! - TW_MALFORMED_RECORD: batch input is not writable as given
//! - TW_ALLOCATION_FAILED: the counter facility produced no value
//! - TW_CONSTRAINT_VIOLATION: deferred constraint check failed at flush
//! - storage codes pass through for every other session failure

use thiserror::Error;

use crate::record::RecordError;
use crate::session::StorageError;
use crate::status::messages;

/// Result type for write operations
pub type WriteResult<T> = Result<T, WriteError>;

/// Failure of one write call. The session is left for the caller to roll back.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    MalformedRecord(#[from] RecordError),

    #[error("{}", messages::next_id_failed(.table, .column))]
    Allocation { table: String, column: String },

    #[error("{0}")]
    ConstraintViolation(#[source] StorageError),

    #[error("{0}")]
    Storage(#[source] StorageError),
}

impl WriteError {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            WriteError::MalformedRecord(_) => "TW_MALFORMED_RECORD",
            WriteError::Allocation { .. } => "TW_ALLOCATION_FAILED",
            WriteError::ConstraintViolation(e) | WriteError::Storage(e) => e.code().code(),
        }
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, WriteError::ConstraintViolation(_))
    }
}

impl From<StorageError> for WriteError {
    fn from(err: StorageError) -> Self {
        if err.is_constraint_violation() {
            WriteError::ConstraintViolation(err)
        } else {
            WriteError::Storage(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_message() {
        let err = WriteError::Allocation {
            table: "employees".to_string(),
            column: "emp_no".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Get next Id for employees.emp_no failed to get next value."
        );
        assert_eq!(err.code(), "TW_ALLOCATION_FAILED");
    }

    #[test]
    fn test_storage_split() {
        let err: WriteError = StorageError::constraint_violation("FOREIGN KEY constraint failed").into();
        assert!(err.is_constraint_violation());
        assert_eq!(err.code(), "TW_CONSTRAINT_VIOLATION");

        let err: WriteError = StorageError::table_not_found("salaries").into();
        assert!(!err.is_constraint_violation());
        assert_eq!(err.code(), "TW_TABLE_NOT_FOUND");
    }

    #[test]
    fn test_malformed_passthrough() {
        let err: WriteError = RecordError::NotAnArray.into();
        assert_eq!(err.to_string(), "Batch must be a JSON array of records");
        assert_eq!(err.code(), "TW_MALFORMED_RECORD");
    }
}
