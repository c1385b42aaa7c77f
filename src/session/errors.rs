//! Storage session error types
//!
//! Error codes:
//! - TW_CONSTRAINT_VIOLATION: uniqueness, not-null or foreign key failure
//! - TW_TABLE_NOT_FOUND: operation names a table the store does not have
//! - TW_UNSUPPORTED: operation not available on this backend
//! - TW_TRANSACTION_STATE: operation illegal in the current transaction state
//! - TW_STORAGE_BACKEND: any other backend failure (I/O, SQL syntax, locking)

use std::fmt;

/// Storage error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Deferred constraint check failed
    ConstraintViolation,
    /// Unknown table
    TableNotFound,
    /// Backend does not implement the operation
    Unsupported,
    /// No open transaction, already open, or failed and awaiting rollback
    TransactionState,
    /// Any other backend failure
    Backend,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::ConstraintViolation => "TW_CONSTRAINT_VIOLATION",
            StorageErrorCode::TableNotFound => "TW_TABLE_NOT_FOUND",
            StorageErrorCode::Unsupported => "TW_UNSUPPORTED",
            StorageErrorCode::TransactionState => "TW_TRANSACTION_STATE",
            StorageErrorCode::Backend => "TW_STORAGE_BACKEND",
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional backend source
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    source: Option<rusqlite::Error>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Constraint violation raised at flush
    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::ConstraintViolation, message)
    }

    /// Unknown table
    pub fn table_not_found(table: &str) -> Self {
        Self::new(
            StorageErrorCode::TableNotFound,
            format!("no such table: {}", table),
        )
    }

    /// Operation not supported by this backend
    pub fn unsupported(operation: &str, backend: &str) -> Self {
        Self::new(
            StorageErrorCode::Unsupported,
            format!("{} is not supported by the {} backend", operation, backend),
        )
    }

    /// Illegal transaction state
    pub fn transaction_state(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::TransactionState, message)
    }

    /// Generic backend failure
    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(StorageErrorCode::Backend, message)
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns true for uniqueness, not-null and foreign key failures
    pub fn is_constraint_violation(&self) -> bool {
        self.code == StorageErrorCode::ConstraintViolation
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let (code, message) = match &err {
            rusqlite::Error::SqliteFailure(failure, detail) => {
                let message = detail.clone().unwrap_or_else(|| failure.to_string());
                if failure.code == rusqlite::ErrorCode::ConstraintViolation {
                    (StorageErrorCode::ConstraintViolation, message)
                } else if message.starts_with("no such table") {
                    (StorageErrorCode::TableNotFound, message)
                } else {
                    (StorageErrorCode::Backend, message)
                }
            }
            other => (StorageErrorCode::Backend, other.to_string()),
        };
        Self {
            code,
            message,
            source: Some(err),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
