//! Observable events
//!
//! Events are explicit and typed; the string form is the `event` key of the
//! emitted log line.

use std::fmt;

/// Observable events in tablewright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Connection lifecycle
    /// Database opened
    DatabaseOpen,
    /// Counter table installed
    UniqueIdInstalled,
    /// Configuration loaded
    ConfigLoaded,

    // Transactions
    /// Transaction started
    TransactionBegin,
    /// Transaction committed
    TransactionCommit,
    /// Transaction rolled back
    TransactionRollback,
    /// Staged operations flushed to the store
    SessionFlush,

    // Writes
    /// A unique id was allocated for a new record
    IdAllocated,
    /// Modified record matched no stored row
    UpdateNoMatch,
}

impl Event {
    /// Returns the event name
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DatabaseOpen => "DATABASE_OPEN",
            Event::UniqueIdInstalled => "UNIQUE_ID_INSTALLED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionCommit => "TRANSACTION_COMMIT",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::SessionFlush => "SESSION_FLUSH",
            Event::IdAllocated => "ID_ALLOCATED",
            Event::UpdateNoMatch => "UPDATE_NO_MATCH",
        }
    }

    /// Returns true for events that indicate a suspicious but non-fatal state
    pub fn is_warning(&self) -> bool {
        matches!(self, Event::UpdateNoMatch)
    }

    /// Returns true for high-volume events logged at TRACE
    pub fn is_detail(&self) -> bool {
        matches!(self, Event::IdAllocated | Event::SessionFlush)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
