//! Observability subsystem
//!
//! Structured JSON logging plus typed lifecycle events.
//!
//! # Principles
//!
//! 1. Observability is read-only: a failed log write never fails an operation
//! 2. No async or background threads
//! 3. One line per event, deterministic key order
//!
//! # Usage
//!
//! ```ignore
//! use tablewright::observability::{log_event_with_fields, Event, Logger, ObservationScope};
//!
//! Logger::info("CONFIG_LOADED", &[("path", "./tablewright.json")]);
//! log_event_with_fields(Event::TransactionCommit, &[("backend", "sqlite")]);
//!
//! let scope = ObservationScope::new("WRITE");
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_warning() {
        Severity::Warn
    } else if event.is_detail() {
        Severity::Trace
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
