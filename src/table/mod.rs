//! Table facade
//!
//! Wraps the core components for application tables and reports every
//! operation as a `ResultStatus`:
//!
//! - `ReadOnlyTable`: raw SELECT and pagination, for lookup tables
//! - `WriteCapableTable`: adds raw statements and batch writes
//!
//! Transaction boundaries stay with the caller. `begin_transaction` and
//! `finalise_transaction` let several table writes commit as one unit:
//!
//! ```ignore
//! begin_transaction(&mut session)?;
//! let mut status = employees.write_to_database(&mut session, employee_batch);
//! if status.is_ok() {
//!     status = salaries.write_to_database(&mut session, salary_batch);
//! }
//! finalise_transaction(&mut session, &status)?;
//! ```

mod read_only;
mod transaction;
mod write_capable;

pub use read_only::ReadOnlyTable;
pub use transaction::{begin_transaction, finalise_transaction};
pub use write_capable::WriteCapableTable;
