//! Write reconciliation
//!
//! Turns a batch of `recStatus`-tagged records into inserts and updates on
//! one table, allocating primary keys from the store's counter facility for
//! new records that arrive without a usable one.

mod allocator;
mod errors;
mod outcome;
#[allow(clippy::module_inception)]
mod writer;

pub use allocator::UniqueIdAllocator;
pub use errors::{WriteError, WriteResult};
pub use outcome::WriteOutcome;
pub use writer::TransactionalWriter;
