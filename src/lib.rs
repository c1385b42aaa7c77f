//! tablewright - batch record reconciliation and pagination over relational stores
//!
//! A write batch is a list of records tagged `recStatus: new | modified`.
//! One `TransactionalWriter::write` call classifies the batch, allocates
//! primary keys for new records that lack one, stages inserts then updates on
//! the caller's session, and flushes so constraint violations surface before
//! the caller decides to commit or roll back.
//!
//! Reads go through the `Paginator`, which computes a clamped page window
//! from the row count and fetches exactly one page.
//!
//! The `table` facade reports every operation as a `ResultStatus` envelope.

pub mod cli;
pub mod observability;
pub mod paginator;
pub mod query;
pub mod record;
pub mod session;
pub mod status;
pub mod table;
pub mod writer;
