//! Storage sessions
//!
//! A `StorageSession` is one connection to a relational store with at most
//! one open transaction. Two backends are provided:
//!
//! - `SqliteSession`, opened from a `Database`, backed by a SQLite file
//! - `MemorySession`, opened from a `MemoryStore`, fully in process
//!
//! Both also implement `UniqueIdSource`, the store-side counter facility
//! used to allocate primary keys for new records.

mod errors;
mod memory;
mod sqlite;
mod traits;

pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use memory::{MemorySession, MemoryStore};
pub use sqlite::{install_unique_id, seed_unique_id, Database, SqliteSession};
pub use traits::{StorageSession, UniqueIdSource};
