//! Prepared queries
//!
//! Queries are plain values describing a single-table selection. Storage
//! sessions translate them into SQL (`SqliteSession`) or evaluate them in
//! process (`MemorySession`) with the helpers exported here.

mod ast;
mod filter;

pub use ast::{FilterOp, Predicate, Query, SortDirection, SortSpec};
pub use filter::{compare_values, like_match, sort_records, PredicateFilter};
