//! Pagination of prepared queries

mod errors;
mod page;
#[allow(clippy::module_inception)]
mod paginator;

pub use errors::{PaginateError, PaginateResult};
pub use page::Page;
pub use paginator::{Paginator, Window};
