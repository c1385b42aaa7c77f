//! One computed page of results

use serde::Serialize;

use crate::record::Record;

/// The retrieval window and the rows inside it. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub(super) page: u64,
    pub(super) per_page: u64,
    pub(super) total_records: u64,
    pub(super) total_pages: u64,
    pub(super) offset: u64,
    pub(super) limit: u64,
    pub(super) items: Vec<Record>,
}

impl Page {
    /// Page number after clamping to the last page
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Zero when there are no rows at all
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Record> {
        self.items
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// False for an empty result, whatever page was requested
    pub fn has_prev(&self) -> bool {
        self.total_pages > 0 && self.page > 1
    }
}
