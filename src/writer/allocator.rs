//! Primary key allocation
//!
//! One counter request per record that needs a key. Nothing is reserved in
//! advance, so a rolled-back write may leave gaps in the sequence.

use crate::observability::{log_event_with_fields, Event};
use crate::session::UniqueIdSource;

use super::errors::{WriteError, WriteResult};

/// Obtains unique integer ids from the store's counter facility
pub struct UniqueIdAllocator;

impl UniqueIdAllocator {
    /// Next id for `table.column`.
    ///
    /// Fails with `WriteError::Allocation` when the facility has no value to
    /// give (for example, no counter registered for the pair).
    pub fn allocate<S: UniqueIdSource>(
        source: &mut S,
        table: &str,
        column: &str,
    ) -> WriteResult<i64> {
        match source.next_id(table, column)? {
            Some(id) => {
                log_event_with_fields(
                    Event::IdAllocated,
                    &[("table", table), ("column", column), ("id", &id.to_string())],
                );
                Ok(id)
            }
            None => Err(WriteError::Allocation {
                table: table.to_string(),
                column: column.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{StorageError, StorageResult};

    struct FixedSource {
        next: Option<i64>,
        calls: usize,
    }

    impl UniqueIdSource for FixedSource {
        fn next_id(&mut self, _table: &str, _column: &str) -> StorageResult<Option<i64>> {
            self.calls += 1;
            let current = self.next;
            self.next = current.map(|n| n + 1);
            Ok(current)
        }
    }

    struct BrokenSource;

    impl UniqueIdSource for BrokenSource {
        fn next_id(&mut self, _table: &str, _column: &str) -> StorageResult<Option<i64>> {
            Err(StorageError::backend("database is locked"))
        }
    }

    #[test]
    fn test_allocate_sequence() {
        let mut source = FixedSource {
            next: Some(500000),
            calls: 0,
        };
        assert_eq!(
            UniqueIdAllocator::allocate(&mut source, "employees", "emp_no").unwrap(),
            500000
        );
        assert_eq!(
            UniqueIdAllocator::allocate(&mut source, "employees", "emp_no").unwrap(),
            500001
        );
        assert_eq!(source.calls, 2);
    }

    #[test]
    fn test_allocate_no_value() {
        let mut source = FixedSource {
            next: None,
            calls: 0,
        };
        let err = UniqueIdAllocator::allocate(&mut source, "employees", "emp_no").unwrap_err();
        assert!(matches!(err, WriteError::Allocation { .. }));
        assert_eq!(
            err.to_string(),
            "Get next Id for employees.emp_no failed to get next value."
        );
    }

    #[test]
    fn test_allocate_storage_failure() {
        let err = UniqueIdAllocator::allocate(&mut BrokenSource, "employees", "emp_no").unwrap_err();
        assert!(matches!(err, WriteError::Storage(_)));
    }
}
