//! Transactional batch writer
//!
//! One `write` call: classify, allocate missing keys, stage inserts then
//! updates, flush. The writer never begins, commits or rolls back; the caller
//! owns the transaction so several writes (several tables) can commit as one
//! unit.

use serde_json::Value;

use crate::observability::ObservationScope;
use crate::record::{Batch, Classified, RecordClassifier, RecordError, TableDescriptor};
use crate::session::{StorageSession, UniqueIdSource};

use super::allocator::UniqueIdAllocator;
use super::errors::WriteResult;
use super::outcome::WriteOutcome;

/// Writes batches of pending records to one table
#[derive(Debug, Clone)]
pub struct TransactionalWriter {
    table: TableDescriptor,
}

impl TransactionalWriter {
    pub fn new(table: TableDescriptor) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    /// Applies a batch inside the session's open transaction.
    ///
    /// On error nothing after the failing step runs and the transaction is
    /// left as is; roll it back.
    pub fn write<S>(&self, batch: Batch, session: &mut S) -> WriteResult<WriteOutcome>
    where
        S: StorageSession + UniqueIdSource,
    {
        let batch_size = batch.len().to_string();
        let scope = ObservationScope::with_fields(
            "WRITE",
            &[
                ("table", self.table.name()),
                ("backend", session.backend()),
                ("records", &batch_size),
            ],
        );

        match self.apply(batch, session) {
            Ok(outcome) => {
                scope.complete_with_fields(&[
                    ("inserted", &outcome.new_list.len().to_string()),
                    ("updated", &outcome.updated_list.len().to_string()),
                ]);
                Ok(outcome)
            }
            Err(e) => {
                scope.fail(&e.to_string());
                Err(e)
            }
        }
    }

    fn apply<S>(&self, batch: Batch, session: &mut S) -> WriteResult<WriteOutcome>
    where
        S: StorageSession + UniqueIdSource,
    {
        let Classified {
            mut new,
            mut modified,
        } = RecordClassifier::classify(batch)?;
        let pk = self.table.primary_key();

        // Keys of updates are checked before any counter is consumed
        let mut keys = Vec::with_capacity(modified.len());
        for (index, record) in modified.iter_mut().enumerate() {
            let key = match record.key_as_i64(pk) {
                Some(id) => {
                    record.insert(pk, id);
                    Value::from(id)
                }
                None => match record.get(pk) {
                    Some(value) if !value.is_null() => value.clone(),
                    _ => {
                        return Err(RecordError::MissingKey {
                            index,
                            column: pk.to_string(),
                        }
                        .into())
                    }
                },
            };
            keys.push(key);
        }

        for record in new.iter_mut() {
            let id = match record.key_as_i64(pk) {
                Some(id) => id,
                None => UniqueIdAllocator::allocate(session, self.table.name(), pk)?,
            };
            record.insert(pk, id);
        }

        for record in &new {
            session.insert(&self.table, record)?;
        }
        for (record, key) in modified.iter().zip(&keys) {
            session.update_by_key(&self.table, key, record)?;
        }

        session.flush()?;

        Ok(WriteOutcome {
            new_list: new,
            updated_list: modified,
        })
    }
}
