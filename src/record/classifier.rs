//! Record classification
//!
//! Splits a batch into records to insert and records to update, consuming the
//! status tag of each. The partition is stable: each output list keeps the
//! batch's relative order.

use serde_json::Value;

use super::batch::Batch;
use super::errors::{RecordError, RecordResult};
use super::record::{Record, RecordStatus, REC_STATUS_FIELD};

/// Output of classification, status tags removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    /// Records tagged `new`
    pub new: Vec<Record>,
    /// Records tagged `modified`
    pub modified: Vec<Record>,
}

impl Classified {
    /// Returns true if both groups are empty
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty()
    }
}

/// Partitions pending-write records by status tag
pub struct RecordClassifier;

impl RecordClassifier {
    /// Classifies a batch.
    ///
    /// Fails on the first record with a missing or unrecognized tag; no
    /// default is ever assumed.
    pub fn classify(batch: Batch) -> RecordResult<Classified> {
        let mut classified = Classified::default();

        for (index, mut record) in batch.into_records().into_iter().enumerate() {
            match Self::take_status(&mut record, index)? {
                RecordStatus::New => classified.new.push(record),
                RecordStatus::Modified => classified.modified.push(record),
            }
        }

        Ok(classified)
    }

    fn take_status(record: &mut Record, index: usize) -> RecordResult<RecordStatus> {
        let tag = record
            .remove(REC_STATUS_FIELD)
            .ok_or(RecordError::MissingStatus {
                index,
                field: REC_STATUS_FIELD,
            })?;

        let parsed = match &tag {
            Value::String(s) => RecordStatus::parse(s),
            _ => None,
        };

        parsed.ok_or_else(|| RecordError::UnknownStatus {
            index,
            field: REC_STATUS_FIELD,
            value: match tag {
                Value::String(s) => s,
                other => other.to_string(),
            },
        })
    }
}
