//! Batch: the ordered records submitted to one write call

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{RecordError, RecordResult};
use super::record::Record;
use super::schema::TableSchema;

/// An ordered sequence of pending-write records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    records: Vec<Record>,
}

impl Batch {
    /// Creates an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON array of objects, validating columns against the schema
    pub fn from_json(value: Value, schema: &TableSchema) -> RecordResult<Self> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(RecordError::NotAnArray),
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let record = match item {
                Value::Object(map) => Record::from_map(map),
                _ => return Err(RecordError::NotAnObject { index }),
            };
            schema.validate_record(&record)?;
            records.push(record);
        }

        Ok(Self { records })
    }

    /// Appends a record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in submission order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the batch
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl From<Vec<Record>> for Batch {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

impl FromIterator<Record> for Batch {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema::new("employees", "emp_no").column("first_name")
    }

    #[test]
    fn test_from_json() {
        let batch = Batch::from_json(
            json!([
                {"first_name": "A", "recStatus": "new"},
                {"emp_no": 5, "first_name": "B", "recStatus": "modified"}
            ]),
            &schema(),
        )
        .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.records()[1].get("emp_no"), Some(&json!(5)));
    }

    #[test]
    fn test_from_json_rejects_non_array() {
        let err = Batch::from_json(json!({"first_name": "A"}), &schema()).unwrap_err();
        assert_eq!(err, RecordError::NotAnArray);
    }

    #[test]
    fn test_from_json_rejects_non_object_entry() {
        let err = Batch::from_json(json!([{"first_name": "A"}, 3]), &schema()).unwrap_err();
        assert_eq!(err, RecordError::NotAnObject { index: 1 });
    }

    #[test]
    fn test_from_json_rejects_unknown_column() {
        let err = Batch::from_json(json!([{"nickname": "A"}]), &schema()).unwrap_err();
        assert!(matches!(err, RecordError::UnknownColumn { .. }));
    }
}
