//! Result of a successful write

use serde_json::{Map, Value};

use crate::record::Record;

/// Records as written, status tags stripped and keys allocated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    pub new_list: Vec<Record>,
    pub updated_list: Vec<Record>,
}

impl WriteOutcome {
    /// Total number of records written
    pub fn len(&self) -> usize {
        self.new_list.len() + self.updated_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Envelope data keyed `<table>_new_list` / `<table>_updated_list`,
    /// table name lower-cased
    pub fn to_data(&self, table: &str) -> Value {
        let table = table.to_lowercase();
        let list = |records: &[Record]| Value::Array(records.iter().map(Record::as_value).collect());

        let mut data = Map::new();
        data.insert(format!("{}_new_list", table), list(&self.new_list));
        data.insert(format!("{}_updated_list", table), list(&self.updated_list));
        Value::Object(data)
    }
}
