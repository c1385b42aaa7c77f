//! Record: an ordered column -> value mapping
//!
//! Column order is insertion order (serde_json `preserve_order`), so a record
//! echoes back exactly the way the caller built it.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the transient status field carried by pending-write records
pub const REC_STATUS_FIELD: &str = "recStatus";

/// Pending-write status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Record is to be inserted
    New,
    /// Record is to be updated by primary key
    Modified,
}

impl RecordStatus {
    /// Parse a status tag. `unchanged` and anything else are not writable.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "new" => Some(RecordStatus::New),
            "modified" => Some(RecordStatus::Modified),
            _ => None,
        }
    }

    /// Returns the tag value
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::New => "new",
            RecordStatus::Modified => "modified",
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row's worth of column values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    columns: Map<String, Value>,
}

impl Record {
    /// Creates an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object
    pub fn from_map(columns: Map<String, Value>) -> Self {
        Self { columns }
    }

    /// Builder-style column setter
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    /// Builder-style status tag setter
    pub fn with_status(self, status: RecordStatus) -> Self {
        self.with(REC_STATUS_FIELD, status.as_str())
    }

    /// Returns the value of a column
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    /// Sets a column value, returning the previous one
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.columns.insert(column.into(), value.into())
    }

    /// Removes a column, keeping the order of the remaining columns
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        if !self.columns.contains_key(column) {
            return None;
        }
        let mut removed = None;
        let columns = std::mem::take(&mut self.columns);
        for (name, value) in columns {
            if name == column {
                removed = Some(value);
            } else {
                self.columns.insert(name, value);
            }
        }
        removed
    }

    /// Returns true if the column is present
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Column/value pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the record has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the record as a JSON object
    pub fn as_value(&self) -> Value {
        Value::Object(self.columns.clone())
    }

    /// Consumes the record into its JSON object
    pub fn into_map(self) -> Map<String, Value> {
        self.columns
    }

    /// Returns the primary key value as a positive integer, if it is one.
    ///
    /// JSON integers and integer strings (`"1000000"`) both qualify.
    pub fn key_as_i64(&self, pk_column: &str) -> Option<i64> {
        let id = match self.columns.get(pk_column)? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.trim().parse::<i64>().ok()?,
            _ => return None,
        };
        (id > 0).then_some(id)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(columns: Map<String, Value>) -> Self {
        Self::from_map(columns)
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in &self.columns {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", name, value)?;
            first = false;
        }
        Ok(())
    }
}
