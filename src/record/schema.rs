//! Table descriptors and schemas
//!
//! A table has exactly one primary key column; composite keys are not
//! supported.

use serde::{Deserialize, Serialize};

use super::errors::{RecordError, RecordResult};
use super::record::{Record, REC_STATUS_FIELD};

/// Table name plus its single primary key column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    name: String,
    primary_key: String,
}

impl TableDescriptor {
    /// Creates a descriptor
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Primary key column name
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

/// Reference from a column to another table's column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// Full table schema: descriptor, ordered columns, foreign keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    descriptor: TableDescriptor,
    columns: Vec<ColumnDef>,
    #[serde(default)]
    foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    /// Creates a schema holding only the primary key column (NOT NULL)
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        let descriptor = TableDescriptor::new(name, primary_key);
        let columns = vec![ColumnDef {
            name: descriptor.primary_key().to_string(),
            nullable: false,
        }];
        Self {
            descriptor,
            columns,
            foreign_keys: Vec::new(),
        }
    }

    /// Adds a nullable column
    pub fn column(self, name: impl Into<String>) -> Self {
        self.push_column(name.into(), true)
    }

    /// Adds a NOT NULL column
    pub fn not_null(self, name: impl Into<String>) -> Self {
        self.push_column(name.into(), false)
    }

    fn push_column(mut self, name: String, nullable: bool) -> Self {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.nullable = nullable,
            None => self.columns.push(ColumnDef { name, nullable }),
        }
        self
    }

    /// Adds a foreign key from `column` to `table.referenced`
    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        table: impl Into<String>,
        referenced: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.into(),
            references_table: table.into(),
            references_column: referenced.into(),
        });
        self
    }

    /// The table's descriptor
    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }

    /// Table name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Primary key column name
    pub fn primary_key(&self) -> &str {
        self.descriptor.primary_key()
    }

    /// Columns in declaration order
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Declared foreign keys
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Returns the column definition with this name
    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns true if the table declares this column
    pub fn has_column(&self, name: &str) -> bool {
        self.column_def(name).is_some()
    }

    /// Checks that every key of a record is a declared column.
    ///
    /// The status field is allowed; it is stripped before persistence.
    pub fn validate_record(&self, record: &Record) -> RecordResult<()> {
        for column in record.column_names() {
            if column == REC_STATUS_FIELD {
                continue;
            }
            if !self.has_column(column) {
                return Err(RecordError::UnknownColumn {
                    table: self.name().to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}
