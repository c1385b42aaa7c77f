//! Prepared query structures
//!
//! A `Query` names one table, a conjunction of predicates and an ordering. It
//! is never executed by itself: sessions count it and fetch windows of it.

use serde_json::Value;

/// Filter operation types
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// field = value
    Eq(Value),
    /// field >= value
    Gte(Value),
    /// field > value
    Gt(Value),
    /// field <= value
    Lte(Value),
    /// field < value
    Lt(Value),
    /// field LIKE pattern (`%` any run, `_` one char, ASCII case-insensitive)
    Like(String),
}

impl FilterOp {
    /// Returns the operation name
    pub fn op_name(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "eq",
            FilterOp::Gte(_) => "gte",
            FilterOp::Gt(_) => "gt",
            FilterOp::Lte(_) => "lte",
            FilterOp::Lt(_) => "lt",
            FilterOp::Like(_) => "like",
        }
    }

    /// SQL comparison operator
    pub fn sql_operator(&self) -> &'static str {
        match self {
            FilterOp::Eq(_) => "=",
            FilterOp::Gte(_) => ">=",
            FilterOp::Gt(_) => ">",
            FilterOp::Lte(_) => "<=",
            FilterOp::Lt(_) => "<",
            FilterOp::Like(_) => "LIKE",
        }
    }
}

/// A single predicate (field + operation)
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub op: FilterOp,
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq(value.into()))
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gte(value.into()))
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt(value.into()))
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lte(value.into()))
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt(value.into()))
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOp::Like(pattern.into()))
    }

    fn new(field: impl Into<String>, op: FilterOp) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// A prepared, unexecuted query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    table: String,
    predicates: Vec<Predicate>,
    sort: Vec<SortSpec>,
}

impl Query {
    /// Selects every row of a table
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicates: Vec::new(),
            sort: Vec::new(),
        }
    }

    /// Adds a predicate (all predicates are ANDed)
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Appends a sort key
    pub fn order_by(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    /// Target table
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Predicates in declaration order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Sort keys in priority order
    pub fn sort(&self) -> &[SortSpec] {
        &self.sort
    }
}
