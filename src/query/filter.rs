//! Predicate evaluation and row ordering for in-process stores
//!
//! No type coercion: a string never equals a number. Null and missing values
//! never match a predicate, mirroring SQL three-valued logic.

use std::cmp::Ordering;

use serde_json::Value;

use crate::record::Record;

use super::ast::{FilterOp, Predicate, SortDirection, SortSpec};

/// Evaluates predicates against records
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a record matches all predicates
    pub fn matches(record: &Record, predicates: &[Predicate]) -> bool {
        predicates
            .iter()
            .all(|pred| Self::matches_predicate(record, pred))
    }

    fn matches_predicate(record: &Record, predicate: &Predicate) -> bool {
        let actual = match record.get(&predicate.field) {
            Some(v) if !v.is_null() => v,
            _ => return false,
        };

        match &predicate.op {
            FilterOp::Eq(expected) => {
                compare_values(actual, expected) == Some(Ordering::Equal)
            }
            FilterOp::Gte(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            FilterOp::Gt(bound) => compare_values(actual, bound) == Some(Ordering::Greater),
            FilterOp::Lte(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FilterOp::Lt(bound) => compare_values(actual, bound) == Some(Ordering::Less),
            FilterOp::Like(pattern) => match actual {
                Value::String(s) => like_match(s, pattern),
                _ => false,
            },
        }
    }
}

/// Compares two values of the same JSON type. Mixed types are incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(xi), Some(yi)) = (x.as_i64(), y.as_i64()) {
                return Some(xi.cmp(&yi));
            }
            x.as_f64()?.partial_cmp(&y.as_f64()?)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// SQL LIKE with `%` and `_` wildcards, ASCII case-insensitive
pub fn like_match(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();

    // Greedy matcher with single backtrack point on the last '%'
    let (mut t, mut p) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            t += 1;
            p += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            star = Some((p, t));
            p += 1;
        } else if let Some((sp, st)) = star {
            p = sp + 1;
            t = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}

/// Sorts records by sort keys; stable, so ties keep insertion order.
///
/// Nulls and missing values sort first in ascending order.
pub fn sort_records(records: &mut [Record], sort: &[SortSpec]) {
    if sort.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for spec in sort {
            let ordering = order_for_sort(a.get(&spec.field), b.get(&spec.field));
            let ordering = match spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn order_for_sort(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let rank = |v: Option<&Value>| -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    };

    match (a, b) {
        (Some(x), Some(y)) if rank(a) == rank(b) => {
            compare_values(x, y).unwrap_or(Ordering::Equal)
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
