use itertools::Itertools;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::Display;

use crate::collection::Document;
use crate::common::{compare_values, id_to_string, is_comparable, values_equal, DOC_ID};

/// A typed query expression.
///
/// This is the closed set of operators every adapter understands. MongoDB
/// translates it to a native filter document, Firestore pushes the equality
/// part down to `where` clauses and evaluates the rest in memory, and the
/// in-memory store evaluates it directly with [`Filter::apply`].
///
/// Field names may be dotted paths into embedded objects.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    Nin(String, Vec<Value>),
    Exists(String, bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// Creates a filter that matches all documents.
pub fn all() -> Filter {
    Filter::All
}

/// Creates a filter that matches the document with the given key.
pub fn by_id(id: &str) -> Filter {
    Filter::Eq(DOC_ID.to_string(), Value::String(id.to_string()))
}

/// Combines multiple filters using logical AND.
pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

/// Combines multiple filters using logical OR.
pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

impl Filter {
    /// Combines this filter with another using logical AND.
    pub fn and(self, filter: Filter) -> Filter {
        match (self, filter) {
            (Filter::All, other) | (other, Filter::All) => other,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), other) => {
                left.push(other);
                Filter::And(left)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// Combines this filter with another using logical OR.
    pub fn or(self, filter: Filter) -> Filter {
        match (self, filter) {
            (Filter::Or(mut left), other) => {
                left.push(other);
                Filter::Or(left)
            }
            (this, other) => Filter::Or(vec![this, other]),
        }
    }

    /// Evaluates the filter against a document.
    pub fn apply(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(field, value) => equals(document.get(field), value),
            Filter::Ne(field, value) => !equals(document.get(field), value),
            Filter::Gt(field, value) => compares(document.get(field), value, |o| o == Ordering::Greater),
            Filter::Gte(field, value) => compares(document.get(field), value, |o| o != Ordering::Less),
            Filter::Lt(field, value) => compares(document.get(field), value, |o| o == Ordering::Less),
            Filter::Lte(field, value) => compares(document.get(field), value, |o| o != Ordering::Greater),
            Filter::In(field, values) => {
                let current = document.get(field);
                values.iter().any(|v| equals(current, v))
            }
            Filter::Nin(field, values) => {
                let current = document.get(field);
                !values.iter().any(|v| equals(current, v))
            }
            Filter::Exists(field, expected) => document.contains_key(field) == *expected,
            Filter::And(filters) => filters.iter().all(|f| f.apply(document)),
            Filter::Or(filters) => filters.iter().any(|f| f.apply(document)),
        }
    }

    /// Returns the document key when the filter pins `_id` to a single value,
    /// either directly or as one clause of a top-level AND. Adapters use it as
    /// the key-lookup fast path.
    pub fn id_lookup(&self) -> Option<String> {
        match self {
            Filter::Eq(field, value) if field == DOC_ID => id_to_string(value),
            Filter::And(filters) => filters.iter().find_map(Filter::id_lookup),
            _ => None,
        }
    }

    /// Top-level equality clauses. An upsert seeds the new document with them.
    pub fn equality_fields(&self) -> Vec<(String, Value)> {
        match self {
            Filter::Eq(field, value) => vec![(field.clone(), value.clone())],
            Filter::And(filters) => filters.iter().flat_map(Filter::equality_fields).collect(),
            _ => vec![],
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All) || matches!(self, Filter::And(filters) if filters.is_empty())
    }
}

fn equals(current: Option<&Value>, expected: &Value) -> bool {
    match current {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(value) => values_equal(value, expected),
    }
}

fn compares(current: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    let check = |value: &Value| is_comparable(value, expected) && accept(compare_values(value, expected));
    match current {
        None => false,
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(check),
        Some(value) => check(value),
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "AllFilter"),
            Filter::Eq(name, value) => write!(f, "({} == {})", name, value),
            Filter::Ne(name, value) => write!(f, "({} != {})", name, value),
            Filter::Gt(name, value) => write!(f, "({} > {})", name, value),
            Filter::Gte(name, value) => write!(f, "({} >= {})", name, value),
            Filter::Lt(name, value) => write!(f, "({} < {})", name, value),
            Filter::Lte(name, value) => write!(f, "({} <= {})", name, value),
            Filter::In(name, values) => write!(f, "({} in [{}])", name, values.iter().join(", ")),
            Filter::Nin(name, values) => write!(f, "({} not in [{}])", name, values.iter().join(", ")),
            Filter::Exists(name, true) => write!(f, "({} exists)", name),
            Filter::Exists(name, false) => write!(f, "({} not exists)", name),
            Filter::And(filters) => write!(f, "({})", filters.iter().join(" && ")),
            Filter::Or(filters) => write!(f, "({})", filters.iter().join(" || ")),
        }
    }
}
