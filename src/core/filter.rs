//! Storage-agnostic filter expressions
//!
//! A [`Filter`] is a small tree: leaves are single-field [`Condition`]s,
//! inner nodes combine children with AND or OR. Data-access layers lower
//! the tree into their own query language; [`Filter::matches`] is the
//! lowering for JSON records held in memory.

use crate::core::field::{FieldValue, lookup};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison applied to a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Predicate {
    Eq(FieldValue),
    NotEq(FieldValue),
    /// Case-insensitive substring match
    Contains(String),
    /// Closed interval on a timestamp field
    Between {
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    },
    Gt(FieldValue),
    Gte(FieldValue),
    Lt(FieldValue),
    Lte(FieldValue),
    In(Vec<FieldValue>),
    IsNull,
    IsNotNull,
}

/// A predicate bound to a field name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    #[serde(flatten)]
    pub predicate: Predicate,
}

impl Condition {
    pub fn new(field: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            field: field.into(),
            predicate,
        }
    }

    /// Evaluate this condition against a JSON record
    ///
    /// A missing field behaves like `null`.
    pub fn matches(&self, record: &Value) -> bool {
        let value = lookup(record, &self.field).unwrap_or(&Value::Null);
        match &self.predicate {
            Predicate::Eq(expected) => expected.eq_json(value),
            Predicate::NotEq(expected) => !expected.eq_json(value),
            Predicate::Contains(needle) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Predicate::Between { from, to } => parse_instant(value)
                .is_some_and(|instant| *from <= instant && instant <= *to),
            Predicate::Gt(bound) => bound.cmp_json(value) == Some(Ordering::Greater),
            Predicate::Gte(bound) => matches!(
                bound.cmp_json(value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Predicate::Lt(bound) => bound.cmp_json(value) == Some(Ordering::Less),
            Predicate::Lte(bound) => {
                matches!(bound.cmp_json(value), Some(Ordering::Less | Ordering::Equal))
            }
            Predicate::In(candidates) => candidates.iter().any(|c| c.eq_json(value)),
            Predicate::IsNull => value.is_null(),
            Predicate::IsNotNull => !value.is_null(),
        }
    }
}

fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// A boolean expression over record fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    Condition(Condition),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    /// Leaf filter on a single field
    pub fn field(field: impl Into<String>, predicate: Predicate) -> Self {
        Filter::Condition(Condition::new(field, predicate))
    }

    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::field(field, Predicate::Eq(value.into()))
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::field(field, Predicate::Contains(needle.into()))
    }

    pub fn between(field: impl Into<String>, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self::field(field, Predicate::Between { from, to })
    }

    /// Conjunction of `self` and `other`
    ///
    /// Nested AND nodes are flattened so that `a.and(b).and(c)` yields a
    /// single three-child node.
    pub fn and(self, other: Filter) -> Filter {
        let mut children = match self {
            Filter::And(children) => children,
            single => vec![single],
        };
        match other {
            Filter::And(more) => children.extend(more),
            single => children.push(single),
        }
        Filter::And(children)
    }

    /// Disjunction of `self` and `other`, flattened like [`Filter::and`]
    pub fn or(self, other: Filter) -> Filter {
        let mut children = match self {
            Filter::Or(children) => children,
            single => vec![single],
        };
        match other {
            Filter::Or(more) => children.extend(more),
            single => children.push(single),
        }
        Filter::Or(children)
    }

    /// OR of all `filters`; `None` when the list is empty
    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Option<Filter> {
        filters.into_iter().reduce(Filter::or)
    }

    /// Evaluate the tree against a JSON record
    ///
    /// An empty AND is true, an empty OR is false.
    pub fn matches(&self, record: &Value) -> bool {
        match self {
            Filter::Condition(condition) => condition.matches(record),
            Filter::And(children) => children.iter().all(|f| f.matches(record)),
            Filter::Or(children) => children.iter().any(|f| f.matches(record)),
        }
    }

    /// Top-level OR branches; a non-OR filter is its own single branch
    pub fn branches(&self) -> &[Filter] {
        match self {
            Filter::Or(children) => children,
            single => std::slice::from_ref(single),
        }
    }
}
