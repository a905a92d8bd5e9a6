//! Field names and field values used by queries

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

/// A polymorphic field value carried by filter conditions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    DateTime(DateTime<Utc>),
    String(String),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a timestamp if possible
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Compare against a JSON record value
    ///
    /// Timestamps compare as instants when the record holds an RFC 3339
    /// string; numbers compare numerically across integer/float.
    pub fn eq_json(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldValue::Null, Value::Null) => true,
            (FieldValue::Boolean(a), Value::Bool(b)) => a == b,
            (FieldValue::Integer(a), Value::Number(n)) => n.as_f64() == Some(*a as f64),
            (FieldValue::Float(a), Value::Number(n)) => n.as_f64() == Some(*a),
            (FieldValue::String(a), Value::String(b)) => a == b,
            (FieldValue::DateTime(a), Value::String(s)) => {
                DateTime::parse_from_rfc3339(s).is_ok_and(|b| b.with_timezone(&Utc) == *a)
            }
            _ => false,
        }
    }

    /// Ordering of a JSON record value relative to this one, `None` when
    /// the kinds differ
    pub fn cmp_json(&self, value: &Value) -> Option<std::cmp::Ordering> {
        match (self, value) {
            (FieldValue::Integer(a), Value::Number(n)) => n.as_f64()?.partial_cmp(&(*a as f64)),
            (FieldValue::Float(a), Value::Number(n)) => n.as_f64()?.partial_cmp(a),
            (FieldValue::String(a), Value::String(b)) => Some(b.as_str().cmp(a.as_str())),
            (FieldValue::DateTime(a), Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|b| b.with_timezone(&Utc).cmp(a)),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

/// The set of field names a record type exposes to queries
///
/// Replaces runtime introspection: whoever builds a query states which
/// names are legal, and every field reference in the request is checked
/// against this set. Insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSet(IndexSet<String>);

impl FieldSet {
    /// An empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from any list of names
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Add a name, returning false when it was already present
    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.0.insert(field.into())
    }

    /// Comma-separated listing, used in violation messages
    pub fn describe(&self) -> String {
        self.0.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

impl<S: Into<String>> FromIterator<S> for FieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a> IntoIterator for &'a FieldSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether `name` is usable as a field name
///
/// Accepts identifiers and dotted paths into embedded objects
/// (`address.city`).
pub fn is_valid_field_name(name: &str) -> bool {
    static FIELD_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FIELD_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("field name pattern is valid")
    });
    regex.is_match(name)
}

/// Resolve a possibly dotted field path inside a JSON record
pub fn lookup<'a>(record: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(record, |current, segment| current.get(segment))
}
