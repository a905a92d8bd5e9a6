//! Explicit conversion of raw query parameter values
//!
//! Inbound parameters arrive as strings, numbers or booleans. Each target
//! type has one conversion function here; every function is total and
//! reports a [`CoercionError`] instead of guessing.

use crate::core::query::{SortDirection, SortKey};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use thiserror::Error;

/// Why a raw value could not be converted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoercionError {
    #[error("must be a string, number or boolean")]
    UnsupportedType,

    #[error("must be a boolean value")]
    NotABoolean,

    #[error("must be an integer number")]
    NotAnInteger,

    #[error("must be a valid ISO 8601 date")]
    NotATimestamp,

    #[error("must be one of the following values: ASC, DESC")]
    InvalidDirection,

    #[error("entry '{0}' must have the form field or field:direction")]
    MalformedSortEntry(String),
}

/// Render a scalar as text
pub fn to_text(value: &Value) -> Result<String, CoercionError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(CoercionError::UnsupportedType),
    }
}

/// Parse a boolean flag
///
/// Accepts JSON booleans and `true/false/1/0/yes/no` in any case.
pub fn to_bool(value: &Value) -> Result<bool, CoercionError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_u64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(CoercionError::NotABoolean),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(CoercionError::NotABoolean),
        },
        _ => Err(CoercionError::UnsupportedType),
    }
}

/// Parse a signed integer
///
/// Range checks are the caller's job; this only rejects non-integers.
pub fn to_integer(value: &Value) -> Result<i64, CoercionError> {
    match value {
        Value::Number(n) => n.as_i64().ok_or(CoercionError::NotAnInteger),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CoercionError::NotAnInteger),
        Value::Bool(_) => Err(CoercionError::NotAnInteger),
        _ => Err(CoercionError::UnsupportedType),
    }
}

/// Parse an instant
///
/// Accepts RFC 3339 (`2024-05-01T10:00:00Z`) or a bare date
/// (`2024-05-01`), read as midnight UTC.
pub fn to_timestamp(value: &Value) -> Result<DateTime<Utc>, CoercionError> {
    let text = match value {
        Value::String(s) => s.trim(),
        Value::Number(_) | Value::Bool(_) => return Err(CoercionError::NotATimestamp),
        _ => return Err(CoercionError::UnsupportedType),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or(CoercionError::NotATimestamp)
}

/// Parse a sort direction, case-insensitively
pub fn to_sort_direction(value: &Value) -> Result<SortDirection, CoercionError> {
    match value {
        Value::String(s) => parse_direction(s),
        Value::Number(_) | Value::Bool(_) => Err(CoercionError::InvalidDirection),
        _ => Err(CoercionError::UnsupportedType),
    }
}

fn parse_direction(text: &str) -> Result<SortDirection, CoercionError> {
    match text.trim().to_ascii_uppercase().as_str() {
        "ASC" | "ASCENDING" => Ok(SortDirection::Ascending),
        "DESC" | "DESCENDING" => Ok(SortDirection::Descending),
        _ => Err(CoercionError::InvalidDirection),
    }
}

/// Split a comma-separated list of names
///
/// Items are trimmed and empty items dropped, so `"a, ,b,"` is `[a, b]`.
pub fn to_field_list(value: &Value) -> Result<Vec<String>, CoercionError> {
    let text = to_text(value)?;
    Ok(text
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parse a comma-separated list of `field[:direction]` entries
///
/// Entries without a direction sort descending.
pub fn to_sort_list(value: &Value) -> Result<Vec<SortKey>, CoercionError> {
    to_field_list(value)?
        .into_iter()
        .map(|entry| {
            let mut parts = entry.splitn(2, ':');
            let field = parts.next().map(str::trim).unwrap_or_default();
            if field.is_empty() {
                return Err(CoercionError::MalformedSortEntry(entry.clone()));
            }
            let direction = match parts.next() {
                Some(direction) => parse_direction(direction)?,
                None => SortDirection::Descending,
            };
            Ok(SortKey::new(field, direction))
        })
        .collect()
}
