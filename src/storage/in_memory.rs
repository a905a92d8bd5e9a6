//! In-memory query executor for testing and development

use crate::core::error::StorageError;
use crate::core::field::lookup;
use crate::core::query::{QueryDescriptor, SortKey};
use crate::core::store::QueryExecutor;
use async_trait::async_trait;
use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

const BACKEND: &str = "memory";

/// In-memory store of JSON object records
///
/// Executes descriptors by evaluating the filter tree on every record.
/// Uses an async RwLock so it can be shared across request handlers.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<Vec<Value>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Insert a record, which must serialize to a JSON object
    pub async fn insert<T: Serialize>(&self, record: &T) -> Result<(), StorageError> {
        let value = serde_json::to_value(record).map_err(|e| StorageError::QueryError {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        })?;
        if !value.is_object() {
            return Err(StorageError::QueryError {
                backend: BACKEND.to_string(),
                message: "records must be JSON objects".to_string(),
            });
        }
        self.records.write().await.push(value);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl QueryExecutor<Value> for InMemoryStore {
    async fn execute(&self, descriptor: &QueryDescriptor) -> Result<(Vec<Value>, u64), StorageError> {
        if !descriptor.relations.is_empty() {
            tracing::debug!(
                relations = ?descriptor.relations,
                "in-memory store cannot load relations, ignoring"
            );
        }

        let records = self.records.read().await;

        let mut matching: Vec<&Value> = records
            .iter()
            .filter(|record| {
                descriptor
                    .filter
                    .as_ref()
                    .is_none_or(|filter| filter.matches(record))
            })
            .collect();
        let total = matching.len() as u64;

        // stable sort keeps insertion order for ties
        matching.sort_by(|a, b| compare_records(a, b, &descriptor.sort));

        let (skip, take) = match descriptor.window {
            Some(window) => (
                usize::try_from(window.offset).unwrap_or(usize::MAX),
                window.limit as usize,
            ),
            None => (0, usize::MAX),
        };

        let rows = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|record| match &descriptor.projection {
                Some(fields) => project(record, fields.iter()),
                None => record.clone(),
            })
            .collect();

        Ok((rows, total))
    }
}

fn compare_records(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = lookup(a, &key.field).unwrap_or(&Value::Null);
        let right = lookup(b, &key.field).unwrap_or(&Value::Null);
        let ordering = compare_values(left, right);
        let ordering = if key.direction.is_ascending() {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Nulls first, numbers numerically, strings by kind then value.
/// Mismatched kinds order by kind.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        // RFC 3339 instants sort before every other string
        (Value::String(x), Value::String(y)) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                (Ok(_), Err(_)) => Ordering::Less,
                (Err(_), Ok(_)) => Ordering::Greater,
                (Err(_), Err(_)) => x.cmp(y),
            }
        }
        _ => kind_rank(a).cmp(&kind_rank(b)),
    }
}

fn kind_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Keep only `fields`; dotted paths are copied under their full name
fn project<'a>(record: &Value, fields: impl Iterator<Item = &'a String>) -> Value {
    let mut projected = Map::new();
    for field in fields {
        if let Some(value) = lookup(record, field) {
            projected.insert(field.clone(), value.clone());
        }
    }
    Value::Object(projected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::FieldSet;
    use crate::core::filter::Filter;
    use crate::core::query::{QuerySpec, RawParameters};
    use serde_json::json;

    fn people() -> Vec<Value> {
        vec![
            json!({ "id": 1, "firstName": "Ann", "lastName": "Lee", "age": 31, "createdAt": "2024-01-05T10:00:00Z" }),
            json!({ "id": 2, "firstName": "Bob", "lastName": "Mann", "age": 25, "createdAt": "2024-02-10T10:00:00Z" }),
            json!({ "id": 3, "firstName": "Cid", "lastName": "Ng", "age": 40, "createdAt": "2024-03-15T10:00:00Z" }),
            json!({ "id": 4, "firstName": "Dee", "lastName": "Ray", "age": 25, "createdAt": "2024-04-20T10:00:00Z" }),
        ]
    }

    fn fields() -> FieldSet {
        FieldSet::new(["id", "firstName", "lastName", "age", "createdAt"])
    }

    fn ids(rows: &[Value]) -> Vec<i64> {
        rows.iter().map(|r| r["id"].as_i64().unwrap()).collect()
    }

    async fn run(raw: RawParameters, searchable: &[&str]) -> (Vec<Value>, u64) {
        let store = InMemoryStore::with_records(people());
        let spec = QuerySpec::from_raw_parameters(&raw, &fields()).unwrap();
        let descriptor = spec.build_descriptor(&FieldSet::new(searchable.iter().copied()), None, &[]);
        store.execute(&descriptor).await.unwrap()
    }

    #[tokio::test]
    async fn test_default_sort_is_newest_first() {
        let (rows, total) = run(RawParameters::new(), &[]).await;
        assert_eq!(total, 4);
        assert_eq!(ids(&rows), vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_search_across_fields() {
        let (rows, total) = run(
            RawParameters::new().with("q", "ann").with("sortBy", "id").with("order", "ASC"),
            &["firstName", "lastName"],
        )
        .await;
        assert_eq!(total, 2);
        assert_eq!(ids(&rows), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_multi_sort_with_ties() {
        let (rows, _) = run(RawParameters::new().with("sorts", "age:asc,id:desc"), &[]).await;
        assert_eq!(ids(&rows), vec![4, 2, 1, 3]);
    }

    #[tokio::test]
    async fn test_window_and_count() {
        let (rows, total) = run(
            RawParameters::new().with("page", "2").with("limit", "3"),
            &[],
        )
        .await;
        assert_eq!(total, 4);
        assert_eq!(ids(&rows), vec![1]);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let (rows, total) = run(RawParameters::new().with("page", "9"), &[]).await;
        assert_eq!(total, 4);
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_projection() {
        let (rows, _) = run(
            RawParameters::new().with("fields", "id,firstName").with("sortBy", "id").with("order", "asc"),
            &[],
        )
        .await;
        assert_eq!(rows[0], json!({ "id": 1, "firstName": "Ann" }));
    }

    #[tokio::test]
    async fn test_date_range() {
        let (rows, total) = run(
            RawParameters::new()
                .with("dateRange.from", "2024-02-01")
                .with("dateRange.to", "2024-03-31"),
            &[],
        )
        .await;
        assert_eq!(total, 2);
        assert_eq!(ids(&rows), vec![3, 2]);
    }

    #[tokio::test]
    async fn test_base_filter() {
        let store = InMemoryStore::with_records(people());
        let spec = QuerySpec::default();
        let base = Filter::eq("age", 25);
        let descriptor = spec.build_descriptor(&FieldSet::empty(), Some(&base), &[]);
        let (rows, total) = store.execute(&descriptor).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(ids(&rows), vec![4, 2]);
    }

    #[tokio::test]
    async fn test_insert_requires_objects() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().await);
        store.insert(&json!({ "id": 1 })).await.unwrap();
        assert!(store.insert(&json!([1, 2])).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_sort_over_mixed_timestamp_formats() {
        let records: Vec<Value> = (0..60)
            .map(|i| {
                let hour = i % 24;
                let created_at = match i % 3 {
                    0 => format!("2024-01-01T{:02}:00:00+05:00", hour),
                    1 => format!("2024-01-01T{:02}:00:00Z", hour),
                    _ => format!("2024-01-01T{:02}", hour),
                };
                json!({ "id": i, "createdAt": created_at })
            })
            .collect();
        let store = InMemoryStore::with_records(records);
        let spec = QuerySpec::from_raw_parameters(
            &RawParameters::new().with("sortBy", "createdAt").with("order", "asc").with("all", "true"),
            &fields(),
        )
        .unwrap();
        let descriptor = spec.build_descriptor(&FieldSet::empty(), None, &[]);

        let (rows, total) = store.execute(&descriptor).await.unwrap();
        assert_eq!(total, 60);

        // instants first in chronological order, then plain strings lexically
        let (instants, plain): (Vec<&Value>, Vec<&Value>) = rows
            .iter()
            .partition(|row| row["createdAt"].as_str().unwrap().len() > 13);
        assert_eq!(instants.len(), 40);
        assert!(rows[..40].iter().all(|row| row["createdAt"].as_str().unwrap().len() > 13));
        let parsed: Vec<_> = instants
            .iter()
            .map(|row| DateTime::parse_from_rfc3339(row["createdAt"].as_str().unwrap()).unwrap())
            .collect();
        assert!(parsed.windows(2).all(|w| w[0] <= w[1]));
        let texts: Vec<&str> = plain.iter().map(|row| row["createdAt"].as_str().unwrap()).collect();
        assert!(texts.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(null), &json!(1)), Ordering::Less);
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(
            compare_values(&json!("2024-01-01T12:00:00+02:00"), &json!("2024-01-01T11:00:00Z")),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&json!("2024-01-01T10:00:00+05:00"), &json!("2024-01-01T08")),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&json!("2024-01-01T08"), &json!("2024-01-01T06:00:00Z")),
            Ordering::Greater
        );
    }
}
