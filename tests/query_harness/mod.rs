//! Shared fixtures for query engine integration tests
//!
//! Provides a `Person` entity declared through `impl_queryable_entity!`,
//! a deterministic set of people, and helpers to build stores and routers.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! mod query_harness;
//! use query_harness::*;
//! ```

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use this_query::prelude::*;

pub struct Person;

impl_queryable_entity!(
    Person,
    "people",
    fields: ["id", "firstName", "lastName", "email", "age", "status", "createdAt", "address.city"],
    searchable: ["firstName", "lastName", "email"],
    relations: ["roles"]
);

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRow {
    pub id: u32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: u32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub address: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub city: String,
}

/// First record is created on this instant, the rest one week apart
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

/// Twelve people, ids 1..=12, created weekly from [`epoch`]
pub fn people() -> Vec<PersonRow> {
    let rows = [
        ("Ann", "Lee", 31, "active", "Oslo"),
        ("Bob", "Mann", 25, "active", "Lyon"),
        ("Cid", "Ng", 40, "inactive", "Oslo"),
        ("Dee", "Ray", 25, "active", "Rome"),
        ("Eve", "Annand", 52, "active", "Lyon"),
        ("Fay", "Ito", 19, "inactive", "Kyiv"),
        ("Gus", "Hall", 33, "active", "Oslo"),
        ("Hal", "Joannou", 47, "active", "Rome"),
        ("Ivy", "Kerr", 28, "inactive", "Lyon"),
        ("Jon", "Smith", 36, "active", "Oslo"),
        ("Kim", "Smithers", 22, "active", "Kyiv"),
        ("Lou", "Vance", 61, "active", "Rome"),
    ];
    rows.iter()
        .enumerate()
        .map(|(i, (first, last, age, status, city))| PersonRow {
            id: i as u32 + 1,
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            age: *age,
            status: status.to_string(),
            created_at: epoch() + Duration::weeks(i as i64),
            address: Address {
                city: city.to_string(),
            },
        })
        .collect()
}

pub async fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    for person in people() {
        store.insert(&person).await.unwrap();
    }
    store
}

pub async fn people_router() -> Router {
    list_router::<Person, Value, _>(Arc::new(seeded_store().await))
}

pub fn ids(rows: &[Value]) -> Vec<u64> {
    rows.iter().map(|row| row["id"].as_u64().unwrap()).collect()
}

pub fn raw(pairs: &[(&str, &str)]) -> RawParameters {
    RawParameters::from_query_pairs(pairs.iter().copied())
}
