//! # This-Query
//!
//! Generic query specification and pagination engine for list endpoints in Rust.
//!
//! ## Features
//!
//! - **Validated Query Specs**: Raw request parameters become a typed [`QuerySpec`](core::query::QuerySpec), every problem reported at once
//! - **Storage-Neutral Descriptors**: Free-text search, date range and base filters combined into one filter tree
//! - **Multi-Field Sorting**: `sorts=lastName:asc,createdAt:desc` with a single-field fallback
//! - **Field Projection**: Return only the requested columns
//! - **Pagination Metadata**: Totals, page counts and next/previous flags computed from the match count
//! - **Configuration-Based**: Defaults and per-entity field lists via YAML configuration
//! - **Axum Integration**: `ListQuery<T>` extractor and ready-made list routes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use this_query::prelude::*;
//!
//! struct User;
//!
//! impl_queryable_entity!(
//!     User,
//!     "users",
//!     fields: ["id", "firstName", "lastName", "email", "createdAt"],
//!     searchable: ["firstName", "lastName", "email"]
//! );
//!
//! let store = Arc::new(InMemoryStore::with_records(users));
//! let app: Router = list_router::<User, Value, _>(store);
//!
//! // GET /users?q=smith&page=2&limit=20&sorts=lastName:asc
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Query Engine ===
    pub use crate::core::{
        coerce::CoercionError,
        entity::QueryableEntity,
        error::{ConfigError, ErrorResponse, QueryError, StorageError, ValidationError},
        field::{FieldSet, FieldValue},
        filter::{Condition, Filter, Predicate},
        query::{
            DateRangeFilter, MAX_PAGE_SIZE, PageWindow, PaginationMeta, QueryDefaults,
            QueryDescriptor, QueryResponse, QuerySpec, RawParameters, SortDirection, SortKey,
        },
        response::ApiResponse,
        service::{ListOptions, find_and_count},
        store::QueryExecutor,
    };

    // === Macros ===
    pub use crate::impl_queryable_entity;

    // === Storage ===
    pub use crate::storage::InMemoryStore;

    // === Config ===
    pub use crate::config::{EntityQueryConfig, QueryConfig};

    // === Server ===
    pub use crate::server::{ListQuery, list_handler, list_router};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use chrono::{DateTime, Utc};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};
    pub use std::sync::Arc;

    // === Axum ===
    pub use axum::{
        Json, Router,
        extract::State,
        routing::get,
    };
}
