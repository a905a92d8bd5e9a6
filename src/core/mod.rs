//! Core module containing the query engine types and traits

pub mod coerce;
pub mod entity;
pub mod error;
pub mod field;
pub mod filter;
pub mod query;
pub mod response;
pub mod service;
pub mod store;

pub use entity::QueryableEntity;
pub use error::{ConfigError, QueryError, StorageError, ValidationError};
pub use field::{FieldSet, FieldValue};
pub use filter::{Condition, Filter, Predicate};
pub use query::{
    DateRangeFilter, PageWindow, PaginationMeta, QueryDefaults, QueryDescriptor, QueryResponse,
    QuerySpec, RawParameters, SortDirection, SortKey,
};
pub use response::ApiResponse;
pub use service::{ListOptions, find_and_count};
pub use store::QueryExecutor;
