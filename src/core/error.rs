//! Typed error handling for the query engine
//!
//! Every failure the engine can report falls into one of a few categories,
//! so callers can match on them instead of inspecting strings.
//!
//! # Error Categories
//!
//! - [`ValidationError`]: the inbound query parameters were rejected
//! - [`StorageError`]: the data-access collaborator failed to execute a descriptor
//! - [`ConfigError`]: configuration could not be loaded or is inconsistent
//!
//! # Example
//!
//! ```rust,ignore
//! use this_query::prelude::*;
//!
//! match QuerySpec::from_raw_parameters(&raw, &fields) {
//!     Ok(spec) => { /* build descriptor */ }
//!     Err(errors) => {
//!         for (field, messages) in errors.fields() {
//!             eprintln!("{}: {}", field, messages.join(", "));
//!         }
//!     }
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The main error type of the query engine
#[derive(Debug)]
pub enum QueryError {
    /// Query parameters failed validation
    Validation(ValidationError),

    /// Storage backend errors, passed through untouched
    Storage(StorageError),

    /// Configuration errors
    Config(ConfigError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Validation(e) => write!(f, "{}", e),
            QueryError::Storage(e) => write!(f, "{}", e),
            QueryError::Config(e) => write!(f, "{}", e),
            QueryError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::Validation(e) => Some(e),
            QueryError::Storage(e) => Some(e),
            QueryError::Config(e) => Some(e),
            QueryError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl QueryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            QueryError::Validation(_) => StatusCode::BAD_REQUEST,
            QueryError::Storage(e) => e.status_code(),
            QueryError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            QueryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            QueryError::Validation(_) => "VALIDATION_ERROR",
            QueryError::Storage(e) => e.error_code(),
            QueryError::Config(_) => "CONFIG_ERROR",
            QueryError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            QueryError::Validation(e) => Some(serde_json::json!({ "fields": e.fields() })),
            _ => None,
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "query failed");
        }
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Rejected query parameters
///
/// Holds every violation found while constructing a query, keyed by the
/// offending parameter name. A single key may carry several messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Create an empty error collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error holding a single violation
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a violation for `field`
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Fold another set of violations into this one
    pub fn merge(&mut self, other: ValidationError) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// Whether no violation was recorded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of offending fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether `field` has at least one violation
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded for `field`
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The full field → messages mapping
    pub fn fields(&self) -> &BTreeMap<String, Vec<String>> {
        &self.fields
    }

    /// `Ok(value)` when nothing was recorded, `Err(self)` otherwise
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msgs: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join("; ")))
            .collect();
        write!(f, "Validation errors: {}", msgs.join(", "))
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for QueryError {
    fn from(err: ValidationError) -> Self {
        QueryError::Validation(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a data-access collaborator while executing a descriptor
#[derive(Debug)]
pub enum StorageError {
    /// Connection error
    ConnectionError { backend: String, message: String },

    /// Query execution error
    QueryError { backend: String, message: String },

    /// Backend not available
    Unavailable { backend: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::ConnectionError { backend, message } => {
                write!(f, "Connection to {} failed: {}", backend, message)
            }
            StorageError::QueryError { backend, message } => {
                write!(f, "Query on {} failed: {}", backend, message)
            }
            StorageError::Unavailable { backend } => {
                write!(f, "Storage backend '{}' is unavailable", backend)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::ConnectionError { .. } => "STORAGE_CONNECTION_ERROR",
            StorageError::QueryError { .. } => "STORAGE_QUERY_ERROR",
            StorageError::Unavailable { .. } => "STORAGE_UNAVAILABLE",
        }
    }
}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        QueryError::Storage(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration loading and validation
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Entity is not declared in configuration
    UnknownEntity { name: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => match file {
                Some(file) => write!(f, "Failed to parse config '{}': {}", file, message),
                None => write!(f, "Failed to parse config: {}", message),
            },
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => write!(
                f,
                "Invalid value '{}' for config field '{}': {}",
                value, field, message
            ),
            ConfigError::UnknownEntity { name } => {
                write!(f, "Entity '{}' is not declared in the query config", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for QueryError {
    fn from(err: ConfigError) -> Self {
        QueryError::Config(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}
