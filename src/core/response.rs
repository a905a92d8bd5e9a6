//! Standard API response envelope

use crate::core::query::QueryResponse;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// Uniform body returned by list and item endpoints
///
/// ```json
/// {
///   "success": true,
///   "data": [...],
///   "meta": { "pagination": { "page": 1, "limit": 10, ... } },
///   "timestamp": "2024-06-01T10:00:00.000Z"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,

    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            meta: None,
            message: None,
            errors: None,
            timestamp: now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach one metadata entry
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    /// Successful list response, pagination moved under `meta.pagination`
    pub fn paginated(response: QueryResponse<T>) -> Self {
        let QueryResponse { data, pagination } = response;
        let envelope = Self::success(data);
        match pagination {
            Some(meta) => envelope.with_meta("pagination", json!(meta)),
            None => envelope,
        }
    }
}

impl ApiResponse<()> {
    /// Failed response with optional structured errors
    pub fn error(message: impl Into<String>, errors: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            meta: None,
            message: Some(message.into()),
            errors,
            timestamp: now(),
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
