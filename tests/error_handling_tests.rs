//! Integration tests for error types and their HTTP mapping

use axum::http::StatusCode;
use axum::response::IntoResponse;
use this_query::prelude::*;

#[test]
fn test_validation_error_maps_to_400() {
    let mut errors = ValidationError::new();
    errors.add("page", "page must not be less than 1");
    errors.add("limit", "limit must not be greater than 100");

    let err: QueryError = errors.into();
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.error_code(), "VALIDATION_ERROR");

    let body = serde_json::to_value(err.to_response()).unwrap();
    assert_eq!(
        body["details"]["fields"]["page"],
        serde_json::json!(["page must not be less than 1"])
    );
}

#[test]
fn test_storage_errors() {
    let err = QueryError::from(StorageError::ConnectionError {
        backend: "postgres".to_string(),
        message: "refused".to_string(),
    });
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.error_code(), "STORAGE_CONNECTION_ERROR");

    let err = QueryError::from(StorageError::Unavailable {
        backend: "postgres".to_string(),
    });
    assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(err.to_response().details.is_none());
}

#[test]
fn test_config_error_is_internal() {
    let err = QueryError::from(ConfigError::UnknownEntity {
        name: "orders".to_string(),
    });
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.error_code(), "CONFIG_ERROR");
    assert!(err.to_string().contains("orders"));
}

#[test]
fn test_into_response_status() {
    let response = QueryError::Internal("boom".to_string()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = QueryError::from(ValidationError::single("foo", "property foo should not exist"))
        .into_response();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_error_envelope() {
    let envelope = ApiResponse::<()>::error("invalid query", None);
    let body = serde_json::to_value(&envelope).unwrap();

    assert_eq!(body["success"], serde_json::json!(false));
    assert_eq!(body["message"], serde_json::json!("invalid query"));
    assert!(body.get("data").is_none());
}
