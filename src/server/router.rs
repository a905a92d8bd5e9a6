//! List routes backed by a query executor

use crate::core::entity::QueryableEntity;
use crate::core::error::QueryError;
use crate::core::response::ApiResponse;
use crate::core::service::find_and_count;
use crate::core::store::QueryExecutor;
use crate::server::extract::ListQuery;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// `GET /{resource}` for entity `T`, rows of type `R` fetched from `executor`
pub fn list_router<T, R, E>(executor: Arc<E>) -> Router
where
    T: QueryableEntity,
    R: Serialize + Send + 'static,
    E: QueryExecutor<R> + 'static,
{
    let path = format!("/{}", T::resource_name());
    Router::new()
        .route(&path, get(list_handler::<T, R, E>))
        .with_state(executor)
}

/// Handler answering a list request with the standard envelope
pub async fn list_handler<T, R, E>(
    State(executor): State<Arc<E>>,
    ListQuery(spec, ..): ListQuery<T>,
) -> Result<Json<ApiResponse<Vec<R>>>, QueryError>
where
    T: QueryableEntity,
    R: Serialize + Send + 'static,
    E: QueryExecutor<R> + 'static,
{
    let response = find_and_count(executor.as_ref(), &spec, &T::list_options()).await?;
    Ok(Json(ApiResponse::paginated(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct Note;

    crate::impl_queryable_entity!(Note, "notes", fields: ["id", "title", "createdAt"], searchable: ["title"]);

    fn app() -> Router {
        let store = InMemoryStore::with_records(vec![
            json!({ "id": 1, "title": "groceries", "createdAt": "2024-05-01T08:00:00Z" }),
            json!({ "id": 2, "title": "gym", "createdAt": "2024-05-02T08:00:00Z" }),
        ]);
        list_router::<Note, Value, _>(Arc::new(store))
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_route_uses_resource_name() {
        let (status, body) = get_json("/notes?q=gro").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"], json!([{ "id": 1, "title": "groceries", "createdAt": "2024-05-01T08:00:00Z" }]));
        assert_eq!(body["meta"]["pagination"]["totalItems"], json!(1));
    }

    #[tokio::test]
    async fn test_rejection_is_bad_request() {
        let (status, body) = get_json("/notes?sortBy=secret&limit=500").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert!(body["details"]["fields"]["sortBy"].is_array());
        assert!(body["details"]["fields"]["limit"].is_array());
    }
}
