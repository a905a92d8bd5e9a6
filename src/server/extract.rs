//! Axum extractor for validated list queries
//!
//! `ListQuery<T>` turns the URL query string into a [`QuerySpec`] for the
//! entity `T` before the handler runs. Invalid requests are rejected with
//! a 400 carrying the full field → messages mapping.

use crate::core::entity::QueryableEntity;
use crate::core::error::{QueryError, ValidationError};
use crate::core::query::{QuerySpec, RawParameters};
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use std::marker::PhantomData;

/// Validated query parameters for listing `T`
///
/// # Usage
///
/// ```rust,ignore
/// async fn list_users(
///     ListQuery(spec, ..): ListQuery<User>,
/// ) -> Result<Json<QueryResponse<Value>>, QueryError> {
///     find_and_count(&store, &spec, &User::list_options()).await.map(Json)
/// }
/// ```
pub struct ListQuery<T>(pub QuerySpec, pub PhantomData<T>);

impl<T> ListQuery<T> {
    pub fn new(spec: QuerySpec) -> Self {
        Self(spec, PhantomData)
    }

    pub fn into_inner(self) -> QuerySpec {
        self.0
    }
}

impl<T> std::ops::Deref for ListQuery<T> {
    type Target = QuerySpec;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ListQuery<T>
where
    S: Send + Sync,
    T: QueryableEntity,
{
    type Rejection = QueryError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs): Query<Vec<(String, String)>> = Query::try_from_uri(&parts.uri)
            .map_err(|e| ValidationError::single("query", e.body_text()))?;

        let raw = RawParameters::from_query_pairs(pairs);
        let spec =
            QuerySpec::from_raw_parameters_with(&raw, &T::query_fields(), &T::query_defaults())
                .inspect_err(|errors| {
                    tracing::debug!(
                        resource = T::resource_name(),
                        path = %parts.uri.path(),
                        violations = errors.len(),
                        "list query rejected"
                    );
                })?;

        Ok(ListQuery::new(spec))
    }
}
