//! List service tying a spec, a store and the response shape together

use crate::core::error::QueryError;
use crate::core::field::FieldSet;
use crate::core::filter::Filter;
use crate::core::query::{QueryResponse, QuerySpec};
use crate::core::store::QueryExecutor;

/// Per-endpoint inputs to descriptor construction
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Fields the free-text search looks into
    pub searchable_fields: FieldSet,

    /// Constraint every result must satisfy (e.g. tenant or status)
    pub base_filter: Option<Filter>,

    /// Related entities to load with each row
    pub relations: Vec<String>,
}

impl ListOptions {
    pub fn new(searchable_fields: FieldSet) -> Self {
        Self {
            searchable_fields,
            ..Self::default()
        }
    }

    pub fn with_base_filter(mut self, filter: Filter) -> Self {
        self.base_filter = Some(filter);
        self
    }

    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = relations.into_iter().map(Into::into).collect();
        self
    }
}

/// Find one page of rows and the total match count
///
/// Builds the descriptor from `spec`, runs it on `executor` and shapes the
/// result. Storage failures are returned unchanged as [`QueryError::Storage`].
pub async fn find_and_count<T, E>(
    executor: &E,
    spec: &QuerySpec,
    options: &ListOptions,
) -> Result<QueryResponse<T>, QueryError>
where
    E: QueryExecutor<T> + ?Sized,
{
    let descriptor = spec.build_descriptor(
        &options.searchable_fields,
        options.base_filter.as_ref(),
        &options.relations,
    );

    let (rows, total) = executor.execute(&descriptor).await.map_err(|e| {
        tracing::warn!(error = %e, "query execution failed");
        QueryError::Storage(e)
    })?;

    tracing::debug!(
        returned = rows.len(),
        total,
        page = spec.page(),
        "query executed"
    );

    Ok(spec.build_response(rows, total))
}
