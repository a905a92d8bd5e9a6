//! Entity trait describing what a record type exposes to queries

use crate::core::field::FieldSet;
use crate::core::query::QueryDefaults;
use crate::core::service::ListOptions;

/// A record type that list endpoints can query
///
/// Stands in for reflection: the implementor states its field names once
/// and every request is validated against them.
///
/// Usually implemented with [`impl_queryable_entity!`](crate::impl_queryable_entity).
pub trait QueryableEntity: Send + Sync + 'static {
    /// The plural resource name used in URLs (e.g., "users")
    fn resource_name() -> &'static str;

    /// Every field that may appear in `sortBy`, `sorts` or `fields`
    fn query_fields() -> FieldSet;

    /// Fields the free-text search looks into
    fn searchable_fields() -> FieldSet {
        FieldSet::empty()
    }

    /// Relations loaded with each row
    fn relations() -> Vec<String> {
        Vec::new()
    }

    /// Defaults applied to omitted parameters
    fn query_defaults() -> QueryDefaults {
        QueryDefaults::default()
    }

    /// List options built from the declarations above
    fn list_options() -> ListOptions {
        ListOptions::new(Self::searchable_fields()).with_relations(Self::relations())
    }
}
