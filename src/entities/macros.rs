//! Macros for reducing boilerplate when declaring queryable entities

/// Implement [`QueryableEntity`](crate::core::entity::QueryableEntity) from field lists
///
/// # Example
/// ```rust,ignore
/// struct User;
///
/// impl_queryable_entity!(
///     User,
///     "users",
///     fields: ["id", "firstName", "lastName", "email", "createdAt"],
///     searchable: ["firstName", "lastName", "email"],
///     relations: ["roles"]
/// );
/// ```
///
/// `searchable` and `relations` may be omitted.
#[macro_export]
macro_rules! impl_queryable_entity {
    (
        $type:ty,
        $resource:expr,
        fields: [$($field:expr),* $(,)?]
        $(, searchable: [$($search:expr),* $(,)?])?
        $(, relations: [$($relation:expr),* $(,)?])?
        $(,)?
    ) => {
        impl $crate::core::entity::QueryableEntity for $type {
            fn resource_name() -> &'static str {
                $resource
            }

            fn query_fields() -> $crate::core::field::FieldSet {
                $crate::core::field::FieldSet::new([$($field),*])
            }

            fn searchable_fields() -> $crate::core::field::FieldSet {
                let fields: ::std::vec::Vec<&str> = ::std::vec![$($($search),*)?];
                $crate::core::field::FieldSet::new(fields)
            }

            fn relations() -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![$($($relation.to_string()),*)?]
            }
        }
    };
}
