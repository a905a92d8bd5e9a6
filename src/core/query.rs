//! Query specification, descriptor construction and pagination
//!
//! A [`QuerySpec`] is built once per request from raw parameters, turned
//! into exactly one [`QueryDescriptor`] for the data-access layer, and
//! used again to shape the fetched rows into a [`QueryResponse`].
//!
//! # Example
//! ```rust,ignore
//! let fields = FieldSet::new(["firstName", "lastName", "email", "createdAt"]);
//! let raw = RawParameters::new().with("q", "ann").with("page", "2");
//!
//! let spec = QuerySpec::from_raw_parameters(&raw, &fields)?;
//! let descriptor = spec.build_descriptor(
//!     &FieldSet::new(["firstName", "lastName"]),
//!     None,
//!     &[],
//! );
//! let (rows, total) = store.execute(&descriptor).await?;
//! let response = spec.build_response(rows, total);
//! ```
//!
//! # Parameters
//! | key | meaning | default |
//! |---|---|---|
//! | `q` | free-text search | none |
//! | `all` | bypass pagination | `false` |
//! | `page` | 1-based page number | `1` |
//! | `limit` | page size, at most 100 | `10` |
//! | `sortBy` | single sort field | `createdAt` |
//! | `order` | `ASC` or `DESC` | `DESC` |
//! | `sorts` | `field[:dir],…`, overrides `sortBy`/`order` | none |
//! | `dateRange.from`, `dateRange.to` | instant bounds on `createdAt` | none |
//! | `fields` | projection, `a,b,…` | all fields |

use crate::core::coerce;
use crate::core::error::ValidationError;
use crate::core::field::FieldSet;
use crate::core::filter::Filter;
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use validator::Validate;

/// Hard upper bound on the page size
pub const MAX_PAGE_SIZE: u32 = 100;

/// Names of the accepted query parameters
pub mod params {
    pub const SEARCH: &str = "q";
    pub const ALL: &str = "all";
    pub const PAGE: &str = "page";
    pub const LIMIT: &str = "limit";
    pub const SORT_BY: &str = "sortBy";
    pub const ORDER: &str = "order";
    pub const SORTS: &str = "sorts";
    pub const DATE_FROM: &str = "dateRange.from";
    pub const DATE_TO: &str = "dateRange.to";
    pub const FIELDS: &str = "fields";

    /// Key used for violations spanning both date bounds
    pub const DATE_RANGE: &str = "dateRange";

    pub const ALL_PARAMS: [&str; 10] = [
        SEARCH, ALL, PAGE, LIMIT, SORT_BY, ORDER, SORTS, DATE_FROM, DATE_TO, FIELDS,
    ];

    /// Parameters whose repeated occurrences are concatenated
    pub const LIST_PARAMS: [&str; 2] = [SORTS, FIELDS];
}

// =============================================================================
// Sorting
// =============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "ASC", alias = "asc", alias = "ASCENDING")]
    Ascending,
    #[serde(rename = "DESC", alias = "desc", alias = "DESCENDING")]
    Descending,
}

impl SortDirection {
    pub fn is_ascending(self) -> bool {
        matches!(self, SortDirection::Ascending)
    }
}

/// One sort key: a field and its direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

// =============================================================================
// Date range
// =============================================================================

/// Optional bounds on the creation instant of records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRangeFilter {
    /// Resolve the bounds into a closed interval
    ///
    /// A missing upper bound becomes `now`, a missing lower bound the Unix
    /// epoch. Returns `None` when neither bound is set.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Some((from, to)),
            (Some(from), None) => Some((from, now)),
            (None, Some(to)) => Some((DateTime::<Utc>::UNIX_EPOCH, to)),
            (None, None) => None,
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

/// Values applied when a parameter is omitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_page_sizes"))]
pub struct QueryDefaults {
    #[validate(range(min = 1, max = 100))]
    pub default_page_size: u32,

    #[validate(range(min = 1, max = 100))]
    pub max_page_size: u32,

    #[validate(length(min = 1))]
    pub default_sort_field: String,

    pub default_sort_direction: SortDirection,

    /// Field the date range applies to
    #[validate(length(min = 1))]
    pub date_field: String,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: MAX_PAGE_SIZE,
            default_sort_field: "createdAt".to_string(),
            default_sort_direction: SortDirection::Descending,
            date_field: "createdAt".to_string(),
        }
    }
}

fn validate_page_sizes(defaults: &QueryDefaults) -> Result<(), validator::ValidationError> {
    if defaults.default_page_size > defaults.max_page_size {
        let mut err = validator::ValidationError::new("default_page_size_exceeds_max");
        err.message = Some(Cow::from(format!(
            "default_page_size ({}) must not exceed max_page_size ({})",
            defaults.default_page_size, defaults.max_page_size
        )));
        return Err(err);
    }
    Ok(())
}

// =============================================================================
// Raw parameters
// =============================================================================

/// Untyped query parameters as received from the transport layer
///
/// Keys may repeat; values are JSON strings, numbers or booleans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawParameters(Vec<(String, Value)>);

impl RawParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.push((key.into(), value.into()));
    }

    /// Build from URL query pairs, every value kept as a string
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), Value::String(v.into())))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn grouped(&self) -> IndexMap<&str, Vec<&Value>> {
        let mut groups: IndexMap<&str, Vec<&Value>> = IndexMap::new();
        for (key, value) in self.iter() {
            groups.entry(key).or_default().push(value);
        }
        groups
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RawParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Descriptor
// =============================================================================

/// The (limit, offset) slice of an ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageWindow {
    pub limit: u32,
    pub offset: u64,
}

/// Storage-agnostic description of one query
///
/// Built by [`QuerySpec::build_descriptor`] and handed to a
/// [`QueryExecutor`](crate::core::store::QueryExecutor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// `None` means unconstrained
    pub filter: Option<Filter>,

    /// Sort keys, primary key first
    pub sort: Vec<SortKey>,

    /// `None` means every field
    pub projection: Option<IndexSet<String>>,

    /// `None` means the whole result set
    pub window: Option<PageWindow>,

    /// Related entities to load alongside each row
    pub relations: Vec<String>,
}

// =============================================================================
// Response
// =============================================================================

/// Pagination metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: u32,

    /// Number of items per page
    #[serde(rename = "limit")]
    pub page_size: u32,

    /// Total number of items matching the filters
    pub total_items: u64,

    /// Total number of pages
    pub total_pages: u64,

    pub has_next_page: bool,

    pub has_previous_page: bool,
}

impl PaginationMeta {
    pub fn new(page: u32, page_size: u32, total_items: u64) -> Self {
        // page_size is validated to be at least 1; max(1) keeps this total
        let total_pages = total_items.div_ceil(u64::from(page_size.max(1)));

        Self {
            page,
            page_size,
            total_items,
            total_pages,
            has_next_page: u64::from(page) < total_pages,
            has_previous_page: page > 1,
        }
    }
}

/// Rows plus optional pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse<T> {
    pub data: Vec<T>,

    /// Absent when every row was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

// =============================================================================
// QuerySpec
// =============================================================================

/// A validated, defaulted client query
///
/// Instances are immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySpec {
    search_text: Option<String>,
    return_all: bool,
    page: u32,
    page_size: u32,
    sort_field: String,
    sort_direction: SortDirection,
    multi_sort: Option<Vec<SortKey>>,
    date_range: Option<DateRangeFilter>,
    projected_fields: Option<IndexSet<String>>,
    date_field: String,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self::with_defaults(&QueryDefaults::default())
    }
}

impl QuerySpec {
    /// A spec with every parameter omitted
    pub fn with_defaults(defaults: &QueryDefaults) -> Self {
        Self {
            search_text: None,
            return_all: false,
            page: 1,
            page_size: defaults.default_page_size,
            sort_field: defaults.default_sort_field.clone(),
            sort_direction: defaults.default_sort_direction,
            multi_sort: None,
            date_range: None,
            projected_fields: None,
            date_field: defaults.date_field.clone(),
        }
    }

    /// Validate raw parameters against `fields` using the stock defaults
    pub fn from_raw_parameters(
        raw: &RawParameters,
        fields: &FieldSet,
    ) -> Result<Self, ValidationError> {
        Self::from_raw_parameters_with(raw, fields, &QueryDefaults::default())
    }

    /// Validate raw parameters against `fields`
    ///
    /// Every parameter is checked independently and all violations are
    /// returned together. Unknown keys are violations. Omitted parameters
    /// take their default; present-but-invalid ones never do.
    pub fn from_raw_parameters_with(
        raw: &RawParameters,
        fields: &FieldSet,
        defaults: &QueryDefaults,
    ) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let groups = raw.grouped();

        for (key, values) in &groups {
            if !params::ALL_PARAMS.contains(key) {
                errors.add(*key, format!("property {} should not exist", key));
            } else if values.len() > 1 && !params::LIST_PARAMS.contains(key) {
                errors.add(*key, format!("{} must be specified at most once", key));
            }
        }

        let single = |key: &str| groups.get(key).and_then(|values| values.first().copied());
        let all_of = |key: &str| groups.get(key).map(Vec::as_slice).unwrap_or(&[]);

        let mut spec = Self::with_defaults(defaults);

        if let Some(value) = single(params::SEARCH) {
            match coerce::to_text(value) {
                Ok(text) => spec.search_text = (!text.trim().is_empty()).then_some(text),
                Err(e) => errors.add(params::SEARCH, format!("{} {}", params::SEARCH, e)),
            }
        }

        if let Some(value) = single(params::ALL) {
            match coerce::to_bool(value) {
                Ok(flag) => spec.return_all = flag,
                Err(e) => errors.add(params::ALL, format!("{} {}", params::ALL, e)),
            }
        }

        if let Some(value) = single(params::PAGE) {
            match bounded(value, params::PAGE, 1, u32::MAX) {
                Ok(page) => spec.page = page,
                Err(message) => errors.add(params::PAGE, message),
            }
        }

        if let Some(value) = single(params::LIMIT) {
            let max = defaults.max_page_size.min(MAX_PAGE_SIZE);
            match bounded(value, params::LIMIT, 1, max) {
                Ok(size) => spec.page_size = size,
                Err(message) => errors.add(params::LIMIT, message),
            }
        }

        if let Some(value) = single(params::SORT_BY) {
            match coerce::to_text(value) {
                Ok(field) => {
                    let field = field.trim();
                    if fields.contains(field) {
                        spec.sort_field = field.to_string();
                    } else {
                        errors.add(params::SORT_BY, unknown_field(params::SORT_BY, field, fields));
                    }
                }
                Err(e) => errors.add(params::SORT_BY, format!("{} {}", params::SORT_BY, e)),
            }
        }

        if let Some(value) = single(params::ORDER) {
            match coerce::to_sort_direction(value) {
                Ok(direction) => spec.sort_direction = direction,
                Err(e) => errors.add(params::ORDER, format!("{} {}", params::ORDER, e)),
            }
        }

        spec.multi_sort = parse_sorts(all_of(params::SORTS), fields, &mut errors);
        spec.projected_fields = parse_projection(all_of(params::FIELDS), fields, &mut errors);
        spec.date_range = parse_date_range(
            single(params::DATE_FROM),
            single(params::DATE_TO),
            &mut errors,
        );

        // configured fallbacks must exist on the entity too
        let sort_omitted = single(params::SORT_BY).is_none()
            && spec.multi_sort.is_none()
            && !errors.has_field(params::SORTS);
        if sort_omitted && !fields.contains(&spec.sort_field) {
            errors.add(
                params::SORT_BY,
                format!(
                    "default sort field '{}' is not a field of this resource; expected one of: {}",
                    spec.sort_field,
                    fields.describe()
                ),
            );
        }
        if spec.date_range.is_some() && !fields.contains(&spec.date_field) {
            errors.add(
                params::DATE_RANGE,
                format!(
                    "date field '{}' is not a field of this resource; expected one of: {}",
                    spec.date_field,
                    fields.describe()
                ),
            );
        }

        if !errors.is_empty() {
            tracing::debug!(
                violations = errors.len(),
                fields = ?errors.fields().keys().collect::<Vec<_>>(),
                "rejected query parameters"
            );
        }
        errors.into_result(spec)
    }

    /// Build the descriptor, reading the clock for open-ended date ranges
    pub fn build_descriptor(
        &self,
        searchable_fields: &FieldSet,
        base_filter: Option<&Filter>,
        relations: &[String],
    ) -> QueryDescriptor {
        self.build_descriptor_at(Utc::now(), searchable_fields, base_filter, relations)
    }

    /// Build the descriptor with an explicit clock reading
    ///
    /// Search produces one branch per searchable field, each ANDed with
    /// the base filter; the branches are ORed. The date interval is then
    /// ANDed onto every branch.
    pub fn build_descriptor_at(
        &self,
        now: DateTime<Utc>,
        searchable_fields: &FieldSet,
        base_filter: Option<&Filter>,
        relations: &[String],
    ) -> QueryDescriptor {
        let filter = match &self.search_text {
            Some(text) if !searchable_fields.is_empty() => {
                Filter::any(searchable_fields.iter().map(|field| {
                    let condition = Filter::contains(field, text.as_str());
                    match base_filter {
                        Some(base) => base.clone().and(condition),
                        None => condition,
                    }
                }))
            }
            _ => base_filter.cloned(),
        };

        let filter = match self.date_range.as_ref().and_then(|range| range.resolve(now)) {
            Some((from, to)) => {
                let date = Filter::between(self.date_field.as_str(), from, to);
                Some(match filter {
                    Some(Filter::Or(branches)) => Filter::Or(
                        branches
                            .into_iter()
                            .map(|branch| branch.and(date.clone()))
                            .collect(),
                    ),
                    Some(single) => single.and(date),
                    None => date,
                })
            }
            None => filter,
        };

        let window = (!self.return_all).then(|| PageWindow {
            limit: self.page_size,
            offset: u64::from(self.page - 1) * u64::from(self.page_size),
        });

        tracing::trace!(
            search = self.search_text.is_some(),
            date_range = self.date_range.is_some(),
            paginated = window.is_some(),
            "built query descriptor"
        );

        QueryDescriptor {
            filter,
            sort: self.sort_keys(),
            projection: self.projected_fields.clone(),
            window,
            relations: relations.to_vec(),
        }
    }

    /// Wrap fetched rows into a response envelope
    ///
    /// Rows are returned as given; `total_matching` is ignored when every
    /// row was requested.
    pub fn build_response<T>(&self, rows: Vec<T>, total_matching: u64) -> QueryResponse<T> {
        QueryResponse {
            data: rows,
            pagination: self.pagination_meta(total_matching),
        }
    }

    /// Pagination metadata for `total_items`, `None` when returning all rows
    pub fn pagination_meta(&self, total_items: u64) -> Option<PaginationMeta> {
        (!self.return_all).then(|| PaginationMeta::new(self.page, self.page_size, total_items))
    }

    /// Effective sort keys: the multi-sort list if given, else the single pair
    pub fn sort_keys(&self) -> Vec<SortKey> {
        match &self.multi_sort {
            Some(keys) => keys.clone(),
            None => vec![SortKey::new(self.sort_field.clone(), self.sort_direction)],
        }
    }

    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref()
    }

    pub fn return_all(&self) -> bool {
        self.return_all
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn multi_sort(&self) -> Option<&[SortKey]> {
        self.multi_sort.as_deref()
    }

    pub fn date_range(&self) -> Option<&DateRangeFilter> {
        self.date_range.as_ref()
    }

    pub fn projected_fields(&self) -> Option<&IndexSet<String>> {
        self.projected_fields.as_ref()
    }

    pub fn date_field(&self) -> &str {
        &self.date_field
    }
}

fn bounded(value: &Value, key: &str, min: u32, max: u32) -> Result<u32, String> {
    let number = coerce::to_integer(value).map_err(|e| format!("{} {}", key, e))?;
    if number < i64::from(min) {
        return Err(format!("{} must not be less than {}", key, min));
    }
    if number > i64::from(max) {
        return Err(format!("{} must not be greater than {}", key, max));
    }
    u32::try_from(number).map_err(|_| format!("{} must not be greater than {}", key, max))
}

fn unknown_field(key: &str, field: &str, fields: &FieldSet) -> String {
    format!(
        "{} references unknown field '{}'; expected one of: {}",
        key,
        field,
        fields.describe()
    )
}

fn parse_sorts(
    values: &[&Value],
    fields: &FieldSet,
    errors: &mut ValidationError,
) -> Option<Vec<SortKey>> {
    let mut keys: Vec<SortKey> = Vec::new();
    let mut seen = IndexSet::new();
    let mut valid = true;

    for value in values {
        match coerce::to_sort_list(value) {
            Ok(entries) => {
                for key in entries {
                    if !fields.contains(&key.field) {
                        errors.add(params::SORTS, unknown_field(params::SORTS, &key.field, fields));
                        valid = false;
                    } else if !seen.insert(key.field.clone()) {
                        errors.add(
                            params::SORTS,
                            format!("{} lists field '{}' more than once", params::SORTS, key.field),
                        );
                        valid = false;
                    } else {
                        keys.push(key);
                    }
                }
            }
            Err(e) => {
                errors.add(params::SORTS, format!("{} {}", params::SORTS, e));
                valid = false;
            }
        }
    }

    (valid && !keys.is_empty()).then_some(keys)
}

fn parse_projection(
    values: &[&Value],
    fields: &FieldSet,
    errors: &mut ValidationError,
) -> Option<IndexSet<String>> {
    let mut projected = IndexSet::new();

    for value in values {
        match coerce::to_field_list(value) {
            Ok(names) => {
                for name in names {
                    if fields.contains(&name) {
                        projected.insert(name);
                    } else {
                        errors.add(params::FIELDS, unknown_field(params::FIELDS, &name, fields));
                    }
                }
            }
            Err(e) => errors.add(params::FIELDS, format!("{} {}", params::FIELDS, e)),
        }
    }

    (!projected.is_empty()).then_some(projected)
}

fn parse_date_range(
    from: Option<&Value>,
    to: Option<&Value>,
    errors: &mut ValidationError,
) -> Option<DateRangeFilter> {
    if from.is_none() && to.is_none() {
        return None;
    }

    let mut parse = |value: Option<&Value>, key: &str| {
        value.and_then(|v| match coerce::to_timestamp(v) {
            Ok(instant) => Some(instant),
            Err(e) => {
                errors.add(key, format!("{} {}", key, e));
                None
            }
        })
    };
    let range = DateRangeFilter {
        from: parse(from, params::DATE_FROM),
        to: parse(to, params::DATE_TO),
    };

    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            errors.add(
                params::DATE_RANGE,
                format!(
                    "{} must not be later than {}",
                    params::DATE_FROM,
                    params::DATE_TO
                ),
            );
        }
    }

    Some(range)
}
