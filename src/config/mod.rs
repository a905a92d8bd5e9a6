//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::core::field::{FieldSet, is_valid_field_name};
use crate::core::filter::Filter;
use crate::core::query::QueryDefaults;
use crate::core::service::ListOptions;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query configuration for one entity type
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EntityQueryConfig {
    /// Resource name (e.g., "users")
    #[validate(length(min = 1))]
    pub name: String,

    /// Fields clients may sort on or project
    #[validate(length(min = 1))]
    pub fields: Vec<String>,

    /// Fields the free-text search looks into
    #[serde(default)]
    pub searchable_fields: Vec<String>,

    /// Relations loaded with each row
    #[serde(default)]
    pub relations: Vec<String>,
}

impl EntityQueryConfig {
    pub fn field_set(&self) -> FieldSet {
        FieldSet::new(self.fields.iter().cloned())
    }

    pub fn searchable_set(&self) -> FieldSet {
        FieldSet::new(self.searchable_fields.iter().cloned())
    }

    /// List options for this entity, optionally constrained by `base_filter`
    pub fn list_options(&self, base_filter: Option<Filter>) -> ListOptions {
        ListOptions {
            searchable_fields: self.searchable_set(),
            base_filter,
            relations: self.relations.clone(),
        }
    }
}

/// Complete configuration for the query engine
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QueryConfig {
    /// Defaults applied to omitted parameters
    #[serde(default)]
    #[validate(nested)]
    pub defaults: QueryDefaults,

    /// Per-entity field declarations
    #[serde(default)]
    #[validate(nested)]
    pub entities: Vec<EntityQueryConfig>,
}

impl QueryConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                file: Some(path.to_string()),
                message,
            },
            other => other,
        })?;
        tracing::info!(path, entities = config.entities.len(), "loaded query config");
        Ok(config)
    }

    /// Load configuration from a YAML string
    ///
    /// The result is validated before it is returned.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Validate bounds, field names and cross-references
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| ConfigError::InvalidValue {
            field: "query config".to_string(),
            value: String::new(),
            message: e.to_string(),
        })?;

        let defaults = [
            ("defaults.default_sort_field", &self.defaults.default_sort_field),
            ("defaults.date_field", &self.defaults.date_field),
        ];
        for (field, name) in defaults {
            if !is_valid_field_name(name) {
                return Err(invalid_field_name(field.to_string(), name));
            }
        }

        for entity in &self.entities {
            if let Some(name) = entity
                .fields
                .iter()
                .chain(&entity.searchable_fields)
                .find(|name| !is_valid_field_name(name))
            {
                return Err(invalid_field_name(format!("{}.fields", entity.name), name));
            }

            let declared = entity.field_set();
            if let Some(missing) = entity
                .searchable_fields
                .iter()
                .find(|name| !declared.contains(name))
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.searchable_fields", entity.name),
                    value: missing.clone(),
                    message: "searchable field is not declared in fields".to_string(),
                });
            }

            if let Some((field, name)) = defaults
                .iter()
                .find(|(_, name)| !declared.contains(name))
            {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.{}", entity.name, field),
                    value: name.to_string(),
                    message: "default field is not declared in fields".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Find an entity declaration by resource name
    pub fn entity(&self, name: &str) -> Result<&EntityQueryConfig, ConfigError> {
        self.entities
            .iter()
            .find(|entity| entity.name == name)
            .ok_or_else(|| ConfigError::UnknownEntity {
                name: name.to_string(),
            })
    }

    /// Merge several configurations
    ///
    /// Entities are merged by name, later declarations replacing earlier
    /// ones; the defaults of the last configuration win.
    pub fn merge(configs: Vec<QueryConfig>) -> Self {
        let mut merged = QueryConfig::default();
        for config in configs {
            merged.defaults = config.defaults;
            for entity in config.entities {
                match merged.entities.iter_mut().find(|e| e.name == entity.name) {
                    Some(existing) => *existing = entity,
                    None => merged.entities.push(entity),
                }
            }
        }
        merged
    }
}

fn invalid_field_name(field: String, name: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        value: name.to_string(),
        message: "not a valid field name".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::SortDirection;

    const YAML: &str = r#"
defaults:
  default_page_size: 20
  max_page_size: 50
  default_sort_direction: ASC
entities:
  - name: users
    fields: [id, firstName, lastName, email, createdAt]
    searchable_fields: [firstName, lastName, email]
    relations: [roles]
"#;

    #[test]
    fn test_from_yaml_str() {
        let config = QueryConfig::from_yaml_str(YAML).unwrap();

        assert_eq!(config.defaults.default_page_size, 20);
        assert_eq!(config.defaults.max_page_size, 50);
        assert_eq!(config.defaults.default_sort_direction, SortDirection::Ascending);
        // omitted keys keep their defaults
        assert_eq!(config.defaults.default_sort_field, "createdAt");

        let users = config.entity("users").unwrap();
        assert_eq!(users.field_set().len(), 5);
        assert_eq!(users.list_options(None).relations, vec!["roles"]);
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = QueryConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.defaults, QueryDefaults::default());
        assert!(config.entities.is_empty());
    }

    #[test]
    fn test_unknown_entity() {
        let config = QueryConfig::from_yaml_str(YAML).unwrap();
        assert!(matches!(
            config.entity("orders"),
            Err(ConfigError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_defaults() {
        let yaml = "defaults:\n  max_page_size: 1000\n";
        assert!(matches!(
            QueryConfig::from_yaml_str(yaml),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rejects_undeclared_searchable_field() {
        let yaml = r#"
entities:
  - name: users
    fields: [id, email]
    searchable_fields: [nickname]
"#;
        match QueryConfig::from_yaml_str(yaml) {
            Err(ConfigError::InvalidValue { field, value, .. }) => {
                assert_eq!(field, "users.searchable_fields");
                assert_eq!(value, "nickname");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_undeclared_default_fields() {
        let yaml = r#"
entities:
  - name: tags
    fields: [id, label]
"#;
        match QueryConfig::from_yaml_str(yaml) {
            Err(ConfigError::InvalidValue { field, value, .. }) => {
                assert_eq!(field, "tags.defaults.default_sort_field");
                assert_eq!(value, "createdAt");
            }
            other => panic!("expected invalid value, got {other:?}"),
        }

        let yaml = r#"
defaults:
  default_sort_field: id
entities:
  - name: tags
    fields: [id, label]
"#;
        match QueryConfig::from_yaml_str(yaml) {
            Err(ConfigError::InvalidValue { field, .. }) => {
                assert_eq!(field, "tags.defaults.date_field")
            }
            other => panic!("expected invalid value, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_field_name() {
        let yaml = r#"
entities:
  - name: users
    fields: ["id", "drop table"]
"#;
        assert!(QueryConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_merge_replaces_entities_by_name() {
        let base = QueryConfig::from_yaml_str(YAML).unwrap();
        let overlay = QueryConfig::from_yaml_str(
            r#"
entities:
  - name: users
    fields: [id, email, createdAt]
  - name: orders
    fields: [id, total, createdAt]
"#,
        )
        .unwrap();

        let merged = QueryConfig::merge(vec![base, overlay]);
        assert_eq!(merged.entities.len(), 2);
        assert_eq!(
            merged.entity("users").unwrap().fields,
            vec!["id", "email", "createdAt"]
        );
        assert_eq!(merged.defaults, QueryDefaults::default());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            QueryConfig::from_yaml_str("entities: [name: ]]"),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_yaml_serialization() {
        let config = QueryConfig::from_yaml_str(YAML).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();

        let parsed = QueryConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(parsed.entities.len(), config.entities.len());
        assert_eq!(parsed.defaults, config.defaults);
    }
}
