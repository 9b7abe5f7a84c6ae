//! Schema registration and query-filter installation.

use crate::decimal::MONEY;
use crate::filter::QueryFilter;
use crate::schema::{EntitySchema, FieldType};
use crate::{ModelError, ModelResult};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Collects entity schemas and validates them into a [`Model`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    schemas: Vec<EntitySchema>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entity(mut self, schema: EntitySchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Validates every schema and installs the data-key filters.
    ///
    /// Fails with [`ModelError::Configuration`] if any type has not opted
    /// into isolation, and for duplicate types, bad identifiers, unique keys
    /// over unknown fields, or parent links to unregistered types.
    pub fn build(self) -> ModelResult<Model> {
        let mut index = HashMap::new();
        let mut entities = Vec::with_capacity(self.schemas.len());

        for mut schema in self.schemas {
            let name = schema.entity_type.clone();
            check_identifier("entity type", &name)?;
            if name.starts_with("sqlite_") {
                return Err(ModelError::Configuration(format!(
                    "entity type '{name}' uses the reserved 'sqlite_' prefix"
                )));
            }
            if index.contains_key(&name) {
                return Err(ModelError::Configuration(format!(
                    "entity type '{name}' is registered twice"
                )));
            }
            if !schema.is_isolated() {
                return Err(ModelError::Configuration(format!(
                    "entity type '{name}' has not opted into data-key isolation"
                )));
            }

            let mut seen = HashSet::new();
            for field in &mut schema.fields {
                check_identifier("field", &field.name)?;
                if !seen.insert(field.name.clone()) {
                    return Err(ModelError::Configuration(format!(
                        "field '{name}.{}' is declared twice",
                        field.name
                    )));
                }
                if field.field_type == FieldType::Decimal {
                    field.decimal = Some(MONEY);
                }
            }

            for key in &schema.unique {
                if key.fields.is_empty() {
                    return Err(ModelError::Configuration(format!(
                        "unique key '{}' on '{name}' has no fields",
                        key.name
                    )));
                }
                check_identifier("unique key", &key.name)?;
                if let Some(missing) = key.fields.iter().find(|f| !seen.contains(*f)) {
                    return Err(ModelError::Configuration(format!(
                        "unique key '{}' on '{name}' names unknown field '{missing}'",
                        key.name
                    )));
                }
            }

            if let Some(parent) = &schema.parent {
                match schema.field_def(&parent.field) {
                    Some(f) if f.field_type == FieldType::Text => {}
                    Some(_) => {
                        return Err(ModelError::Configuration(format!(
                            "parent field '{name}.{}' must be a text field",
                            parent.field
                        )));
                    }
                    None => {
                        return Err(ModelError::Configuration(format!(
                            "parent field '{name}.{}' is not declared",
                            parent.field
                        )));
                    }
                }
            }

            debug!(entity_type = %name, "Installed data-key query filter");
            index.insert(name.clone(), entities.len());
            entities.push(EntityModel {
                filter: QueryFilter::new(&name),
                schema,
            });
        }

        // Parent links can point forward, so resolve them once everything is registered.
        for entity in &entities {
            if let Some(parent) = &entity.schema.parent {
                if !index.contains_key(&parent.entity_type) {
                    return Err(ModelError::Configuration(format!(
                        "entity type '{}' is a child of unregistered type '{}'",
                        entity.schema.entity_type, parent.entity_type
                    )));
                }
            }
        }

        Ok(Model { entities, index })
    }
}

/// Whether `s` can be used unquoted as a table, index or JSON field name.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(what: &str, s: &str) -> ModelResult<()> {
    if is_identifier(s) {
        Ok(())
    } else {
        Err(ModelError::Configuration(format!(
            "{what} name '{s}' must be an ASCII identifier"
        )))
    }
}

/// The validated set of entity types a context may touch.
///
/// Built once per process and shared between contexts (`Arc<Model>`).
#[derive(Debug)]
pub struct Model {
    entities: Vec<EntityModel>,
    index: HashMap<String, usize>,
}

impl Model {
    pub fn builder() -> ModelBuilder {
        ModelBuilder::new()
    }

    pub fn entity(&self, entity_type: &str) -> Option<&EntityModel> {
        self.index.get(entity_type).map(|i| &self.entities[*i])
    }

    /// Entity types in registration order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityModel> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// One registered entity type with its installed filter.
#[derive(Debug)]
pub struct EntityModel {
    schema: EntitySchema,
    filter: QueryFilter,
}

impl EntityModel {
    pub fn entity_type(&self) -> &str {
        &self.schema.entity_type
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn filter(&self) -> &QueryFilter {
        &self.filter
    }

    /// Physical table name.
    pub fn table_name(&self) -> &str {
        &self.schema.entity_type
    }

    /// Checks a payload against the schema and normalizes decimal fields in place.
    pub fn normalize(&self, data: &mut Value) -> ModelResult<()> {
        let entity_type = &self.schema.entity_type;
        let map = data.as_object_mut().ok_or_else(|| ModelError::Validation {
            entity_type: entity_type.clone(),
            field: "<root>".into(),
            reason: "payload must be a JSON object".into(),
        })?;

        for field in &self.schema.fields {
            let invalid = |reason: String| ModelError::Validation {
                entity_type: entity_type.clone(),
                field: field.name.clone(),
                reason,
            };

            let value = match map.get_mut(&field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(invalid("field is required".into()));
                }
                None | Some(Value::Null) => continue,
                Some(v) => v,
            };

            let ok = match field.field_type {
                FieldType::Text | FieldType::DateTime => value.is_string(),
                FieldType::Integer => value.is_i64() || value.is_u64(),
                FieldType::Number => value.is_number(),
                FieldType::Bool => value.is_boolean(),
                FieldType::Json => true,
                FieldType::Decimal => {
                    let spec = field.decimal.unwrap_or(MONEY);
                    *value = spec.normalize(value).map_err(invalid)?;
                    true
                }
            };
            if !ok {
                return Err(invalid(format!("expected {:?}, got {value}", field.field_type)));
            }
        }
        Ok(())
    }
}
