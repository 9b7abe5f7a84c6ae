use crate::decimal::DecimalSpec;
use serde::{Deserialize, Serialize};

/// Whether an entity type participates in data-key isolation.
///
/// `Unscoped` is the default so that forgetting to opt in is caught by
/// [`ModelBuilder::build`](crate::ModelBuilder::build) instead of
/// silently producing an unfiltered table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Isolation {
    /// Rows carry a data key; reads are filtered and writes stamped.
    DataKey,
    #[default]
    Unscoped,
}

/// Describes an entity type's structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySchema {
    pub entity_type: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub isolation: Isolation,
    /// Uniqueness constraints. These are always scoped to one data key.
    #[serde(default)]
    pub unique: Vec<UniqueKey>,
    /// The aggregate this type belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
}

impl EntitySchema {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            fields: Vec::new(),
            isolation: Isolation::Unscoped,
            unique: Vec::new(),
            parent: None,
        }
    }

    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Opts this type into data-key isolation.
    #[must_use]
    pub fn isolated(mut self) -> Self {
        self.isolation = Isolation::DataKey;
        self
    }

    #[must_use]
    pub fn unique<I, S>(mut self, name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.push(UniqueKey {
            name: name.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Declares that `field` holds the id of a row of `entity_type`.
    #[must_use]
    pub fn child_of(mut self, entity_type: impl Into<String>, field: impl Into<String>) -> Self {
        self.parent = Some(ParentLink {
            entity_type: entity_type.into(),
            field: field.into(),
        });
        self
    }

    pub fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_isolated(&self) -> bool {
        self.isolation == Isolation::DataKey
    }
}

/// A named field inside an entity's JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Precision/scale for decimal fields. Assigned by the model builder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal: Option<DecimalSpec>,
}

impl FieldDef {
    fn simple(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            decimal: None,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::simple(name, FieldType::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::simple(name, FieldType::Integer)
    }

    pub fn number(name: &str) -> Self {
        Self::simple(name, FieldType::Number)
    }

    pub fn decimal(name: &str) -> Self {
        Self::simple(name, FieldType::Decimal)
    }

    pub fn bool(name: &str) -> Self {
        Self::simple(name, FieldType::Bool)
    }

    pub fn datetime(name: &str) -> Self {
        Self::simple(name, FieldType::DateTime)
    }

    pub fn json(name: &str) -> Self {
        Self::simple(name, FieldType::Json)
    }

    /// Marks the field as required (present and non-null).
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Integer,
    Number,
    /// Monetary/decimal value, stored at a fixed precision and scale.
    Decimal,
    Bool,
    /// RFC 3339 timestamp string.
    DateTime,
    Json,
}

/// A tenant-scoped uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueKey {
    pub name: String,
    pub fields: Vec<String>,
}

/// Link from a child type to its owning aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub entity_type: String,
    pub field: String,
}
