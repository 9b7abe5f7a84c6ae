use serde::{Deserialize, Serialize};
use shardguard_types::EntityId;

/// A row of any registered entity type.
///
/// `data_key` is `None` until the owning context stamps it at commit time.
/// Child rows (e.g. invoice line items) carry the same key as their aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    #[serde(default)]
    pub data_key: Option<String>,
    pub data: serde_json::Value,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub modified_at: i64,
}

impl Entity {
    /// A new, unstamped entity with a fresh id.
    pub fn new(entity_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: EntityId::new(),
            entity_type: entity_type.into(),
            data_key: None,
            data,
            created_at: 0,
            modified_at: 0,
        }
    }

    #[must_use]
    pub fn with_data_key(mut self, data_key: impl Into<String>) -> Self {
        self.data_key = Some(data_key.into());
        self
    }

    /// Extract a string value from `data` using a JSON pointer (e.g., "/name").
    pub fn get_str(&self, pointer: &str) -> Option<&str> {
        self.data.pointer(pointer).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, pointer: &str) -> Option<bool> {
        self.data.pointer(pointer).and_then(|v| v.as_bool())
    }

    pub fn get_number(&self, pointer: &str) -> Option<f64> {
        self.data.pointer(pointer).and_then(|v| v.as_f64())
    }

    pub fn get_i64(&self, pointer: &str) -> Option<i64> {
        self.data.pointer(pointer).and_then(|v| v.as_i64())
    }

    /// Sets a top-level field, turning `data` into an object if needed.
    pub fn set(&mut self, field: &str, value: serde_json::Value) {
        if !self.data.is_object() {
            self.data = serde_json::Value::Object(serde_json::Map::new());
        }
        if let Some(map) = self.data.as_object_mut() {
            map.insert(field.to_string(), value);
        }
    }
}
