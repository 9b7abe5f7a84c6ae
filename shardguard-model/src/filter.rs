//! The data-key predicate installed on every isolated entity type.

use shardguard_types::{DataKey, DataKeyContext};

/// Column every isolated table carries.
pub const DATA_KEY_COLUMN: &str = "data_key";

/// Anything that can report the data key queries should be scoped to.
///
/// Filters read the key through this trait on every query rather than
/// capturing it when they are installed.
pub trait DataKeyScope {
    fn data_key(&self) -> &DataKey;
}

impl DataKeyScope for DataKey {
    fn data_key(&self) -> &DataKey {
        self
    }
}

impl DataKeyScope for DataKeyContext {
    fn data_key(&self) -> &DataKey {
        DataKeyContext::data_key(self)
    }
}

/// `row.data_key == scope.data_key`, for one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    entity_type: String,
}

/// A rendered filter: a SQL boolean expression plus its bound parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterClause {
    pub sql: String,
    pub param: Option<String>,
}

impl QueryFilter {
    pub(crate) fn new(entity_type: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    /// Renders the predicate for the scope's current key.
    ///
    /// `DenyAll` renders as a constant-false expression, so no stored value
    /// can ever satisfy it.
    pub fn clause(&self, scope: &dyn DataKeyScope) -> FilterClause {
        match scope.data_key() {
            DataKey::Key(k) => FilterClause {
                sql: format!("{DATA_KEY_COLUMN} = ?"),
                param: Some(k.clone()),
            },
            DataKey::DenyAll => FilterClause {
                sql: "0".to_string(),
                param: None,
            },
        }
    }

    /// Evaluates the predicate against an in-memory row key.
    pub fn matches(&self, scope: &dyn DataKeyScope, row_key: Option<&str>) -> bool {
        row_key.is_some_and(|k| scope.data_key().permits(k))
    }
}
