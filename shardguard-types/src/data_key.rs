//! The isolation boundary carried by every unit of work.

use crate::DatabaseType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies the tenant (or tenant + hierarchy path) that owns a row.
///
/// `DenyAll` is the fail-closed value used when no tenant-bound caller is
/// present. It never equals a stored key, so reads under it return nothing
/// and writes under it are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum DataKey {
    Key(String),
    #[default]
    DenyAll,
}

impl DataKey {
    /// Builds a real key. Empty or whitespace-only input yields `DenyAll`.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.trim().is_empty() {
            Self::DenyAll
        } else {
            Self::Key(key)
        }
    }

    /// Returns the key string, or `None` for `DenyAll`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Key(k) => Some(k),
            Self::DenyAll => None,
        }
    }

    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        matches!(self, Self::DenyAll)
    }

    /// Whether a row stamped with `row_key` is visible under this key.
    #[must_use]
    pub fn permits(&self, row_key: &str) -> bool {
        match self {
            Self::Key(k) => k == row_key,
            Self::DenyAll => false,
        }
    }
}

impl From<Option<String>> for DataKey {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::DenyAll, Self::new)
    }
}

impl From<DataKey> for Option<String> {
    fn from(value: DataKey) -> Self {
        match value {
            DataKey::Key(k) => Some(k),
            DataKey::DenyAll => None,
        }
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => f.write_str(k),
            Self::DenyAll => f.write_str("<deny-all>"),
        }
    }
}

/// A connection resolved for one unit of work.
///
/// The connection string may embed credentials, so `Debug` does not print it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConnection {
    pub connection_string: String,
    pub database_type: DatabaseType,
}

impl ResolvedConnection {
    pub fn new(connection_string: impl Into<String>, database_type: DatabaseType) -> Self {
        Self {
            connection_string: connection_string.into(),
            database_type,
        }
    }
}

impl fmt::Debug for ResolvedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConnection")
            .field("connection_string", &"<redacted>")
            .field("database_type", &self.database_type)
            .finish()
    }
}

/// The data key and optional connection override for one unit of work.
///
/// Constructed once per request and never mutated afterwards. When
/// `connection` is `None` the process-wide default connection is used.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataKeyContext {
    data_key: DataKey,
    connection: Option<ResolvedConnection>,
}

impl DataKeyContext {
    /// The fail-closed context: no rows visible, all writes rejected.
    #[must_use]
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// A context for `data_key` on the default connection.
    #[must_use]
    pub fn for_key(data_key: DataKey) -> Self {
        Self {
            data_key,
            connection: None,
        }
    }

    /// Routes this context to a specific shard connection.
    #[must_use]
    pub fn with_connection(mut self, connection: ResolvedConnection) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn data_key(&self) -> &DataKey {
        &self.data_key
    }

    pub fn connection(&self) -> Option<&ResolvedConnection> {
        self.connection.as_ref()
    }
}
