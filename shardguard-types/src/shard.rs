//! Shard registry entries.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Storage engine behind a shard.
///
/// This is the closed set of engine kinds ShardGuard knows how to open.
/// A deployment may support only a subset (see the registry's supported
/// engine list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatabaseType {
    /// File-backed SQLite database.
    Sqlite,
    /// Named, shared-cache in-memory SQLite database.
    SqliteMemory,
}

impl DatabaseType {
    pub const ALL: [DatabaseType; 2] = [DatabaseType::Sqlite, DatabaseType::SqliteMemory];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::SqliteMemory => "sqlite-memory",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = Error;

    /// Accepts the kebab-case name or the PascalCase variant name, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "sqlitememory" => Ok(Self::SqliteMemory),
            _ => Err(Error::UnknownDatabaseType(s.to_string())),
        }
    }
}

/// One named physical database in the shard registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardEntry {
    /// Unique shard name; this is what a caller's shard claim refers to.
    pub name: String,
    /// Name of the connection template in the connection catalog.
    pub connection_name: String,
    /// Database substituted into the template, if the template needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    pub database_type: DatabaseType,
}

impl ShardEntry {
    pub fn new(
        name: impl Into<String>,
        connection_name: impl Into<String>,
        database_type: DatabaseType,
    ) -> Self {
        Self {
            name: name.into(),
            connection_name: connection_name.into(),
            database_name: None,
            database_type,
        }
    }

    #[must_use]
    pub fn with_database(mut self, database_name: impl Into<String>) -> Self {
        self.database_name = Some(database_name.into());
        self
    }
}
