//! Process-wide connection settings, read once at startup from `shardguard.toml`.
//!
//! ```toml
//! [database]
//! default_connection = "Data Source=data/main.db"
//! default_database_type = "sqlite"
//! supported_engines = ["sqlite", "sqlite-memory"]
//!
//! [connections]
//! DefaultConnection = "Data Source=data/{database}.db"
//! MemoryConnection = "Data Source={database};Mode=Memory"
//! ```

use crate::catalog::ConnectionCatalog;
use crate::connection_string::ConnectionString;
use crate::{DbError, DbResult};
use serde::Deserialize;
use shardguard_types::{DatabaseType, ResolvedConnection};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Default settings file name.
pub const SETTINGS_FILE: &str = "shardguard.toml";

/// Startup configuration: the default connection, the connection catalog,
/// and the engines this deployment accepts for shards.
///
/// Immutable after startup; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    default_connection: ResolvedConnection,
    supported_engines: Vec<DatabaseType>,
    catalog: ConnectionCatalog,
}

impl ConnectionSettings {
    /// Settings with only a default connection and every known engine enabled.
    pub fn new(default_connection: impl Into<String>, database_type: DatabaseType) -> DbResult<Self> {
        let default_connection = default_connection.into();
        ConnectionString::parse(&default_connection)
            .map_err(|e| DbError::Config(format!("default connection is invalid: {e}")))?;
        Ok(Self {
            default_connection: ResolvedConnection::new(default_connection, database_type),
            supported_engines: DatabaseType::ALL.to_vec(),
            catalog: ConnectionCatalog::new(),
        })
    }

    /// Adds a named connection template.
    pub fn with_connection(mut self, name: impl Into<String>, template: impl Into<String>) -> DbResult<Self> {
        self.catalog.insert(name, template)?;
        Ok(self)
    }

    /// Restricts the engines shard entries may use.
    pub fn with_supported_engines(mut self, engines: impl IntoIterator<Item = DatabaseType>) -> Self {
        let mut engines: Vec<_> = engines.into_iter().collect();
        engines.sort();
        engines.dedup();
        self.supported_engines = engines;
        self
    }

    /// Loads settings from a TOML file. A missing file is an error: there is
    /// no safe implicit default connection.
    pub fn load_from(path: &Path) -> DbResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DbError::Config(format!("cannot read settings file {}: {e}", path.display()))
        })?;
        let settings = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            connections = settings.catalog.names().count(),
            "Loaded connection settings"
        );
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> DbResult<Self> {
        let file: SettingsFile = toml::from_str(contents)?;
        file.into_settings()
    }

    pub fn default_connection(&self) -> &ResolvedConnection {
        &self.default_connection
    }

    pub fn supported_engines(&self) -> &[DatabaseType] {
        &self.supported_engines
    }

    pub fn is_supported(&self, database_type: DatabaseType) -> bool {
        self.supported_engines.contains(&database_type)
    }

    pub fn catalog(&self) -> &ConnectionCatalog {
        &self.catalog
    }
}

/// Raw TOML structure matching the settings file format.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    database: DatabaseSection,
    #[serde(default)]
    connections: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabaseSection {
    default_connection: String,
    #[serde(default = "default_database_type")]
    default_database_type: DatabaseType,
    #[serde(default)]
    supported_engines: Option<Vec<DatabaseType>>,
}

fn default_database_type() -> DatabaseType {
    DatabaseType::Sqlite
}

impl SettingsFile {
    fn into_settings(self) -> DbResult<ConnectionSettings> {
        let mut settings = ConnectionSettings::new(
            self.database.default_connection,
            self.database.default_database_type,
        )?;
        if let Some(engines) = self.database.supported_engines {
            if engines.is_empty() {
                return Err(DbError::Config("supported_engines must not be empty".into()));
            }
            settings = settings.with_supported_engines(engines);
        }
        if !settings.is_supported(settings.default_connection.database_type) {
            return Err(DbError::Config(format!(
                "default connection engine '{}' is not in supported_engines",
                settings.default_connection.database_type
            )));
        }
        for (name, template) in self.connections {
            settings.catalog.insert(name, template)?;
        }
        Ok(settings)
    }
}
