//! Durable catalog of shards for ShardGuard.
//!
//! Entries are persisted in a small SQLite file so the catalog is separate
//! from every tenant database. A full snapshot is kept in memory, so lookups
//! made while resolving a request never touch the database; admin edits write
//! through to SQLite first and then replace the snapshot entry
//! (last writer wins per entry).

mod error;

pub use error::{RegistryError, RegistryResult};

use rusqlite::{params, Connection, OptionalExtension};
use shardguard_db::{ConnectionCatalog, ConnectionSettings, DbError};
use shardguard_types::{DatabaseType, ShardEntry};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, RwLock};
use tracing::{debug, info};

const MAX_NAME_LEN: usize = 128;

/// Whether an [`ShardRegistry::upsert`] added a new entry or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Persistent shard registry backed by SQLite.
pub struct ShardRegistry {
    conn: Mutex<Connection>,
    entries: RwLock<BTreeMap<String, ShardEntry>>,
    supported_engines: Vec<DatabaseType>,
    catalog: ConnectionCatalog,
}

impl ShardRegistry {
    /// Opens (or creates) a registry at the given path.
    ///
    /// Fails with [`RegistryError::Configuration`] if a stored entry names an
    /// engine this deployment does not support.
    pub fn open(path: &Path, settings: &ConnectionSettings) -> RegistryResult<Self> {
        let conn = Connection::open(path)?;
        let registry = Self::with_connection(conn, settings)?;
        info!(
            path = %path.display(),
            shards = registry.len()?,
            "Opened shard registry"
        );
        Ok(registry)
    }

    /// Opens an in-memory registry (for testing).
    pub fn open_in_memory(settings: &ConnectionSettings) -> RegistryResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, settings)
    }

    fn with_connection(conn: Connection, settings: &ConnectionSettings) -> RegistryResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS shards (
                name TEXT PRIMARY KEY NOT NULL,
                connection_name TEXT NOT NULL,
                database_name TEXT,
                database_type TEXT NOT NULL
            );
            ",
        )?;
        let registry = Self {
            conn: Mutex::new(conn),
            entries: RwLock::new(BTreeMap::new()),
            supported_engines: settings.supported_engines().to_vec(),
            catalog: settings.catalog().clone(),
        };
        registry.reload()?;
        Ok(registry)
    }

    /// Re-reads every entry from the database, replacing the in-memory snapshot.
    ///
    /// The connection lock is held until the snapshot is swapped, so an
    /// `upsert` or `delete` cannot land in between and be overwritten.
    pub fn reload(&self) -> RegistryResult<()> {
        let conn = self.conn.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let loaded = {
            let mut stmt = conn.prepare(
                "SELECT name, connection_name, database_name, database_type FROM shards ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?;

            let mut loaded = BTreeMap::new();
            for row in rows {
                let (name, connection_name, database_name, type_str) = row?;
                let database_type: DatabaseType = type_str.parse().map_err(|_| {
                    RegistryError::Configuration(format!(
                        "shard '{name}' uses unknown database type '{type_str}'"
                    ))
                })?;
                if !self.supported_engines.contains(&database_type) {
                    return Err(RegistryError::Configuration(format!(
                        "shard '{name}' uses unsupported database type '{database_type}'"
                    )));
                }
                loaded.insert(
                    name.clone(),
                    ShardEntry {
                        name,
                        connection_name,
                        database_name,
                        database_type,
                    },
                );
            }
            loaded
        };

        *self.entries.write().map_err(|_| RegistryError::LockPoisoned)? = loaded;
        drop(conn);
        Ok(())
    }

    /// All entries, ordered by name.
    pub fn list(&self) -> RegistryResult<Vec<ShardEntry>> {
        let entries = self.entries.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(entries.values().cloned().collect())
    }

    pub fn get(&self, name: &str) -> RegistryResult<ShardEntry> {
        let entries = self.entries.read().map_err(|_| RegistryError::LockPoisoned)?;
        entries
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    pub fn len(&self) -> RegistryResult<usize> {
        Ok(self.entries.read().map_err(|_| RegistryError::LockPoisoned)?.len())
    }

    pub fn is_empty(&self) -> RegistryResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Inserts or replaces the entry with `entry.name`.
    pub fn upsert(&self, entry: ShardEntry) -> RegistryResult<UpsertOutcome> {
        self.validate(&entry)?;

        let conn = self.conn.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let existed = conn
            .query_row(
                "SELECT 1 FROM shards WHERE name = ?1",
                params![entry.name],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        conn.execute(
            "INSERT INTO shards (name, connection_name, database_name, database_type)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name) DO UPDATE SET
                connection_name = excluded.connection_name,
                database_name = excluded.database_name,
                database_type = excluded.database_type",
            params![
                entry.name,
                entry.connection_name,
                entry.database_name,
                entry.database_type.as_str(),
            ],
        )?;

        let outcome = if existed {
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::Inserted
        };
        info!(shard = %entry.name, database_type = %entry.database_type, ?outcome, "Shard entry saved");
        self.entries
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?
            .insert(entry.name.clone(), entry);
        Ok(outcome)
    }

    /// Removes an entry. Connection strings already resolved from it are not
    /// tracked here; callers re-resolve on their next unit of work.
    pub fn delete(&self, name: &str) -> RegistryResult<()> {
        let conn = self.conn.lock().map_err(|_| RegistryError::LockPoisoned)?;
        let removed = conn.execute("DELETE FROM shards WHERE name = ?1", params![name])?;
        if removed == 0 {
            return Err(RegistryError::NotFound(name.to_string()));
        }
        self.entries
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?
            .remove(name);
        info!(shard = %name, "Shard entry deleted");
        Ok(())
    }

    /// Engine kinds an entry may use.
    pub fn supported_engines(&self) -> &[DatabaseType] {
        &self.supported_engines
    }

    /// Connection names an entry may refer to.
    pub fn connection_names(&self) -> Vec<String> {
        self.catalog.names().map(str::to_string).collect()
    }

    fn validate(&self, entry: &ShardEntry) -> RegistryResult<()> {
        let name = &entry.name;
        if name.is_empty() {
            return Err(RegistryError::Validation("name must not be empty".into()));
        }
        if name.trim() != name {
            return Err(RegistryError::Validation(format!(
                "name '{name}' has leading or trailing whitespace"
            )));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(RegistryError::Validation(format!(
                "name is longer than {MAX_NAME_LEN} bytes"
            )));
        }
        if !self.supported_engines.contains(&entry.database_type) {
            return Err(RegistryError::Validation(format!(
                "database type '{}' is not supported (supported: {})",
                entry.database_type,
                self.supported_engines
                    .iter()
                    .map(DatabaseType::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        if entry.connection_name.trim().is_empty() {
            return Err(RegistryError::Validation(format!(
                "shard '{name}' has no connection name"
            )));
        }
        if entry.database_name.as_deref().is_some_and(|db| db.trim().is_empty()) {
            return Err(RegistryError::Validation(format!(
                "shard '{name}' has an empty database name"
            )));
        }
        self.catalog.build(entry).map_err(|e| match e {
            DbError::UnknownConnection(conn) => RegistryError::Validation(format!(
                "shard '{name}' names unknown connection '{conn}'"
            )),
            other => RegistryError::Validation(format!("shard '{name}': {other}")),
        })?;
        debug!(shard = %name, "Shard entry validated");
        Ok(())
    }
}
