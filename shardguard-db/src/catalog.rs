//! Named connection templates that shard entries refer to.

use crate::connection_string::{ConnectionString, DATABASE_PLACEHOLDER};
use crate::{DbError, DbResult};
use shardguard_types::{ResolvedConnection, ShardEntry};
use std::collections::BTreeMap;

/// The set of connection templates a shard entry may name.
///
/// A template is an ordinary connection string, optionally containing the
/// `{database}` placeholder that is filled from the entry's database name.
#[derive(Debug, Clone, Default)]
pub struct ConnectionCatalog {
    templates: BTreeMap<String, String>,
}

impl ConnectionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a template after checking that it parses.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) -> DbResult<()> {
        let name = name.into();
        let template = template.into();
        // Substitute a dummy name so placeholder templates can be checked too.
        ConnectionString::parse(&template.replace(DATABASE_PLACEHOLDER, "placeholder")).map_err(
            |e| DbError::Config(format!("connection template '{name}' is invalid: {e}")),
        )?;
        self.templates.insert(name, template);
        Ok(())
    }

    /// Connection names in stable (sorted) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Builds the live connection string for a shard entry.
    ///
    /// With a database name, the name fills the `{database}` placeholder or,
    /// when the template has none, replaces its `Data Source`. Without one,
    /// the template is used as-is and must not contain a placeholder.
    /// Database names may not contain `;` or `=`.
    pub fn build(&self, entry: &ShardEntry) -> DbResult<ResolvedConnection> {
        let template = self
            .template(&entry.connection_name)
            .ok_or_else(|| DbError::UnknownConnection(entry.connection_name.clone()))?;

        if let Some(db) = entry.database_name.as_deref() {
            if db.contains([';', '=']) {
                return Err(DbError::Config(format!(
                    "shard '{}' has a database name containing ';' or '='",
                    entry.name
                )));
            }
        }

        let connection_string = match entry.database_name.as_deref() {
            Some(db) if ConnectionString::has_placeholder(template) => {
                template.replace(DATABASE_PLACEHOLDER, db)
            }
            Some(db) => {
                let mut cs = ConnectionString::parse(template)?;
                cs.data_source = db.to_string();
                cs.to_string()
            }
            None if ConnectionString::has_placeholder(template) => {
                return Err(DbError::Config(format!(
                    "shard '{}' uses template '{}' which needs a database name",
                    entry.name, entry.connection_name
                )));
            }
            None => template.to_string(),
        };

        ConnectionString::parse(&connection_string)?;
        Ok(ResolvedConnection::new(connection_string, entry.database_type))
    }
}

impl FromIterator<(String, String)> for ConnectionCatalog {
    /// Collects without validation; use [`ConnectionCatalog::insert`] for checked inserts.
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            templates: iter.into_iter().collect(),
        }
    }
}
