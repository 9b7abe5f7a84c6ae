//! Operator commands for the shard registry.
//!
//! Every command returns its output as pretty-printed JSON so the binary
//! stays a thin wrapper and the commands can be tested directly.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde::Serialize;
use shardguard_db::ConnectionSettings;
use shardguard_registry::{ShardRegistry, UpsertOutcome};
use shardguard_resolver::DataKeyResolver;
use shardguard_types::{Claims, DataKeyContext, DatabaseType, Principal, ShardEntry, DATA_KEY_CLAIM, SHARD_NAME_CLAIM};
use std::sync::Arc;
use tracing::info;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every shard entry
    List,

    /// Show one shard entry
    Get { name: String },

    /// Add a shard entry or replace the one with the same name
    Upsert {
        name: String,

        /// Name of the connection template
        #[arg(short, long, default_value = "DefaultConnection")]
        connection: String,

        /// Database substituted into the template
        #[arg(short, long)]
        database: Option<String>,

        /// Engine kind (sqlite, sqlite-memory)
        #[arg(short = 't', long = "type", default_value = "sqlite")]
        database_type: DatabaseType,
    },

    /// Remove a shard entry
    Delete { name: String },

    /// List connection template names entries may refer to
    Connections,

    /// List engine kinds this deployment supports
    Engines,

    /// Show what a caller with the given claims resolves to
    Resolve {
        /// Value of the DataKey claim
        #[arg(long)]
        data_key: Option<String>,

        /// Value of the ShardName claim
        #[arg(long)]
        shard: Option<String>,

        /// Resolve as a background job instead of an interactive user
        #[arg(long)]
        background: bool,
    },
}

/// What `resolve` reports. Connection strings are shown in full; this is an
/// operator tool.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ResolveReport {
    pub deny_all: bool,
    pub data_key: Option<String>,
    pub database_type: Option<DatabaseType>,
    pub connection_string: Option<String>,
}

impl From<&DataKeyContext> for ResolveReport {
    fn from(ctx: &DataKeyContext) -> Self {
        Self {
            deny_all: ctx.data_key().is_deny_all(),
            data_key: ctx.data_key().as_str().map(str::to_string),
            database_type: ctx.connection().map(|c| c.database_type),
            connection_string: ctx.connection().map(|c| c.connection_string.clone()),
        }
    }
}

pub struct Admin {
    registry: Arc<ShardRegistry>,
    resolver: DataKeyResolver,
}

impl Admin {
    pub fn new(settings: &ConnectionSettings, registry: ShardRegistry) -> Self {
        let registry = Arc::new(registry);
        let resolver = DataKeyResolver::new(registry.clone(), Arc::new(settings.catalog().clone()));
        Self { registry, resolver }
    }

    pub fn registry(&self) -> &ShardRegistry {
        &self.registry
    }

    /// Runs one command and returns its JSON output.
    pub fn run(&self, command: &Command) -> Result<String> {
        let output = match command {
            Command::List => serde_json::to_value(self.registry.list()?)?,
            Command::Get { name } => {
                let entry = self
                    .registry
                    .get(name)
                    .with_context(|| format!("looking up shard '{name}'"))?;
                serde_json::to_value(entry)?
            }
            Command::Upsert {
                name,
                connection,
                database,
                database_type,
            } => {
                let mut entry = ShardEntry::new(name.as_str(), connection.as_str(), *database_type);
                if let Some(db) = database {
                    entry = entry.with_database(db.as_str());
                }
                let outcome = self
                    .registry
                    .upsert(entry)
                    .with_context(|| format!("saving shard '{name}'"))?;
                info!(shard = %name, ?outcome, "Upsert complete");
                serde_json::json!({
                    "name": name,
                    "outcome": match outcome {
                        UpsertOutcome::Inserted => "inserted",
                        UpsertOutcome::Replaced => "replaced",
                    },
                })
            }
            Command::Delete { name } => {
                self.registry
                    .delete(name)
                    .with_context(|| format!("deleting shard '{name}'"))?;
                serde_json::json!({ "name": name, "outcome": "deleted" })
            }
            Command::Connections => serde_json::to_value(self.registry.connection_names())?,
            Command::Engines => serde_json::to_value(self.registry.supported_engines())?,
            Command::Resolve {
                data_key,
                shard,
                background,
            } => {
                let mut claims = Claims::new();
                if let Some(k) = data_key {
                    claims.insert(DATA_KEY_CLAIM, k.as_str());
                }
                if let Some(s) = shard {
                    claims.insert(SHARD_NAME_CLAIM, s.as_str());
                }
                let principal = if *background {
                    Principal::background(claims)
                } else {
                    Principal::user(claims)
                };
                let ctx = self.resolver.resolve(Some(&principal));
                serde_json::to_value(ResolveReport::from(&ctx))?
            }
        };
        Ok(serde_json::to_string_pretty(&output)?)
    }
}
