//! Turns an authenticated caller's claims into a [`DataKeyContext`].
//!
//! Resolution never fails. Anything that cannot be resolved to exactly one
//! tenant and one shard degrades to [`DataKeyContext::deny_all`], which
//! reads nothing and may write nothing.

use shardguard_db::ConnectionCatalog;
use shardguard_registry::{RegistryError, ShardRegistry};
use shardguard_types::{ActorKind, DataKey, DataKeyContext, Principal, ShardEntry};
use std::sync::Arc;
use tracing::{debug, warn};

/// Source of shard entries for the resolver.
pub trait ShardLookup: Send + Sync {
    fn lookup(&self, name: &str) -> Result<ShardEntry, RegistryError>;
}

impl ShardLookup for ShardRegistry {
    fn lookup(&self, name: &str) -> Result<ShardEntry, RegistryError> {
        self.get(name)
    }
}

/// Maps callers to data keys and shard connections.
#[derive(Clone)]
pub struct DataKeyResolver {
    shards: Arc<dyn ShardLookup>,
    catalog: Arc<ConnectionCatalog>,
}

impl DataKeyResolver {
    pub fn new(shards: Arc<dyn ShardLookup>, catalog: Arc<ConnectionCatalog>) -> Self {
        Self { shards, catalog }
    }

    /// Resolves the context for one unit of work. `None` means no caller is
    /// authenticated.
    pub fn resolve(&self, caller: Option<&Principal>) -> DataKeyContext {
        let Some(principal) = caller.filter(|p| p.authenticated) else {
            debug!("No authenticated caller, using deny-all data key");
            return DataKeyContext::deny_all();
        };
        if principal.actor == ActorKind::Background {
            debug!("Background actor, using deny-all data key");
            return DataKeyContext::deny_all();
        }
        let Some(claim) = principal.claims.data_key() else {
            debug!("Caller has no data key claim, using deny-all data key");
            return DataKeyContext::deny_all();
        };

        let data_key = DataKey::new(claim);
        if data_key.is_deny_all() {
            warn!("Caller has a blank data key claim, using deny-all data key");
            return DataKeyContext::deny_all();
        }

        let Some(shard) = principal.claims.shard_name() else {
            return DataKeyContext::for_key(data_key);
        };
        if shard.trim().is_empty() {
            warn!(data_key = %data_key, "Caller has a blank shard claim, using deny-all data key");
            return DataKeyContext::deny_all();
        }

        let entry = match self.shards.lookup(shard) {
            Ok(entry) => entry,
            Err(RegistryError::NotFound(_)) => {
                warn!(data_key = %data_key, shard = %shard, "Shard not in registry, using deny-all data key");
                return DataKeyContext::deny_all();
            }
            Err(e) => {
                warn!(data_key = %data_key, shard = %shard, error = %e, "Shard lookup failed, using deny-all data key");
                return DataKeyContext::deny_all();
            }
        };

        match self.catalog.build(&entry) {
            Ok(connection) => {
                debug!(data_key = %data_key, shard = %shard, "Resolved shard connection");
                DataKeyContext::for_key(data_key).with_connection(connection)
            }
            Err(e) => {
                warn!(data_key = %data_key, shard = %shard, error = %e, "Cannot build shard connection, using deny-all data key");
                DataKeyContext::deny_all()
            }
        }
    }
}
