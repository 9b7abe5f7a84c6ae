use crate::ContextResult;
use shardguard_db::ConnectionSettings;
use shardguard_model::{EntitySchema, Model};
use shardguard_types::ResolvedConnection;
use std::sync::Arc;

/// Everything a context needs besides the caller's data key.
///
/// Built once at startup and cloned into every request.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    model: Arc<Model>,
    default_connection: ResolvedConnection,
}

impl ContextOptions {
    pub fn new(settings: &ConnectionSettings, model: Arc<Model>) -> Self {
        Self {
            model,
            default_connection: settings.default_connection().clone(),
        }
    }

    /// Builds the model from `schemas` and fails if any of them is unusable,
    /// in particular if one has not opted into data-key isolation.
    pub fn from_schemas(
        settings: &ConnectionSettings,
        schemas: impl IntoIterator<Item = EntitySchema>,
    ) -> ContextResult<Self> {
        let model = schemas
            .into_iter()
            .fold(Model::builder(), |b, s| b.entity(s))
            .build()?;
        Ok(Self::new(settings, Arc::new(model)))
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Used when the caller's data-key context carries no shard connection.
    pub fn default_connection(&self) -> &ResolvedConnection {
        &self.default_connection
    }
}
