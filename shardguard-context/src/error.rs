//! Error types for tenant-scoped contexts.

use crate::ContextState;
use shardguard_db::DbError;
use shardguard_model::ModelError;
use shardguard_types::EntityId;
use thiserror::Error;

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

#[derive(Debug, Error)]
pub enum ContextError {
    /// The entity model is unusable. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A write would touch another tenant's data. The whole commit is aborted.
    #[error("isolation violation on {entity_type} {id}: {reason}")]
    IsolationViolation {
        entity_type: String,
        id: EntityId,
        reason: String,
    },

    /// An entity payload does not fit its schema.
    #[error("invalid value for {entity_type}.{field}: {reason}")]
    Validation {
        entity_type: String,
        field: String,
        reason: String,
    },

    /// The entity type is not part of this context's model.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// An update or delete matched no row visible to this context.
    #[error("{entity_type} {id} not found")]
    NotFound { entity_type: String, id: EntityId },

    /// The operation is not allowed in the context's current state.
    #[error("cannot {operation} a context in state {state}")]
    InvalidState {
        state: ContextState,
        operation: &'static str,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A uniqueness or other database constraint rejected the commit.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("connection error: {0}")]
    Connection(#[from] DbError),

    #[error("database error: {0}")]
    Database(rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for ContextError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(msg.unwrap_or_else(|| e.to_string()))
            }
            other => Self::Database(other),
        }
    }
}

impl From<ModelError> for ContextError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Configuration(msg) => Self::Configuration(msg),
            ModelError::Validation {
                entity_type,
                field,
                reason,
            } => Self::Validation {
                entity_type,
                field,
                reason,
            },
        }
    }
}
