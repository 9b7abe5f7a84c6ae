//! Error types for the shard registry.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No entry with this name.
    #[error("shard not found: {0}")]
    NotFound(String),

    /// An entry offered to `upsert` is malformed. The registry is unchanged.
    #[error("invalid shard entry: {0}")]
    Validation(String),

    /// A stored entry cannot be used by this deployment.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("registry lock poisoned")]
    LockPoisoned,
}
