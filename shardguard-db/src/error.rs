//! Error types for connection management.

use thiserror::Error;

/// Result type for connection operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur while building or opening connections.
#[derive(Debug, Error)]
pub enum DbError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// A shard names a connection template that is not configured.
    #[error("unknown connection name: {0}")]
    UnknownConnection(String),

    /// Settings are missing or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Settings file could not be parsed.
    #[error("settings parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
