//! Core type definitions for ShardGuard.
//!
//! This crate defines the vocabulary shared by every other
//! ShardGuard crate:
//! - [`DataKey`] and [`DataKeyContext`], the per-unit-of-work isolation boundary
//! - [`ShardEntry`] and [`DatabaseType`], the rows of the shard registry
//! - [`Claims`] and [`Principal`], the caller identity handed to the resolver
//! - [`EntityId`] (UUID v7) for persisted rows

mod claims;
mod data_key;
mod ids;
mod shard;

pub use claims::{ActorKind, Claims, Principal, DATA_KEY_CLAIM, SHARD_NAME_CLAIM};
pub use data_key::{DataKey, DataKeyContext, ResolvedConnection};
pub use ids::EntityId;
pub use shard::{DatabaseType, ShardEntry};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown database type: {0}")]
    UnknownDatabaseType(String),
}
