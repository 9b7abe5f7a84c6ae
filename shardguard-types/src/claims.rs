//! Caller identity as seen by the data-key resolver.
//!
//! The claims provider is external; ShardGuard only reads the two logical
//! fields named by [`DATA_KEY_CLAIM`] and [`SHARD_NAME_CLAIM`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Claim carrying the caller's data key.
pub const DATA_KEY_CLAIM: &str = "DataKey";

/// Claim carrying the name of the shard that holds the caller's tenant.
pub const SHARD_NAME_CLAIM: &str = "ShardName";

/// An opaque bag of claim type to claim value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(BTreeMap<String, String>);

impl Claims {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(claim_type, value);
        self
    }

    pub fn insert(&mut self, claim_type: impl Into<String>, value: impl Into<String>) {
        self.0.insert(claim_type.into(), value.into());
    }

    pub fn get(&self, claim_type: &str) -> Option<&str> {
        self.0.get(claim_type).map(String::as_str)
    }

    pub fn data_key(&self) -> Option<&str> {
        self.get(DATA_KEY_CLAIM)
    }

    pub fn shard_name(&self) -> Option<&str> {
        self.get(SHARD_NAME_CLAIM)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Whether the caller is a person behind a request or a background job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    #[default]
    Interactive,
    Background,
}

/// The caller of one unit of work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub authenticated: bool,
    #[serde(default)]
    pub actor: ActorKind,
    #[serde(default)]
    pub claims: Claims,
}

impl Principal {
    /// An authenticated interactive user with the given claims.
    pub fn user(claims: Claims) -> Self {
        Self {
            authenticated: true,
            actor: ActorKind::Interactive,
            claims,
        }
    }

    /// A background or service actor. These never receive tenant access.
    pub fn background(claims: Claims) -> Self {
        Self {
            authenticated: true,
            actor: ActorKind::Background,
            claims,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}
