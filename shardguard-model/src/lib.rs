//! Entity model for ShardGuard.
//!
//! Defines the types every tenant-scoped context is built from:
//! - [`Entity`]: the generic row container (id, type, data key, JSON payload)
//! - [`EntitySchema`]: declares an entity type's fields, unique keys, parent
//!   aggregate and its [`Isolation`] capability
//! - [`ModelBuilder`] / [`Model`]: validates the registered schemas once at
//!   startup and installs a [`QueryFilter`] on every isolated type
//! - [`DecimalSpec`]: the fixed precision/scale applied to decimal fields

mod decimal;
mod entity;
mod error;
mod filter;
mod model;
mod schema;

pub use decimal::{DecimalSpec, MONEY};
pub use entity::Entity;
pub use error::{ModelError, ModelResult};
pub use filter::{DataKeyScope, FilterClause, QueryFilter, DATA_KEY_COLUMN};
pub use model::{is_identifier, EntityModel, Model, ModelBuilder};
pub use schema::{EntitySchema, FieldDef, FieldType, Isolation, ParentLink, UniqueKey};
