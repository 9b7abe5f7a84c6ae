//! Tenant-scoped unit of work for ShardGuard.
//!
//! A [`TenantDbContext`] is opened per request with the [`DataKeyContext`]
//! the resolver produced for the caller. It connects to the caller's shard
//! (or the default database), filters every read through the installed
//! data-key predicates, and stamps every write with the caller's key at
//! commit.
//!
//! Contexts are synchronous and single-owner. From async code, move one onto
//! a blocking worker:
//!
//! ```ignore
//! let rows = tokio::task::spawn_blocking(move || {
//!     let ctx = TenantDbContext::open(&options, key_ctx)?;
//!     ctx.query("invoice")?.all()
//! })
//! .await??;
//! ```
//!
//! [`DataKeyContext`]: shardguard_types::DataKeyContext

mod context;
mod error;
mod options;
mod query;
mod schema_sql;

pub use context::{Change, ContextState, TenantDbContext};
pub use error::{ContextError, ContextResult};
pub use options::ContextOptions;
pub use query::Query;
