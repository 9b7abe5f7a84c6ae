//! SQLite connection management for ShardGuard.
//!
//! - [`ConnectionString`] parses the `Key=Value;` strings stored in settings
//!   and produced for shards
//! - [`ConnectionCatalog`] holds the named templates shard entries refer to
//! - [`ConnectionSettings`] is the startup configuration (default connection,
//!   catalog, supported engines)
//! - [`open_connection`] turns a [`ResolvedConnection`] into a live connection

mod catalog;
mod connection_string;
mod error;
mod settings;

pub use catalog::ConnectionCatalog;
pub use connection_string::{CacheMode, ConnectionString, OpenMode, DATABASE_PLACEHOLDER};
pub use error::{DbError, DbResult};
pub use settings::{ConnectionSettings, SETTINGS_FILE};

use rusqlite::{Connection, OpenFlags};
use shardguard_types::{DatabaseType, ResolvedConnection};
use tracing::debug;

/// Opens a live connection for a resolved connection string.
///
/// File databases are switched to WAL so concurrent units of work on the same
/// shard can read while another commits. `SqliteMemory` databases are named
/// and shared-cache, so every context opened with the same data source sees
/// the same database for as long as one connection stays open.
pub fn open_connection(resolved: &ResolvedConnection) -> DbResult<Connection> {
    let cs = ConnectionString::parse(&resolved.connection_string)?;
    let memory = resolved.database_type == DatabaseType::SqliteMemory || cs.mode == OpenMode::Memory;

    let mut flags = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    flags |= match cs.mode {
        OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
        OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
        OpenMode::ReadWriteCreate | OpenMode::Memory => {
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
        }
    };

    let conn = if memory {
        let shared = resolved.database_type == DatabaseType::SqliteMemory || cs.cache == CacheMode::Shared;
        let uri = if shared {
            format!("file:{}?mode=memory&cache=shared", cs.data_source)
        } else {
            format!("file:{}?mode=memory", cs.data_source)
        };
        Connection::open_with_flags(uri, flags)?
    } else {
        if cs.cache == CacheMode::Shared {
            flags |= OpenFlags::SQLITE_OPEN_SHARED_CACHE;
        }
        Connection::open_with_flags(&cs.data_source, flags)?
    };

    conn.busy_timeout(cs.busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", cs.foreign_keys)?;
    if !memory && cs.mode != OpenMode::ReadOnly {
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(data_source = %cs.data_source, journal_mode = %mode, "Opened file database");
    } else {
        debug!(data_source = %cs.data_source, "Opened in-memory database");
    }
    Ok(conn)
}
