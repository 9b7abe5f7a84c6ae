//! DDL for the tables backing each entity type.

use rusqlite::Connection;
use shardguard_model::{EntityModel, Model, DATA_KEY_COLUMN};

/// `json_extract(data, '$.field')`. Field names are validated identifiers.
pub(crate) fn json_field(field: &str) -> String {
    format!("json_extract(data, '$.{field}')")
}

/// Creates any missing tables and indexes. Idempotent.
pub(crate) fn ensure_schema(conn: &Connection, model: &Model) -> rusqlite::Result<()> {
    let ddl: String = model.entities().map(entity_ddl).collect();
    conn.execute_batch(&ddl)
}

/// Rows are keyed by `(data_key, id)`. An id is only unique within its tenant,
/// so a collision in one tenant says nothing about rows in another.
fn entity_ddl(entity: &EntityModel) -> String {
    let table = entity.table_name();
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            id TEXT NOT NULL,
            {DATA_KEY_COLUMN} TEXT NOT NULL,
            data TEXT NOT NULL CHECK (json_valid(data)),
            created_at INTEGER NOT NULL,
            modified_at INTEGER NOT NULL,
            PRIMARY KEY ({DATA_KEY_COLUMN}, id)
        );
        "
    );

    for key in &entity.schema().unique {
        let columns: Vec<String> = key.fields.iter().map(|f| json_field(f)).collect();
        sql.push_str(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{table}_{}\" ON \"{table}\"({DATA_KEY_COLUMN}, {});\n",
            key.name,
            columns.join(", ")
        ));
    }

    if let Some(parent) = &entity.schema().parent {
        sql.push_str(&format!(
            "CREATE INDEX IF NOT EXISTS \"idx_{table}_{}\" ON \"{table}\"({DATA_KEY_COLUMN}, {});\n",
            parent.field,
            json_field(&parent.field)
        ));
    }
    sql
}
