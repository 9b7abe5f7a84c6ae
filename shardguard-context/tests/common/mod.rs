#![allow(dead_code)]

use serde_json::{json, Value};
use shardguard_context::{ContextOptions, TenantDbContext};
use shardguard_db::ConnectionSettings;
use shardguard_model::{Entity, EntitySchema, FieldDef, Model};
use shardguard_types::{DataKey, DataKeyContext, DatabaseType, ShardEntry};
use std::sync::Arc;
use tempfile::TempDir;

pub fn company() -> EntitySchema {
    EntitySchema::new("company")
        .field(FieldDef::text("company_name").required())
        .field(FieldDef::bool("active"))
        .unique("uq_company_name", ["company_name"])
        .isolated()
}

pub fn invoice() -> EntitySchema {
    EntitySchema::new("invoice")
        .field(FieldDef::text("invoice_name").required())
        .field(FieldDef::text("status"))
        .field(FieldDef::datetime("date_created"))
        .isolated()
}

pub fn line_item() -> EntitySchema {
    EntitySchema::new("line_item")
        .field(FieldDef::text("invoice_id").required())
        .field(FieldDef::text("item_name"))
        .field(FieldDef::integer("num_items"))
        .field(FieldDef::decimal("item_price"))
        .field(FieldDef::decimal("total_price"))
        .child_of("invoice", "invoice_id")
        .isolated()
}

pub fn model() -> Model {
    Model::builder()
        .entity(company())
        .entity(invoice())
        .entity(line_item())
        .build()
        .unwrap()
}

/// A default database plus a shard template, all inside one temp dir.
pub struct Fixture {
    pub dir: TempDir,
    pub settings: ConnectionSettings,
    pub options: ContextOptions,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().display().to_string();
        let settings = ConnectionSettings::new(format!("Data Source={root}/main.db"), DatabaseType::Sqlite)
            .unwrap()
            .with_connection("DefaultConnection", format!("Data Source={root}/{{database}}.db"))
            .unwrap()
            .with_connection("MemoryConnection", "Data Source={database};Mode=Memory")
            .unwrap();
        let options = ContextOptions::new(&settings, Arc::new(model()));
        Self { dir, settings, options }
    }

    pub fn open(&self, key: &str) -> TenantDbContext {
        self.open_scope(tenant(key))
    }

    pub fn open_scope(&self, scope: DataKeyContext) -> TenantDbContext {
        TenantDbContext::open(&self.options, scope).unwrap()
    }

    /// A scope for `key` whose connection points at shard database `database`.
    pub fn shard_scope(&self, key: &str, connection: &str, database: &str, database_type: DatabaseType) -> DataKeyContext {
        let entry = ShardEntry::new(database, connection, database_type).with_database(database);
        let resolved = self.settings.catalog().build(&entry).unwrap();
        tenant(key).with_connection(resolved)
    }
}

pub fn tenant(key: &str) -> DataKeyContext {
    DataKeyContext::for_key(DataKey::new(key))
}

pub fn new_invoice(name: &str) -> Entity {
    Entity::new("invoice", json!({ "invoice_name": name, "status": "open" }))
}

pub fn new_line_item(invoice: &Entity, name: &str, price: Value) -> Entity {
    Entity::new(
        "line_item",
        json!({
            "invoice_id": invoice.id.to_string(),
            "item_name": name,
            "num_items": 1,
            "item_price": price,
        }),
    )
}

/// Adds and commits `entities` under `key`.
pub fn seed(fx: &Fixture, key: &str, entities: impl IntoIterator<Item = Entity>) {
    let mut ctx = fx.open(key);
    for e in entities {
        ctx.add(e).unwrap();
    }
    ctx.commit().unwrap();
}
