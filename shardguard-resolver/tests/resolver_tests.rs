use pretty_assertions::assert_eq;
use shardguard_db::{ConnectionCatalog, ConnectionSettings};
use shardguard_registry::{RegistryError, ShardRegistry};
use shardguard_resolver::{DataKeyResolver, ShardLookup};
use shardguard_types::{Claims, DataKey, DataKeyContext, DatabaseType, Principal, ShardEntry};
use std::collections::HashMap;
use std::sync::Arc;

struct MapLookup(HashMap<String, ShardEntry>);

impl ShardLookup for MapLookup {
    fn lookup(&self, name: &str) -> Result<ShardEntry, RegistryError> {
        self.0
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }
}

struct BrokenLookup;

impl ShardLookup for BrokenLookup {
    fn lookup(&self, _name: &str) -> Result<ShardEntry, RegistryError> {
        Err(RegistryError::LockPoisoned)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn catalog() -> Arc<ConnectionCatalog> {
    let mut c = ConnectionCatalog::new();
    c.insert("DefaultConnection", "Data Source=data/{database}.db").unwrap();
    Arc::new(c)
}

fn resolver() -> DataKeyResolver {
    let mut shards = HashMap::new();
    shards.insert(
        "east".to_string(),
        ShardEntry::new("east", "DefaultConnection", DatabaseType::Sqlite).with_database("east"),
    );
    // Names a template that is not in the catalog.
    shards.insert(
        "orphan".to_string(),
        ShardEntry::new("orphan", "Gone", DatabaseType::Sqlite).with_database("orphan"),
    );
    DataKeyResolver::new(Arc::new(MapLookup(shards)), catalog())
}

fn user(claims: Claims) -> Principal {
    Principal::user(claims)
}

// ── Fail-closed branches ─────────────────────────────────────────

#[test]
fn no_caller_is_deny_all() {
    assert_eq!(resolver().resolve(None), DataKeyContext::deny_all());
}

#[test]
fn unauthenticated_caller_is_deny_all() {
    let mut p = user(Claims::new().with("DataKey", "1."));
    p.authenticated = false;
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn background_actor_is_deny_all_even_with_claims() {
    let p = Principal::background(Claims::new().with("DataKey", "1.").with("ShardName", "east"));
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn caller_without_data_key_claim_is_deny_all() {
    let p = user(Claims::new().with("ShardName", "east"));
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn blank_data_key_claim_is_deny_all() {
    init_tracing();
    let p = user(Claims::new().with("DataKey", "  "));
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn missing_shard_is_deny_all() {
    init_tracing();
    let p = user(Claims::new().with("DataKey", "1.").with("ShardName", "west"));
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn blank_shard_claim_is_deny_all() {
    let p = user(Claims::new().with("DataKey", "1.").with("ShardName", ""));
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn shard_with_unknown_template_is_deny_all() {
    let p = user(Claims::new().with("DataKey", "1.").with("ShardName", "orphan"));
    assert_eq!(resolver().resolve(Some(&p)), DataKeyContext::deny_all());
}

#[test]
fn lookup_failure_is_deny_all() {
    let r = DataKeyResolver::new(Arc::new(BrokenLookup), catalog());
    let p = user(Claims::new().with("DataKey", "1.").with("ShardName", "east"));
    assert_eq!(r.resolve(Some(&p)), DataKeyContext::deny_all());
}

// ── Successful resolution ────────────────────────────────────────

#[test]
fn data_key_without_shard_uses_default_connection() {
    let p = user(Claims::new().with("DataKey", "1.3."));
    let ctx = resolver().resolve(Some(&p));
    assert_eq!(ctx.data_key(), &DataKey::new("1.3."));
    assert!(ctx.connection().is_none());
}

#[test]
fn data_key_with_shard_resolves_connection() {
    let p = user(Claims::new().with("DataKey", "1.").with("ShardName", "east"));
    let ctx = resolver().resolve(Some(&p));
    assert_eq!(ctx.data_key().as_str(), Some("1."));
    let conn = ctx.connection().unwrap();
    assert_eq!(conn.connection_string, "Data Source=data/east.db");
    assert_eq!(conn.database_type, DatabaseType::Sqlite);
}

#[test]
fn resolves_against_real_registry_and_sees_deletes() {
    let settings = ConnectionSettings::new("Data Source=main.db", DatabaseType::Sqlite)
        .unwrap()
        .with_connection("DefaultConnection", "Data Source=data/{database}.db")
        .unwrap();
    let registry = Arc::new(ShardRegistry::open_in_memory(&settings).unwrap());
    registry
        .upsert(ShardEntry::new("east", "DefaultConnection", DatabaseType::Sqlite).with_database("east"))
        .unwrap();
    let r = DataKeyResolver::new(registry.clone(), Arc::new(settings.catalog().clone()));

    let p = user(Claims::new().with("DataKey", "1.").with("ShardName", "east"));
    assert!(r.resolve(Some(&p)).connection().is_some());

    registry.delete("east").unwrap();
    assert_eq!(r.resolve(Some(&p)), DataKeyContext::deny_all());
}
