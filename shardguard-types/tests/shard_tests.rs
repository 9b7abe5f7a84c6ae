use pretty_assertions::assert_eq;
use shardguard_types::{Claims, DatabaseType, Principal, ShardEntry, ActorKind, Error};

// ── DatabaseType parsing ─────────────────────────────────────────

#[test]
fn parses_kebab_and_pascal_names() {
    assert_eq!("sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
    assert_eq!("Sqlite".parse::<DatabaseType>().unwrap(), DatabaseType::Sqlite);
    assert_eq!("sqlite-memory".parse::<DatabaseType>().unwrap(), DatabaseType::SqliteMemory);
    assert_eq!("SqliteMemory".parse::<DatabaseType>().unwrap(), DatabaseType::SqliteMemory);
}

#[test]
fn unknown_engine_is_rejected() {
    let err = "SqlServer".parse::<DatabaseType>().unwrap_err();
    assert!(matches!(err, Error::UnknownDatabaseType(ref s) if s == "SqlServer"));
    assert!("Postgres".parse::<DatabaseType>().is_err());
    assert!("".parse::<DatabaseType>().is_err());
}

#[test]
fn display_round_trips_through_from_str() {
    for kind in DatabaseType::ALL {
        assert_eq!(kind.to_string().parse::<DatabaseType>().unwrap(), kind);
    }
}

#[test]
fn database_type_serde_is_kebab_case() {
    let json = serde_json::to_string(&DatabaseType::SqliteMemory).unwrap();
    assert_eq!(json, "\"sqlite-memory\"");
}

// ── ShardEntry ───────────────────────────────────────────────────

#[test]
fn shard_entry_builder() {
    let entry = ShardEntry::new("east-1", "DefaultConnection", DatabaseType::Sqlite)
        .with_database("east1");
    assert_eq!(entry.name, "east-1");
    assert_eq!(entry.connection_name, "DefaultConnection");
    assert_eq!(entry.database_name.as_deref(), Some("east1"));
}

#[test]
fn shard_entry_json_omits_missing_database() {
    let entry = ShardEntry::new("a", "Conn", DatabaseType::Sqlite);
    let json = serde_json::to_value(&entry).unwrap();
    assert!(json.get("database_name").is_none());
    assert_eq!(json["database_type"], "sqlite");
}

// ── Claims & Principal ───────────────────────────────────────────

#[test]
fn claims_expose_well_known_fields() {
    let claims = Claims::new().with("DataKey", "1.").with("ShardName", "east-1");
    assert_eq!(claims.data_key(), Some("1."));
    assert_eq!(claims.shard_name(), Some("east-1"));
    assert_eq!(claims.get("Other"), None);
}

#[test]
fn anonymous_principal_is_unauthenticated() {
    let p = Principal::anonymous();
    assert!(!p.authenticated);
    assert!(p.claims.is_empty());
}

#[test]
fn background_principal_is_marked() {
    let p = Principal::background(Claims::new().with("DataKey", "1."));
    assert_eq!(p.actor, ActorKind::Background);
}
