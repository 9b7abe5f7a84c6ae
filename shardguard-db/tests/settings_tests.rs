use pretty_assertions::assert_eq;
use shardguard_db::{open_connection, ConnectionSettings, DbError};
use shardguard_types::{DatabaseType, ResolvedConnection};

const SAMPLE: &str = r#"
[database]
default_connection = "Data Source=main.db"
supported_engines = ["sqlite"]

[connections]
DefaultConnection = "Data Source=data/{database}.db"
Reporting = "Data Source=reporting.db;Mode=ReadOnly"
"#;

// ── TOML loading ─────────────────────────────────────────────────

#[test]
fn parses_full_settings() {
    let s = ConnectionSettings::from_toml_str(SAMPLE).unwrap();
    assert_eq!(s.default_connection().connection_string, "Data Source=main.db");
    assert_eq!(s.default_connection().database_type, DatabaseType::Sqlite);
    assert_eq!(s.supported_engines(), &[DatabaseType::Sqlite]);
    assert!(!s.is_supported(DatabaseType::SqliteMemory));
    let names: Vec<&str> = s.catalog().names().collect();
    assert_eq!(names, vec!["DefaultConnection", "Reporting"]);
}

#[test]
fn engines_default_to_all_known() {
    let s = ConnectionSettings::from_toml_str("[database]\ndefault_connection = \"Data Source=a.db\"\n").unwrap();
    assert_eq!(s.supported_engines(), &DatabaseType::ALL);
    assert!(s.catalog().is_empty());
}

#[test]
fn default_connection_is_required() {
    let err = ConnectionSettings::from_toml_str("[database]\n").unwrap_err();
    assert!(matches!(err, DbError::Toml(_)));
}

#[test]
fn unparseable_default_connection_is_config_error() {
    let err = ConnectionSettings::from_toml_str("[database]\ndefault_connection = \"Server=x\"\n").unwrap_err();
    assert!(matches!(err, DbError::Config(_)));
}

#[test]
fn unknown_engine_name_fails_to_parse() {
    let toml = "[database]\ndefault_connection = \"Data Source=a.db\"\nsupported_engines = [\"postgres\"]\n";
    assert!(ConnectionSettings::from_toml_str(toml).is_err());
}

#[test]
fn default_engine_must_be_supported() {
    let toml = "[database]\ndefault_connection = \"Data Source=a\"\ndefault_database_type = \"sqlite-memory\"\nsupported_engines = [\"sqlite\"]\n";
    assert!(matches!(ConnectionSettings::from_toml_str(toml), Err(DbError::Config(_))));
}

#[test]
fn invalid_template_in_file_is_rejected() {
    let toml = "[database]\ndefault_connection = \"Data Source=a.db\"\n[connections]\nBad = \"Host=x\"\n";
    assert!(matches!(ConnectionSettings::from_toml_str(toml), Err(DbError::Config(_))));
}

#[test]
fn load_from_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ConnectionSettings::load_from(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, DbError::Config(_)));
}

#[test]
fn load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shardguard.toml");
    std::fs::write(&path, SAMPLE).unwrap();
    let s = ConnectionSettings::load_from(&path).unwrap();
    assert!(s.catalog().contains("Reporting"));
}

#[test]
fn builder_api() {
    let s = ConnectionSettings::new("Data Source=a.db", DatabaseType::Sqlite)
        .unwrap()
        .with_connection("Shard", "Data Source={database}.db")
        .unwrap()
        .with_supported_engines([DatabaseType::Sqlite, DatabaseType::Sqlite]);
    assert_eq!(s.supported_engines(), &[DatabaseType::Sqlite]);
    assert!(s.catalog().contains("Shard"));
}

// ── Opening connections ──────────────────────────────────────────

#[test]
fn opens_file_database_in_wal_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.db");
    let resolved = ResolvedConnection::new(format!("Data Source={}", path.display()), DatabaseType::Sqlite);
    let conn = open_connection(&resolved).unwrap();
    let mode: String = conn.query_row("PRAGMA journal_mode", [], |r| r.get(0)).unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
    let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0)).unwrap();
    assert_eq!(fk, 1);
}

#[test]
fn named_memory_databases_are_shared_between_connections() {
    let resolved = ResolvedConnection::new("Data Source=shared_mem_test", DatabaseType::SqliteMemory);
    let a = open_connection(&resolved).unwrap();
    a.execute_batch("CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (7);").unwrap();
    let b = open_connection(&resolved).unwrap();
    let x: i64 = b.query_row("SELECT x FROM t", [], |r| r.get(0)).unwrap();
    assert_eq!(x, 7);
}

#[test]
fn read_only_open_of_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");
    let resolved = ResolvedConnection::new(
        format!("Data Source={};Mode=ReadOnly", path.display()),
        DatabaseType::Sqlite,
    );
    assert!(matches!(open_connection(&resolved), Err(DbError::Database(_))));
}
