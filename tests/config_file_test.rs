//! Integration tests for config file loading.

use db_mcp::config::{AppConfig, Config, DatabasesConfig, resolve_security_mode};
use db_mcp::error::DbError;
use db_mcp::security::SecurityMode;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file
}

#[tokio::test]
async fn test_missing_file_is_empty_config() {
    let dir = tempfile::tempdir().unwrap();
    let app = AppConfig::load_from_file(&dir.path().join("absent.json"))
        .await
        .unwrap();
    assert!(app.databases.is_empty());
    assert!(app.security.mode.is_none());
}

#[tokio::test]
async fn test_invalid_file_is_config_error() {
    let file = write_config("{\"databases\": [");
    let err = AppConfig::load_from_file(file.path()).await.unwrap_err();
    assert!(matches!(err, DbError::Config { .. }));
}

#[tokio::test]
async fn test_file_sections_and_mode() {
    let file = write_config(
        r#"{
            "databases": {
                "redis": {"url": "redis://cache:6379/3"},
                "mongodb": {"url": "mongodb://localhost:27017", "database": "shop"}
            },
            "security": {"mode": "restricted"}
        }"#,
    );
    let app = AppConfig::load_from_file(file.path()).await.unwrap();
    assert!(app.databases.mysql.is_none());
    assert_eq!(app.databases.redis.as_ref().unwrap().target(), "cache:6379");
    assert_eq!(app.databases.mongodb.as_ref().unwrap().database_name(), "shop");

    let mode = resolve_security_mode(None, app.security.mode.as_deref(), Some("full_access"));
    assert_eq!(mode, SecurityMode::Restricted);
}

#[tokio::test]
async fn test_invalid_file_mode_falls_through() {
    let file = write_config(r#"{"security": {"mode": "everything"}}"#);
    let app = AppConfig::load_from_file(file.path()).await.unwrap();
    let mode = resolve_security_mode(None, app.security.mode.as_deref(), None);
    assert_eq!(mode, SecurityMode::ReadOnly);
}

#[tokio::test]
async fn test_env_replaces_file_section() {
    let file = write_config(r#"{"databases": {"mongodb": {"url": "mongodb://file-host"}}}"#);
    let app = AppConfig::load_from_file(file.path()).await.unwrap();
    let env = DatabasesConfig::from_env(|key| match key {
        "MONGODB_URL" => Some("mongodb://env-host/metrics".to_string()),
        _ => None,
    })
    .unwrap();

    let merged = app.with_env_overrides(env);
    let mongodb = merged.databases.mongodb.unwrap();
    assert_eq!(mongodb.url, "mongodb://env-host/metrics");
    assert_eq!(mongodb.database_name(), "metrics");
}

#[test]
fn test_cli_flag_beats_everything() {
    let config = Config {
        security_mode: Some("full_access".to_string()),
        ..Config::default()
    };
    let app = AppConfig::parse_json(r#"{"security": {"mode": "read_only"}}"#).unwrap();
    assert_eq!(config.initial_security_mode(&app), SecurityMode::FullAccess);
}
