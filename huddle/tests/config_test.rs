//! Tests for config module

use huddle::config::{Config, ConfigOrigin};
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
    assert_eq!(config.server.endpoint, "/mcp");
    assert_eq!(config.server.keep_alive_secs, 15);
    assert_eq!(config.server.max_body_size, 4 * 1024 * 1024);
    assert_eq!(config.mcp.name, "huddle-mcp");
    assert_eq!(config.mcp.base_url, "http://localhost:3000");
    assert!(config.mcp.instructions.is_none());
    assert_eq!(config.observability.log_format, "pretty");
    assert!(config.observability.metrics_enabled);
}

#[test]
fn test_save_and_load() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("huddle.toml");

    let mut config = Config::default();
    config.server.bind_addr = "0.0.0.0:9999".to_string();
    config.server.endpoint = "/rpc".to_string();
    config.mcp.instructions = Some("Ask about football".to_string());
    config.observability.log_format = "json".to_string();
    config.save(&config_path).unwrap();

    let loaded = Config::load(&config_path).unwrap();
    assert_eq!(loaded.server.bind_addr, "0.0.0.0:9999");
    assert_eq!(loaded.server.endpoint, "/rpc");
    assert_eq!(loaded.mcp.instructions.as_deref(), Some("Ask about football"));
    assert_eq!(loaded.observability.log_format, "json");
}

#[test]
fn test_load_or_create_writes_defaults() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("nested").join("huddle.toml");

    let (config, origin) = Config::load_or_create(&config_path).unwrap();
    assert_eq!(config.server.endpoint, "/mcp");
    assert!(matches!(origin, ConfigOrigin::Created));
    assert!(config_path.exists());

    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[server]"));
    assert!(content.contains("[mcp]"));
}

#[test]
fn test_load_or_create_reads_existing_file() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("huddle.toml");
    std::fs::write(&config_path, "[server]\nendpoint = \"/rpc\"\n").unwrap();

    let (config, origin) = Config::load_or_create(&config_path).unwrap();
    assert_eq!(config.server.endpoint, "/rpc");
    assert!(matches!(origin, ConfigOrigin::File));
}

#[test]
fn test_load_or_create_reports_unwritable_path() {
    let temp = tempdir().unwrap();
    // Parent is a regular file, so the defaults cannot be written
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();
    let config_path = blocker.join("huddle.toml");

    let (config, origin) = Config::load_or_create(&config_path).unwrap();
    assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
    assert!(matches!(origin, ConfigOrigin::Unsaved(_)));
    assert!(!config_path.exists());
}

#[test]
fn test_partial_file_uses_defaults() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("huddle.toml");
    std::fs::write(
        &config_path,
        r#"
[server]
keep_alive_secs = 5

[mcp]
name = "football-mcp-server"
"#,
    )
    .unwrap();

    let config = Config::load(&config_path).unwrap();
    assert_eq!(config.server.keep_alive_secs, 5);
    assert_eq!(config.server.bind_addr, "127.0.0.1:3000");
    assert_eq!(config.mcp.name, "football-mcp-server");
    assert_eq!(config.mcp.version, env!("CARGO_PKG_VERSION"));
    assert_eq!(config.observability.log_level, "info,huddle=debug");
}

#[test]
fn test_endpoint_must_be_absolute() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("huddle.toml");
    std::fs::write(&config_path, "[server]\nendpoint = \"mcp\"\n").unwrap();

    assert!(Config::load(&config_path).is_err());
}

#[test]
fn test_endpoint_cannot_shadow_health() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("huddle.toml");
    std::fs::write(&config_path, "[server]\nendpoint = \"/health\"\n").unwrap();

    assert!(Config::load(&config_path).is_err());
}

#[test]
fn test_invalid_toml_is_error() {
    let temp = tempdir().unwrap();
    let config_path = temp.path().join("huddle.toml");
    std::fs::write(&config_path, "[server\nbind_addr = ").unwrap();

    assert!(Config::load(&config_path).is_err());
}

#[test]
fn test_base_url_override() {
    let mut config = Config::default();

    config.apply_base_url(Some("https://huddle.example.com/".to_string()));
    assert_eq!(config.mcp.base_url, "https://huddle.example.com");

    config.apply_base_url(Some("   ".to_string()));
    assert_eq!(config.mcp.base_url, "https://huddle.example.com");

    config.apply_base_url(None);
    assert_eq!(config.mcp.base_url, "https://huddle.example.com");
}

#[test]
fn test_keep_alive_never_zero() {
    let mut config = Config::default();
    config.server.keep_alive_secs = 0;
    assert_eq!(config.server.keep_alive().as_secs(), 1);
}
