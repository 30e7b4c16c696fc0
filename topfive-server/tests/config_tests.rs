//! Configuration resolution priority tests
//!
//! These tests manipulate process environment variables, so they are marked
//! #[serial] to keep them from racing each other.

use serial_test::serial;
use std::path::PathBuf;
use tempfile::TempDir;
use topfive_common::config::{self, env_keys, ConfigOverrides, DEFAULT_PORT};

fn clear_env() {
    for key in [
        env_keys::CONFIG_FILE,
        env_keys::PORT,
        env_keys::CHART_DIR,
        env_keys::CHART_BASE_URL,
        env_keys::CACHE_DB,
        env_keys::CATALOG_CLIENT_ID,
        env_keys::CATALOG_CLIENT_SECRET,
    ] {
        std::env::remove_var(key);
    }
}

/// An empty config file, so the developer's real one never leaks in.
fn empty_config() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "").unwrap();
    (dir, path)
}

#[test]
#[serial]
fn missing_chart_dir_is_a_config_error() {
    clear_env();
    let (_dir, config_file) = empty_config();

    let result = config::load(&ConfigOverrides {
        config_file: Some(config_file),
        ..Default::default()
    });
    assert!(result.is_err());
}

#[test]
#[serial]
fn env_supplies_chart_dir_with_compiled_defaults() {
    clear_env();
    let (_dir, config_file) = empty_config();
    std::env::set_var(env_keys::CHART_DIR, "/srv/charts");

    let config = config::load(&ConfigOverrides {
        config_file: Some(config_file),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.chart_dir, PathBuf::from("/srv/charts"));
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.host, "127.0.0.1");
    assert!(config.cache_db_path.is_none());
    assert!(config.chart_base_url.is_none());
    assert_eq!(config.catalog.api_base_url, "https://api.spotify.com/v1");
    assert_eq!(config.catalog.search_delay_ms, 80);
    assert_eq!(config.streak_max_weeks, 52);

    clear_env();
}

#[test]
#[serial]
fn cli_overrides_beat_environment() {
    clear_env();
    let (_dir, config_file) = empty_config();
    std::env::set_var(env_keys::PORT, "1234");
    std::env::set_var(env_keys::CHART_DIR, "/from/env");

    let config = config::load(&ConfigOverrides {
        config_file: Some(config_file),
        port: Some(9000),
        chart_dir: Some(PathBuf::from("/from/cli")),
        cache_db: Some(PathBuf::from("/from/cli/cache.db")),
    })
    .unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.chart_dir, PathBuf::from("/from/cli"));
    assert_eq!(config.cache_db_path, Some(PathBuf::from("/from/cli/cache.db")));

    clear_env();
}

#[test]
#[serial]
fn toml_file_supplies_values() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let config_file = dir.path().join("config.toml");
    std::fs::write(
        &config_file,
        r#"
port = 6000
chart_dir = "/srv/charts"
chart_base_url = "https://charts.example.com"
cache_db = "/var/lib/topfive/cache.db"

[catalog]
client_id = "toml-id"
client_secret = "toml-secret"
search_delay_ms = 200
"#,
    )
    .unwrap();

    let config = config::load(&ConfigOverrides {
        config_file: Some(config_file),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.chart_dir, PathBuf::from("/srv/charts"));
    assert_eq!(
        config.chart_base_url.as_deref(),
        Some("https://charts.example.com")
    );
    assert_eq!(config.catalog.client_id, "toml-id");
    assert_eq!(config.catalog.search_delay_ms, 200);

    clear_env();
}

#[test]
#[serial]
fn environment_beats_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let config_file = dir.path().join("config.toml");
    std::fs::write(
        &config_file,
        r#"
port = 6000
chart_dir = "/from/toml"

[catalog]
client_id = "toml-id"
"#,
    )
    .unwrap();

    std::env::set_var(env_keys::PORT, "7000");
    std::env::set_var(env_keys::CATALOG_CLIENT_ID, "env-id");

    let config = config::load(&ConfigOverrides {
        config_file: Some(config_file),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.port, 7000);
    assert_eq!(config.chart_dir, PathBuf::from("/from/toml"));
    assert_eq!(config.catalog.client_id, "env-id");

    clear_env();
}

#[test]
#[serial]
fn unreadable_named_config_file_is_an_error() {
    clear_env();

    let result = config::load(&ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/topfive.toml")),
        ..Default::default()
    });
    assert!(result.is_err());
}
