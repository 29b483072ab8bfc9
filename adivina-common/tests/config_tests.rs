//! Integration tests for configuration resolution
//!
//! Covers the priority order CLI → environment → TOML file → defaults and the
//! graceful fallback when the config file is missing.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate ADIVINA_CONFIG or ADIVINA_SERVER_URL are marked with
//! #[serial] so they run sequentially.

use adivina_common::config::{ClientConfig, ConfigResolver, CONFIG_ENV, SERVER_URL_ENV};
use adivina_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn clear_env() {
    env::remove_var(CONFIG_ENV);
    env::remove_var(SERVER_URL_ENV);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.toml");

    let config = ConfigResolver::new()
        .with_config_path(Some(missing))
        .resolve()
        .unwrap();

    assert_eq!(config, ClientConfig::default());
}

#[test]
#[serial]
fn test_cli_path_loads_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        "server_url = \"http://game.local:8080\"\nfragment_volume = 0.5\n",
    );

    let config = ConfigResolver::new()
        .with_config_path(Some(path))
        .resolve()
        .unwrap();

    assert_eq!(config.server_url, "http://game.local:8080");
    assert!((config.fragment_volume - 0.5).abs() < f32::EPSILON);
}

#[test]
#[serial]
fn test_env_config_path_used_when_no_cli_path() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "legacy_payload_scan = false\n");
    env::set_var(CONFIG_ENV, &path);

    let resolver = ConfigResolver::new();
    assert_eq!(resolver.config_path(), Some(path));
    let config = resolver.resolve().unwrap();
    assert!(!config.legacy_payload_scan);

    clear_env();
}

#[test]
#[serial]
fn test_server_url_priority_cli_over_env_over_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "server_url = \"http://from-file:1\"\n");

    env::set_var(SERVER_URL_ENV, "http://from-env:2");
    let from_env = ConfigResolver::new()
        .with_config_path(Some(path.clone()))
        .resolve()
        .unwrap();
    assert_eq!(from_env.server_url, "http://from-env:2");

    let from_cli = ConfigResolver::new()
        .with_config_path(Some(path))
        .with_server_url(Some("http://from-cli:3/".to_string()))
        .resolve()
        .unwrap();
    assert_eq!(from_cli.server_url, "http://from-cli:3");

    clear_env();
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "server_url = \n");

    let result = ConfigResolver::new().with_config_path(Some(path)).resolve();
    assert!(matches!(result, Err(Error::TomlParse(_))));
}

#[test]
#[serial]
fn test_invalid_override_is_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("none.toml");

    let result = ConfigResolver::new()
        .with_config_path(Some(missing))
        .with_server_url(Some("localhost:5000".to_string()))
        .resolve();
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
