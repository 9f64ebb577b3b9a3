//! Tests for layered configuration resolution
//!
//! Covers:
//! - Missing config files fall back to defaults
//! - TOML file values override defaults
//! - Environment variables override the TOML file
//! - Command-line values override everything
//! - Invalid values are reported as configuration errors
//!
//! Note: Uses serial_test to prevent ENV variable race conditions.
//! Tests that touch ATTRIB_HUB_* variables are marked #[serial].

use attrib_common::config::{self, ConfigLayer, HubConfig, CONFIG_PATH_ENV};
use attrib_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::Path;

const HUB_VARS: &[&str] = &[
    CONFIG_PATH_ENV,
    "ATTRIB_HUB_BIND_ADDR",
    "ATTRIB_HUB_PORT",
    "ATTRIB_HUB_WINDOW_CAPACITY",
    "ATTRIB_HUB_KEEPALIVE_SECS",
    "ATTRIB_HUB_MAX_BODY_BYTES",
    "ATTRIB_HUB_LISTENER_WARN_THRESHOLD",
];

fn clear_env() {
    for var in HUB_VARS {
        env::remove_var(var);
    }
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_missing_config_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = config::resolve(ConfigLayer::default(), Some(&missing)).unwrap();
    assert_eq!(config, HubConfig::default());
}

#[test]
#[serial]
fn test_toml_file_overrides_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
port = 9100
window_capacity = 10
keepalive_secs = 5
"#,
    );

    let config = config::resolve(ConfigLayer::default(), Some(&path)).unwrap();
    assert_eq!(config.port, 9100);
    assert_eq!(config.window_capacity, 10);
    assert_eq!(config.keepalive_secs, 5);
    assert_eq!(config.bind_addr, "127.0.0.1");
}

#[test]
#[serial]
fn test_config_path_from_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "port = 9200\n");
    env::set_var(CONFIG_PATH_ENV, &path);

    let config = config::resolve(ConfigLayer::default(), None).unwrap();
    assert_eq!(config.port, 9200);

    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_toml_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "port = 9100\nbind_addr = \"10.0.0.1\"\n");
    env::set_var("ATTRIB_HUB_PORT", "9300");

    let config = config::resolve(ConfigLayer::default(), Some(&path)).unwrap();
    assert_eq!(config.port, 9300);
    assert_eq!(config.bind_addr, "10.0.0.1");

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    env::set_var("ATTRIB_HUB_PORT", "9300");
    env::set_var("ATTRIB_HUB_WINDOW_CAPACITY", "50");

    let cli = ConfigLayer {
        port: Some(9400),
        ..Default::default()
    };
    let config = config::resolve(cli, Some(&missing)).unwrap();
    assert_eq!(config.port, 9400);
    assert_eq!(config.window_capacity, 50);

    clear_env();
}

#[test]
#[serial]
fn test_unparseable_env_value_is_config_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");
    env::set_var("ATTRIB_HUB_KEEPALIVE_SECS", "soon");

    let result = config::resolve(ConfigLayer::default(), Some(&missing));
    assert!(matches!(result, Err(Error::Config(_))));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_toml_is_config_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "port = \"not a number\"\n");

    let result = config::resolve(ConfigLayer::default(), Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_zero_window_capacity_rejected() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "window_capacity = 0\n");

    let result = config::resolve(ConfigLayer::default(), Some(&path));
    assert!(matches!(result, Err(Error::Config(_))));
}
