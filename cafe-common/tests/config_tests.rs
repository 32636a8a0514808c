//! Configuration resolution tests
//!
//! Priority order: command line > environment > TOML file > defaults.
//!
//! Uses serial_test because several tests mutate CAFE_* environment variables.

use cafe_common::config::{load_config, CafeConfig, ConfigOverrides, ENV_DATA_FOLDER, ENV_PORT};
use cafe_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_DATA_FOLDER);
    env::remove_var(ENV_PORT);
    env::remove_var("CAFE_BIND_ADDR");
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_toml_values_are_loaded() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        data_folder = "/srv/cafe"
        port = 6000

        [pricing]
        default_margin_percent = 45.0

        [ledger]
        record_sales_income = false
        "#,
    );

    let config = load_config(&ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.data_folder, PathBuf::from("/srv/cafe"));
    assert_eq!(config.port, 6000);
    assert_eq!(config.pricing.default_margin_percent, 45.0);
    assert!(!config.ledger.record_sales_income);
    assert_eq!(config.auth, CafeConfig::default().auth);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = 6000\ndata_folder = \"/srv/cafe\"");

    env::set_var(ENV_PORT, "7001");
    env::set_var(ENV_DATA_FOLDER, "/tmp/cafe-env");

    let config = load_config(&ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    })
    .unwrap();
    clear_env();

    assert_eq!(config.port, 7001);
    assert_eq!(config.data_folder, PathBuf::from("/tmp/cafe-env"));
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = 6000");
    env::set_var(ENV_PORT, "7001");

    let config = load_config(&ConfigOverrides {
        config_file: Some(path),
        port: Some(8002),
        data_folder: Some(PathBuf::from("/tmp/cafe-cli")),
        ..Default::default()
    })
    .unwrap();
    clear_env();

    assert_eq!(config.port, 8002);
    assert_eq!(config.data_folder, PathBuf::from("/tmp/cafe-cli"));
}

#[test]
#[serial]
fn test_invalid_env_port_is_config_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");
    env::set_var(ENV_PORT, "espresso");

    let result = load_config(&ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    });
    clear_env();

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_explicit_missing_config_file_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();

    let result = load_config(&ConfigOverrides {
        config_file: Some(dir.path().join("absent.toml")),
        ..Default::default()
    });

    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_malformed_config_file_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[auth\nusername = ");

    let result = load_config(&ConfigOverrides {
        config_file: Some(path),
        ..Default::default()
    });

    assert!(matches!(result, Err(Error::Config(_))));
}
