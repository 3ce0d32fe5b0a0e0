//! Configuration resolution tests
//!
//! Covers the priority order CLI > environment > TOML > defaults, graceful
//! handling of a missing TOML file and rejection of invalid values.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that touch ACS_* variables are marked with #[serial].

use acs_common::config::{
    self, ConfigOverrides, TomlConfig, ENV_CHUNK_SIZE, ENV_PACING_MS, ENV_PORT, ENV_RESOURCE_DIR,
    ENV_STATIC_DIR,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    for name in [ENV_PORT, ENV_RESOURCE_DIR, ENV_STATIC_DIR, ENV_CHUNK_SIZE, ENV_PACING_MS] {
        env::remove_var(name);
    }
}

fn write_config(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("acs.toml");
    std::fs::write(&path, text).expect("Failed to write config");
    path
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let config = config::resolve(Some(missing.as_path()), ConfigOverrides::default()).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
#[serial]
fn test_toml_values_are_used() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
port = 9100
resource_dir = "/srv/audio"

[streaming]
chunk_size = 4096
pacing_ms = 50
extensions = ["mp3"]

[logging]
level = "debug"
"#,
    );

    let config = config::resolve(Some(path.as_path()), ConfigOverrides::default()).unwrap();
    assert_eq!(config.port, 9100);
    assert_eq!(config.resource_dir, PathBuf::from("/srv/audio"));
    assert_eq!(config.static_dir, PathBuf::from("./static"));
    assert_eq!(config.streaming.chunk_size, 4096);
    assert_eq!(config.streaming.pacing_ms, 50);
    assert_eq!(config.streaming.extensions, vec!["mp3".to_string()]);
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = 9100\n[streaming]\nchunk_size = 4096\n");

    env::set_var(ENV_PORT, "9200");
    env::set_var(ENV_CHUNK_SIZE, "2048");
    env::set_var(ENV_RESOURCE_DIR, "/tmp/acs-env-audio");

    let config = config::resolve(Some(path.as_path()), ConfigOverrides::default()).unwrap();
    clear_env();

    assert_eq!(config.port, 9200);
    assert_eq!(config.streaming.chunk_size, 2048);
    assert_eq!(config.resource_dir, PathBuf::from("/tmp/acs-env-audio"));
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = 9100\n");

    env::set_var(ENV_PORT, "9200");
    env::set_var(ENV_PACING_MS, "7");

    let cli = ConfigOverrides {
        port: Some(9300),
        ..Default::default()
    };
    let config = config::resolve(Some(path.as_path()), cli).unwrap();
    clear_env();

    assert_eq!(config.port, 9300);
    assert_eq!(config.streaming.pacing_ms, 7);
}

#[test]
#[serial]
fn test_invalid_env_value_is_error() {
    clear_env();
    env::set_var(ENV_PORT, "not-a-port");

    let result = ConfigOverrides::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_unparsable_toml_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "port = [this is not toml");

    assert!(config::resolve(Some(path.as_path()), ConfigOverrides::default()).is_err());
}

#[test]
#[serial]
fn test_zero_chunk_size_rejected() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[streaming]\nchunk_size = 0\n");

    assert!(config::resolve(Some(path.as_path()), ConfigOverrides::default()).is_err());
}

#[test]
fn test_default_config_path_is_named_acs_toml() {
    let path = config::default_config_path();
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("acs.toml"));
}
