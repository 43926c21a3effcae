//! Integration tests for configuration resolution
//!
//! Tests that manipulate MFL_CONFIG are marked with #[serial] so they run
//! sequentially, not in parallel.

use mfl_common::config::{write_toml_config, ConfigResolver, LoaderConfig, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let temp_dir = TempDir::new().unwrap();
    let cli_path = temp_dir.path().join("cli.toml");
    let env_path = temp_dir.path().join("env.toml");

    std::fs::write(&cli_path, "max_concurrent = 7\n").unwrap();
    std::fs::write(&env_path, "max_concurrent = 2\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &env_path);

    let config = ConfigResolver::new(Some(cli_path)).resolve().unwrap();
    assert_eq!(config.max_concurrent, 7);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("env.toml");
    std::fs::write(&env_path, "priority_count = 5\nprogressive_mode = false\n").unwrap();
    env::set_var(CONFIG_ENV_VAR, &env_path);

    let config = ConfigResolver::new(None).resolve().unwrap();
    assert_eq!(config.priority_count, 5);
    assert!(!config.progressive_mode);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("does-not-exist.toml");

    let config = ConfigResolver::new(Some(missing)).resolve().unwrap();
    assert_eq!(config, LoaderConfig::default());
}

#[test]
#[serial]
fn test_invalid_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("bad.toml");
    std::fs::write(&path, "retry_attempts = 0\n").unwrap();

    assert!(ConfigResolver::new(Some(path)).resolve().is_err());
}

#[test]
fn test_write_then_load_preserves_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("loader.toml");

    let config = LoaderConfig {
        max_concurrent: 2,
        fuzzy_match_threshold: 0.65,
        overrides_file: Some(temp_dir.path().join("overrides.toml")),
        ..LoaderConfig::default()
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = LoaderConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(!path.with_extension("toml.tmp").exists());
}
