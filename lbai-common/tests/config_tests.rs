//! Configuration resolution tests
//!
//! Tests that set environment variables are `#[serial]` so they never race.

use lbai_common::config::{
    load_toml_or_default, read_toml, resolve_setting, LoggingConfig, RootFolderInitializer,
    RootFolderResolver, SettingSource, ROOT_FOLDER_ENV,
};
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SampleToml {
    root_folder: Option<PathBuf>,
    port: Option<u16>,
    logging: LoggingConfig,
}

#[test]
#[serial]
fn test_env_beats_toml_root_folder() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/lbai-env-root");

    let resolved = RootFolderResolver::new("test")
        .with_toml_root(Some(PathBuf::from("/tmp/lbai-toml-root")))
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/lbai-env-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_root_used_without_env() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("test")
        .with_toml_root(Some(PathBuf::from("/tmp/lbai-toml-root")))
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/lbai-toml-root"));
}

#[test]
#[serial]
fn test_compiled_default_when_nothing_set() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new("test").resolve();
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
#[serial]
fn test_whitespace_env_root_is_ignored() {
    env::set_var(ROOT_FOLDER_ENV, "   ");

    let resolved = RootFolderResolver::new("test")
        .with_toml_root(Some(PathBuf::from("/tmp/lbai-toml-root")))
        .resolve();
    assert_eq!(resolved, PathBuf::from("/tmp/lbai-toml-root"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_resolve_setting_priority() {
    let var = "LBAI_TEST_SECRET";

    env::remove_var(var);
    assert_eq!(resolve_setting("Secret", var, None), None);
    assert_eq!(resolve_setting("Secret", var, Some("  ")), None);
    assert_eq!(
        resolve_setting("Secret", var, Some("from-toml")),
        Some(("from-toml".to_string(), SettingSource::Toml))
    );

    env::set_var(var, "from-env");
    assert_eq!(
        resolve_setting("Secret", var, Some("from-toml")),
        Some(("from-env".to_string(), SettingSource::Environment))
    );

    env::remove_var(var);
}

#[test]
fn test_missing_toml_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config: SampleToml = load_toml_or_default(Some(&dir.path().join("absent.toml")));
    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");

    let config: SampleToml = load_toml_or_default(None);
    assert!(config.port.is_none());
}

#[test]
fn test_malformed_toml_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = [not valid").unwrap();

    assert!(read_toml::<SampleToml>(&path).is_err());
    let config: SampleToml = load_toml_or_default(Some(&path));
    assert!(config.port.is_none());
}

#[test]
fn test_valid_toml_is_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lbai-studio.toml");
    std::fs::write(
        &path,
        "root_folder = \"/srv/lbai\"\nport = 9090\n\n[logging]\nlevel = \"debug\"\n",
    )
    .unwrap();

    let config: SampleToml = load_toml_or_default(Some(&path));
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/lbai")));
    assert_eq!(config.port, Some(9090));
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_initializer_creates_nested_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("a").join("b");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    assert!(root.is_dir());
    assert_eq!(initializer.database_path(), root.join("lbai.db"));
    // idempotent
    initializer.ensure_directory_exists().unwrap();
}
