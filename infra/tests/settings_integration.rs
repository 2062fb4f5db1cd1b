//! Integration tests for layered settings loading

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use sg_infra::settings::{env_overrides, load_settings_with};
use sg_shared::config::{Environment, LogFormat, StoreBackend};

fn config_dir(files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sg-settings-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&dir).unwrap();
    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
    dir
}

fn overrides(vars: &[(&str, &str)]) -> config::Environment {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    env_overrides().source(Some(map))
}

#[test]
fn test_missing_files_fall_back_to_defaults() {
    let dir = config_dir(&[]);

    let config = load_settings_with(&dir, Environment::Development, overrides(&[])).unwrap();
    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.auth.session.access_ttl_secs, 900);
    assert_eq!(config.auth.jwt.algorithm, "HS256");
    assert_eq!(config.revocation.backend, StoreBackend::Memory);
}

#[test]
fn test_environment_file_overrides_default_file() {
    let dir = config_dir(&[
        (
            "default.toml",
            "[logging]\nlevel = \"info\"\nformat = \"pretty\"\n\n[auth.session]\naccess_ttl_secs = 600\n",
        ),
        ("staging.toml", "[logging]\nformat = \"json\"\n"),
    ]);

    let config = load_settings_with(&dir, Environment::Staging, overrides(&[])).unwrap();
    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.auth.session.access_ttl_secs, 600);
}

#[test]
fn test_prefixed_variables_override_files() {
    let dir = config_dir(&[("default.toml", "[revocation]\npurge_interval_secs = 60\n")]);

    let config = load_settings_with(
        &dir,
        Environment::Development,
        overrides(&[
            ("SG__REVOCATION__PURGE_INTERVAL_SECS", "120"),
            ("SG__REVOCATION__BACKEND", "redis"),
            ("SG__CACHE__KEY_PREFIX", "tenant-a"),
        ]),
    )
    .unwrap();

    assert_eq!(config.revocation.purge_interval_secs, 120);
    assert_eq!(config.revocation.backend, StoreBackend::Redis);
    assert_eq!(config.cache.key_prefix, "tenant-a");
}

#[test]
fn test_invalid_value_is_an_error() {
    let dir = config_dir(&[("default.toml", "[revocation]\nbackend = \"etcd\"\n")]);

    let result = load_settings_with(&dir, Environment::Development, overrides(&[]));
    assert!(result.is_err());
}
