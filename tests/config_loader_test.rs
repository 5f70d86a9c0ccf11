//! Integration tests for layered configuration loading.

use perfcore::domain::models::EvictionStrategy;
use perfcore::ConfigLoader;
use std::io::Write;
use tempfile::NamedTempFile;

fn yaml_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_file_values_override_defaults() {
    let file = yaml_file(
        "caches:\n  validation:\n    strategy: lru\n    max_entries: 10\norchestrator:\n  health_path: /ping\n",
    );

    let config = temp_env::with_vars_unset(
        ["PERFCORE_ORCHESTRATOR__MAX_CONCURRENT", "PERFCORE_LOGGING__LEVEL"],
        || ConfigLoader::load_from_file(file.path()).unwrap(),
    );

    let validation = config.caches["validation"];
    assert_eq!(validation.strategy, EvictionStrategy::Lru);
    assert_eq!(validation.max_entries, 10);
    assert_eq!(config.orchestrator.health_path, "/ping");
    assert_eq!(config.orchestrator.max_concurrent, 3);
}

#[test]
fn test_environment_overrides_file() {
    let file = yaml_file("orchestrator:\n  max_concurrent: 4\nlogging:\n  level: warn\n");

    let config = temp_env::with_vars(
        [
            ("PERFCORE_ORCHESTRATOR__MAX_CONCURRENT", Some("9")),
            ("PERFCORE_LOGGING__LEVEL", Some("debug")),
        ],
        || ConfigLoader::load_from_file(file.path()).unwrap(),
    );

    assert_eq!(config.orchestrator.max_concurrent, 9);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_environment_value_is_rejected() {
    let file = yaml_file("logging:\n  level: info\n");

    let result = temp_env::with_var("PERFCORE_ORCHESTRATOR__MAX_CONCURRENT", Some("0"), || {
        ConfigLoader::load_from_file(file.path())
    });

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("max_concurrent"));
}

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = temp_env::with_vars_unset(
        ["PERFCORE_ORCHESTRATOR__MAX_CONCURRENT", "PERFCORE_LOGGING__LEVEL"],
        || ConfigLoader::load_from_file(dir.path().join("absent.yaml")).unwrap(),
    );

    assert_eq!(config.caches.len(), 4);
    assert_eq!(config.orchestrator.retry.max_retries, 3);
}
