use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::Config;

/// Project config file, relative to the working directory
pub const PROJECT_CONFIG: &str = ".perfcore/config.yaml";
/// Optional local overrides, relative to the working directory
pub const LOCAL_CONFIG: &str = ".perfcore/local.yaml";
/// Prefix for environment overrides; nested keys split on `__`
pub const ENV_PREFIX: &str = "PERFCORE_";

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid max_entries for cache '{0}': must be at least 1")]
    InvalidCapacity(String),

    #[error("Invalid default_ttl_secs for cache '{0}': must be positive when set")]
    InvalidTtl(String),

    #[error("Invalid max_concurrent: {0}. Must be at least 1")]
    InvalidMaxConcurrent(usize),

    #[error("Invalid result_cache_max_entries: {0}. Must be at least 1")]
    InvalidResultCacheCapacity(usize),

    #[error("Invalid timeout_ms: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid health_path: {0:?}. Must start with '/'")]
    InvalidHealthPath(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .perfcore/config.yaml (project config)
    /// 3. .perfcore/local.yaml (local overrides, optional)
    /// 4. Environment variables (PERFCORE_* prefix)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment(Path::new(PROJECT_CONFIG))
            .merge(Yaml::file(LOCAL_CONFIG))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let config: Config = Self::figment(path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment(file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        for (name, profile) in &config.caches {
            if profile.max_entries == 0 {
                return Err(ConfigError::InvalidCapacity(name.clone()));
            }
            if profile.default_ttl_secs == Some(0) {
                return Err(ConfigError::InvalidTtl(name.clone()));
            }
        }

        let orchestrator = &config.orchestrator;
        if orchestrator.max_concurrent == 0 {
            return Err(ConfigError::InvalidMaxConcurrent(orchestrator.max_concurrent));
        }
        if orchestrator.result_cache_max_entries == 0 {
            return Err(ConfigError::InvalidResultCacheCapacity(
                orchestrator.result_cache_max_entries,
            ));
        }
        if orchestrator.probe_timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(orchestrator.probe_timeout_ms));
        }
        if !orchestrator.health_path.starts_with('/') {
            return Err(ConfigError::InvalidHealthPath(
                orchestrator.health_path.clone(),
            ));
        }

        let retry = &orchestrator.retry;
        if retry.timeout_ms == 0 {
            return Err(ConfigError::InvalidTimeout(retry.timeout_ms));
        }
        if retry.initial_backoff_ms > retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.initial_backoff_ms,
                retry.max_backoff_ms,
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{CacheProfile, EvictionStrategy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.caches.len(), 4);
        assert_eq!(config.orchestrator.max_concurrent, 3);
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: json
caches:
  sessions:
    strategy: lfu
    max_entries: 25
orchestrator:
  max_concurrent: 8
  retry:
    max_retries: 5
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(
            config.caches.get("sessions"),
            Some(&CacheProfile::new(EvictionStrategy::Lfu, 25))
        );
        assert_eq!(config.orchestrator.max_concurrent, 8);
        assert_eq!(config.orchestrator.retry.max_retries, 5);
        assert_eq!(config.orchestrator.retry.initial_backoff_ms, 1000);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel("loud".to_string()))
        );
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat("xml".to_string()))
        );
    }

    #[test]
    fn test_validate_zero_capacity_cache() {
        let mut config = Config::default();
        config
            .caches
            .insert("tiny".to_string(), CacheProfile::new(EvictionStrategy::Lru, 0));

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidCapacity("tiny".to_string()))
        );
    }

    #[test]
    fn test_validate_zero_ttl() {
        let mut config = Config::default();
        config.caches.insert(
            "flash".to_string(),
            CacheProfile::new(EvictionStrategy::Ttl, 10).with_ttl_secs(0),
        );

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidTtl("flash".to_string()))
        );
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.orchestrator.max_concurrent = 0;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxConcurrent(0))
        );
    }

    #[test]
    fn test_validate_invalid_backoff() {
        let mut config = Config::default();
        config.orchestrator.retry.initial_backoff_ms = 30_000;
        config.orchestrator.retry.max_backoff_ms = 10_000;

        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(30_000, 10_000))
        );
    }

    #[test]
    fn test_validate_health_path() {
        let mut config = Config::default();
        config.orchestrator.health_path = "health".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidHealthPath(_))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "logging:\n  level: info\n  format: json\norchestrator:\n  max_concurrent: 2"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = ConfigLoader::figment(base_file.path())
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug", "Override should win");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.orchestrator.max_concurrent, 2);
        assert_eq!(config.caches.len(), 4, "Defaults fill in missing sections");
    }

    #[test]
    fn test_load_from_file_rejects_invalid_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "orchestrator:\n  max_concurrent: 0").unwrap();
        file.flush().unwrap();

        let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_concurrent"));
    }
}
