use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use super::cache::EvictionStrategy;

/// Main configuration structure for Perfcore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named cache profiles, keyed by cache name
    #[serde(default = "default_cache_profiles")]
    pub caches: BTreeMap<String, CacheProfile>,

    /// Request orchestrator configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            caches: default_cache_profiles(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// The semantic domains that get a cache out of the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheDomain {
    /// Parsed or generated schemas. Long-lived, few of them.
    Schema,
    /// Field validation results. Short-lived, many of them.
    Validation,
    /// Component UI state.
    UiState,
    /// Configuration lookups.
    Config,
}

impl CacheDomain {
    pub const ALL: [Self; 4] = [Self::Schema, Self::Validation, Self::UiState, Self::Config];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::Validation => "validation",
            Self::UiState => "ui_state",
            Self::Config => "config",
        }
    }

    pub fn default_profile(&self) -> CacheProfile {
        match self {
            Self::Schema => CacheProfile::new(EvictionStrategy::Ttl, 50).with_ttl_secs(3600),
            Self::Validation => {
                CacheProfile::new(EvictionStrategy::Adaptive, 500).with_ttl_secs(60)
            }
            Self::UiState => CacheProfile::new(EvictionStrategy::Lru, 200).with_ttl_secs(300),
            Self::Config => CacheProfile::new(EvictionStrategy::Lfu, 100).with_ttl_secs(600),
        }
    }
}

fn default_cache_profiles() -> BTreeMap<String, CacheProfile> {
    CacheDomain::ALL
        .iter()
        .map(|domain| (domain.as_str().to_string(), domain.default_profile()))
        .collect()
}

/// Shape of a single cache: eviction strategy, capacity and default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheProfile {
    #[serde(default)]
    pub strategy: EvictionStrategy,

    /// Maximum number of live entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// TTL applied to entries inserted without their own
    #[serde(default)]
    pub default_ttl_secs: Option<u64>,
}

const fn default_max_entries() -> usize {
    100
}

impl Default for CacheProfile {
    fn default() -> Self {
        Self::new(EvictionStrategy::default(), default_max_entries())
    }
}

impl CacheProfile {
    pub const fn new(strategy: EvictionStrategy, max_entries: usize) -> Self {
        Self {
            strategy,
            max_entries,
            default_ttl_secs: None,
        }
    }

    #[must_use]
    pub const fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.default_ttl_secs = Some(secs);
        self
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_secs.map(Duration::from_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

/// Request orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Ceiling on concurrently running operations
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Capacity of the idempotent result cache
    #[serde(default = "default_result_cache_max_entries")]
    pub result_cache_max_entries: usize,

    /// TTL for cached idempotent results when a call does not set one
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,

    /// Pause before the queue drain re-triggers itself
    #[serde(default = "default_drain_delay_ms")]
    pub drain_delay_ms: u64,

    /// Timeout for the reachability probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Path appended to a base URL for the reachability probe
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Retry policy for resilient calls
    #[serde(default)]
    pub retry: RetryConfig,
}

const fn default_max_concurrent() -> usize {
    3
}

const fn default_result_cache_max_entries() -> usize {
    100
}

const fn default_result_ttl_secs() -> u64 {
    300
}

const fn default_drain_delay_ms() -> u64 {
    100
}

const fn default_probe_timeout_ms() -> u64 {
    5000
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            result_cache_max_entries: default_result_cache_max_entries(),
            result_ttl_secs: default_result_ttl_secs(),
            drain_delay_ms: default_drain_delay_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            health_path: default_health_path(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    10_000
}

const fn default_timeout_ms() -> u64 {
    5000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_profiles_cover_every_domain() {
        let config = Config::default();
        for domain in CacheDomain::ALL {
            assert!(config.caches.contains_key(domain.as_str()));
        }
        assert_eq!(
            config.caches["validation"].strategy,
            EvictionStrategy::Adaptive
        );
        assert_eq!(config.caches["ui_state"].strategy, EvictionStrategy::Lru);
        assert_eq!(config.caches["config"].strategy, EvictionStrategy::Lfu);
    }

    #[test]
    fn test_schema_profile_is_long_lived_and_small() {
        let schema = CacheDomain::Schema.default_profile();
        let validation = CacheDomain::Validation.default_profile();
        assert!(schema.default_ttl_secs > validation.default_ttl_secs);
        assert!(schema.max_entries < validation.max_entries);
    }

    #[test]
    fn test_partial_profile_yaml_uses_defaults() {
        let profile: CacheProfile = serde_yaml::from_str("strategy: adaptive\n").unwrap();
        assert_eq!(profile.strategy, EvictionStrategy::Adaptive);
        assert_eq!(profile.max_entries, 100);
        assert_eq!(profile.default_ttl(), None);
    }
}
