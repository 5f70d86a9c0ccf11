//! Perfcore - in-process caching and request orchestration
//!
//! Perfcore keeps hot, derivable data (schemas, validation results, UI state,
//! configuration lookups) in bounded named caches, and funnels outbound
//! requests through a single orchestrator that deduplicates idempotent calls,
//! caps concurrency, and retries transient failures with backoff.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): cache entries, metrics, configuration, errors
//! - **Service Layer** (`services`): cache engine, cache registry, request orchestrator
//! - **Infrastructure Layer** (`infrastructure`): config loading, logging, HTTP helpers
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```
//! use perfcore::CacheRegistry;
//!
//! let mut registry = CacheRegistry::new();
//! registry.cache_ui_state("sidebar", &serde_json::json!({ "open": true }));
//!
//! let state: Option<serde_json::Value> = registry.get_cached_ui_state("sidebar");
//! assert_eq!(state, Some(serde_json::json!({ "open": true })));
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    CacheDomain, CacheMetrics, CacheProfile, Config, EvictionStrategy, LoggingConfig,
    OptimizationSuggestion, OrchestratorConfig, PerformanceReport, RetryConfig,
};
pub use domain::{RequestError, RequestResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    Cache, CacheRegistry, CallOptions, OrchestratorStats, RequestOrchestrator, RetryPolicy,
};
