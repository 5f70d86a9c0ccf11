//! Domain models for caches, configuration and orchestrator bookkeeping.

pub mod cache;
pub mod config;
pub mod report;

pub use cache::{AccessPattern, CacheEntry, CacheMetrics, EvictionStrategy, ACCESS_WINDOW};
pub use config::{
    CacheDomain, CacheProfile, Config, LoggingConfig, OrchestratorConfig, RetryConfig,
};
pub use report::{OperationStats, OptimizationSuggestion, PerformanceReport};
