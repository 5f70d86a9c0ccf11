//! Service layer: cache engine, cache registry and request orchestration.

pub mod cache_engine;
pub mod cache_key;
pub mod cache_registry;
pub mod request_orchestrator;

pub use cache_engine::{estimate_size, Cache};
pub use cache_key::{cache_key, hash_str, prefixed_key};
pub use cache_registry::CacheRegistry;
pub use request_orchestrator::{CallOptions, OrchestratorStats, RequestOrchestrator, RetryPolicy};
