//! Common test utilities for integration tests

#![allow(dead_code)]

use perfcore::domain::models::{OrchestratorConfig, RetryConfig};
use std::time::Duration;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Poll `predicate` every 10ms until it holds or `timeout_ms` passes.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    predicate()
}

/// Orchestrator settings with millisecond-scale backoff so HTTP tests stay fast.
pub fn fast_orchestrator_config(max_concurrent: usize) -> OrchestratorConfig {
    OrchestratorConfig {
        max_concurrent,
        drain_delay_ms: 5,
        probe_timeout_ms: 1_000,
        retry: RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 10,
            max_backoff_ms: 40,
            timeout_ms: 2_000,
        },
        ..OrchestratorConfig::default()
    }
}
