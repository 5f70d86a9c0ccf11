//! Infrastructure layer module
//!
//! Outer integrations the services depend on:
//! - Configuration loading (figment: YAML files + environment)
//! - Logging setup (tracing subscriber, optional rolling file output)
//! - HTTP helpers shared by the request orchestrator

pub mod config;
pub mod http;
pub mod logging;
