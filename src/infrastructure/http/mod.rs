//! HTTP helpers shared by the request orchestrator.
//!
//! - Endpoint path joining
//! - Status classification for retry decisions

pub mod endpoint;
pub mod response;

pub use endpoint::join_endpoint;
pub use response::classify_response;
