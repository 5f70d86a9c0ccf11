//! Domain layer: cache and request models plus the error taxonomy.
//!
//! Nothing in here touches the network or the filesystem.

pub mod errors;
pub mod models;

pub use errors::{RequestError, RequestResult};
