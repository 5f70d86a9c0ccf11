//! Errors raised by the request orchestrator.
//!
//! Cache operations have no error type: absence and no-ops are plain values.

use thiserror::Error;

/// Errors that can occur while running an outbound call.
///
/// Cloneable so one result can be handed to every caller coalesced onto the
/// same in-flight request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Attempt exceeded its timeout budget
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Client-side failure (status < 500); never retried
    #[error("Client error ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// Server-side failure (status >= 500)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Failure raised by a caller-supplied operation
    #[error("Operation failed: {0}")]
    Operation(String),

    /// Result could not be converted to or from its cached form
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The queued operation was dropped before it reported a result
    #[error("Request cancelled before completion")]
    Cancelled,
}

pub type RequestResult<T> = Result<T, RequestError>;

impl RequestError {
    /// Build an error from a non-success HTTP status.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let message = body.into();
        if status >= 500 {
            Self::ServerError { status, message }
        } else {
            Self::ClientError { status, message }
        }
    }

    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::ServerError { .. } | Self::Network(_) | Self::Operation(_)
        )
    }

    /// Returns true if this is a permanent error that should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ClientError { status, .. } | Self::ServerError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RequestError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Network(format!("timed out: {err}"));
        }
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), err.to_string());
        }
        if err.is_decode() {
            return Self::Serialization(err.to_string());
        }
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for RequestError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(RequestError::Timeout { timeout_ms: 5000 }.is_transient());
        assert!(RequestError::from_status(503, "unavailable").is_transient());
        assert!(RequestError::Network("reset".to_string()).is_transient());
        assert!(RequestError::Operation("flaky".to_string()).is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(RequestError::from_status(404, "missing").is_permanent());
        assert!(RequestError::from_status(499, "closed").is_permanent());
        assert!(RequestError::Serialization("bad".to_string()).is_permanent());
        assert!(RequestError::Cancelled.is_permanent());
    }

    #[test]
    fn test_from_status_splits_at_500() {
        assert_eq!(
            RequestError::from_status(500, "boom"),
            RequestError::ServerError {
                status: 500,
                message: "boom".to_string()
            }
        );
        assert!(matches!(
            RequestError::from_status(429, "slow down"),
            RequestError::ClientError { status: 429, .. }
        ));
        assert_eq!(RequestError::from_status(502, "").status(), Some(502));
        assert_eq!(RequestError::Cancelled.status(), None);
    }
}
