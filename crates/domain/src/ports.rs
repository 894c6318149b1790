//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{DigestRecord, Reputation};
use crate::protocol::{ApiCall, ApiResponse};

/// Error type for ePO API calls.
///
/// `Api` is the server rejecting a request inside an HTTP 200 body; the
/// transport variants (`Network`, `Timeout`, `Http`) mean the request never
/// got a usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpoError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid JSON in response: {0}")]
    Decode(String),
}

impl EpoError {
    /// Returns `true` if the server could not be reached or answered with a non-2xx status
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::Http { .. }
        )
    }

    /// Returns `true` if the server rejected the request in its response body
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

/// Port for the ePO remote command API
#[async_trait]
pub trait EpoApi: Send + Sync {
    /// Invoke a remote command, attaching the security token as needed
    async fn invoke(&self, call: ApiCall) -> Result<ApiResponse, EpoError>;

    /// Whether a security token is already cached
    fn has_token(&self) -> bool;
}

/// Error type for digest sources
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory not found: {0}")]
    RootNotFound(String),
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },
}

/// Port for producing digest records (e.g. by walking a directory)
#[async_trait]
pub trait DigestSource: Send + Sync {
    /// Hash every eligible file, stamping each record with the reputation and comment
    async fn collect(
        &self,
        reputation: Reputation,
        comment: &str,
    ) -> Result<Vec<DigestRecord>, ScanError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_and_api_errors_are_distinct() {
        let api = EpoError::Api("ERROR: bad request".to_string());
        let http = EpoError::Http {
            status: 500,
            body: "Internal Server Error".to_string(),
        };

        assert!(api.is_api());
        assert!(!api.is_transport());
        assert!(http.is_transport());
        assert!(!http.is_api());
        assert!(EpoError::Timeout("30s".to_string()).is_transport());
        assert!(!EpoError::Decode("eof".to_string()).is_transport());
    }

    #[test]
    fn test_api_error_keeps_body_text() {
        let err = EpoError::Api("ERROR: bad request".to_string());
        assert_eq!(err.to_string(), "API error: ERROR: bad request");
    }
}
