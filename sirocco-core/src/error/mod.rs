//! Error types for the venue client.
//!
//! Every outcome surfaced to callers is one of: success, a categorized
//! [`ApiError`], a transport-level [`NetworkError`], a local
//! [`ConfigError`]/[`DataError`], [`Error::Cancelled`], or
//! [`Error::RetriesExhausted`] wrapping the last categorized error.
//!
//! Retriability is a property of the error, not of the call site: the retry
//! executor consults [`Error::is_retriable`] and nothing else.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod api;
mod config;
mod data;
mod network;

pub use api::{categorize, ApiError, ErrorKind};
pub use config::ConfigError;
pub use data::DataError;
pub use network::NetworkError;

/// Top-level error type for the venue client.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// Error reported by the venue.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// Transport-level failure.
    #[error("{0}")]
    Network(#[from] NetworkError),

    /// Invalid client configuration.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Encode/decode failure.
    #[error("{0}")]
    Data(#[from] DataError),

    /// The operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The retry budget was exhausted; wraps the last observed error.
    #[error("maximum retry attempts exceeded after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Total attempts made, including the first.
        attempts: u32,
        /// The last error observed.
        source: Box<Error>,
    },
}

impl Error {
    /// Returns true if re-executing the failed operation may succeed.
    ///
    /// Cancellation is never retriable; neither is an exhausted retry
    /// budget, regardless of what it wraps.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Api(e) => e.retriable,
            Self::Network(e) => e.is_recoverable(),
            Self::Config(_) | Self::Data(_) | Self::Cancelled | Self::RetriesExhausted { .. } => {
                false
            }
        }
    }

    /// Returns true if this is the cancellation outcome.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the inner venue error, if any.
    #[must_use]
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            Self::RetriesExhausted { source, .. } => source.as_api(),
            _ => None,
        }
    }

    /// Returns the inner transport error, if any.
    #[must_use]
    pub fn as_network(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(e) => Some(e),
            Self::RetriesExhausted { source, .. } => source.as_network(),
            _ => None,
        }
    }
}

/// A specialized Result type for venue-client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_retriability_follows_table() {
        let retriable = Error::Api(ApiError::from_code("429", "too many", None, None));
        assert!(retriable.is_retriable());

        let terminal = Error::Api(ApiError::from_code("40007", "bad sig", None, None));
        assert!(!terminal.is_retriable());
    }

    #[test]
    fn test_network_always_retriable() {
        let err = Error::Network(NetworkError::Timeout { timeout_ms: 1_000 });
        assert!(err.is_retriable());
    }

    #[test]
    fn test_cancelled_never_retriable() {
        assert!(!Error::Cancelled.is_retriable());
        assert!(Error::Cancelled.is_cancelled());
    }

    #[test]
    fn test_retries_exhausted_wraps_source() {
        let inner = Error::Api(ApiError::from_code("429", "too many", Some(429), None));
        let err = Error::RetriesExhausted {
            attempts: 4,
            source: Box::new(inner),
        };
        assert!(!err.is_retriable());
        assert_eq!(err.as_api().map(|e| e.code.as_str()), Some("429"));
        assert!(err.to_string().contains("4 attempts"));
    }

    #[test]
    fn test_as_accessors() {
        let err = Error::Network(NetworkError::WebSocket {
            reason: "reset".to_string(),
        });
        assert!(err.as_network().is_some());
        assert!(err.as_api().is_none());
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = Error::RetriesExhausted {
            attempts: 2,
            source: Box::new(Error::Cancelled),
        };
        let json = serde_json::to_string(&err).unwrap();
        let parsed: Error = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
