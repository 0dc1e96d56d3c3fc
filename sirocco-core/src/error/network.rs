//! Transport-level error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport failure on the unary or streaming path.
///
/// Every variant is retriable: the request never produced a venue decision,
/// so re-executing it is safe.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkError {
    /// Connection to the remote host failed.
    #[error("[Network] connection failed: {reason}")]
    ConnectionFailed {
        /// Reason for the connection failure.
        reason: String,
    },

    /// The transport deadline expired.
    #[error("[Network] timeout after {timeout_ms}ms")]
    Timeout {
        /// Deadline in milliseconds.
        timeout_ms: u64,
    },

    /// HTTP request failed below the response-envelope layer.
    #[error("[Network] http error: status {status_code} - {reason}")]
    Http {
        /// HTTP status code, 0 when none was received.
        status_code: u16,
        /// Reason for the failure.
        reason: String,
    },

    /// Stream transport failure.
    #[error("[Network] websocket error: {reason}")]
    WebSocket {
        /// Reason for the failure.
        reason: String,
    },

    /// The connection was closed unexpectedly.
    #[error("[Network] connection closed: {reason}")]
    ConnectionClosed {
        /// Reason for the closure.
        reason: String,
    },
}

impl NetworkError {
    /// Returns true if this error is recoverable by re-execution.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = NetworkError::Timeout { timeout_ms: 5_000 };
        assert!(err.to_string().contains("5000ms"));

        let err = NetworkError::ConnectionFailed {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_all_variants_recoverable() {
        let variants = [
            NetworkError::ConnectionFailed {
                reason: String::new(),
            },
            NetworkError::Timeout { timeout_ms: 1 },
            NetworkError::Http {
                status_code: 0,
                reason: String::new(),
            },
            NetworkError::WebSocket {
                reason: String::new(),
            },
            NetworkError::ConnectionClosed {
                reason: String::new(),
            },
        ];
        for err in variants {
            assert!(err.is_recoverable(), "{err}");
        }
    }

    #[test]
    fn test_serde_roundtrip() {
        let err = NetworkError::Http {
            status_code: 502,
            reason: "bad gateway".to_string(),
        };
        let json = serde_json::to_string(&err).unwrap();
        let parsed: NetworkError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, parsed);
    }
}
