//! Serialization error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure to encode a request or decode a response.
///
/// These are never retriable: the same bytes produce the same outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataError {
    /// Request body could not be serialized.
    #[error("[Data] failed to encode request body: {reason}")]
    Encode {
        /// Serializer error message.
        reason: String,
    },

    /// Response payload could not be deserialized.
    #[error("[Data] failed to decode response: {reason}")]
    Decode {
        /// Deserializer error message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = DataError::Decode {
            reason: "missing field `symbol`".to_string(),
        };
        assert!(err.to_string().contains("missing field"));
    }
}
