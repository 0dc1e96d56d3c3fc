//! Configuration error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Invalid or incomplete client configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigError {
    /// Credentials are required but missing.
    #[error("[Config] api key, secret key, and passphrase are required for authenticated use")]
    MissingCredentials,

    /// A required field is missing or empty.
    #[error("[Config] missing field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: String,
    },

    /// A field holds an invalid value.
    #[error("[Config] invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },
}
