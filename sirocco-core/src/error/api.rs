//! Venue API error types and code categorization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a venue-reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Authentication failure (bad key, signature, timestamp, ...).
    Auth,
    /// Request rejected by the venue's rate limiter.
    RateLimit,
    /// Request parameters failed validation.
    Validation,
    /// Transport-level failure.
    Network,
    /// Venue-side system failure.
    System,
    /// Operation not permitted for this API key.
    Permission,
    /// Business-rule rejection (unknown order, balance, limits, ...).
    Business,
    /// Unrecognized error code.
    Unknown,
}

impl ErrorKind {
    /// Returns the category as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "AUTHENTICATION_ERROR",
            Self::RateLimit => "RATE_LIMIT_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Network => "NETWORK_ERROR",
            Self::System => "SYSTEM_ERROR",
            Self::Permission => "PERMISSION_ERROR",
            Self::Business => "BUSINESS_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Maps a venue error code to its category and retriability.
///
/// Unknown codes map to `(Unknown, false)`; local recovery is only safe for
/// codes known to be transient.
#[must_use]
pub fn categorize(code: &str) -> (ErrorKind, bool) {
    match code {
        // Authentication: missing/invalid headers, bad signature, expired
        // timestamp, key state problems, IP whitelist, bad locale.
        "40001" | "40002" | "40003" | "40004" | "40005" | "40006" | "40007" | "40008"
        | "40009" | "40010" | "40011" | "40012" | "40013" | "40014" | "40753" => {
            (ErrorKind::Auth, false)
        }
        // Permissions.
        "40022" | "50003" | "50004" => (ErrorKind::Permission, false),
        // Parameter validation.
        "40017" | "40019" | "40020" => (ErrorKind::Validation, false),
        // Venue rate limiting.
        "429" => (ErrorKind::RateLimit, true),
        // Venue-side system failures.
        "40015" | "40018" | "50000" | "50001" | "50002" => (ErrorKind::System, true),
        // Business-rule rejections.
        "50005" | "50006" | "50007" | "50008" | "50009" | "50010" => (ErrorKind::Business, false),
        _ => (ErrorKind::Unknown, false),
    }
}

/// An error reported by the venue, either through the response envelope or
/// synthesized from a bare HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Venue error code; empty when the error was raised locally.
    pub code: String,
    /// Venue error message.
    pub message: String,
    /// HTTP status, when the error came through the unary transport.
    pub http_status: Option<u16>,
    /// `requestTime` from the response envelope, when present.
    pub request_time: Option<i64>,
    /// Error category.
    pub kind: ErrorKind,
    /// Whether re-executing the same request may succeed.
    pub retriable: bool,
}

impl ApiError {
    /// Creates an error from a venue code, applying the categorization table.
    #[must_use]
    pub fn from_code(
        code: impl Into<String>,
        message: impl Into<String>,
        http_status: Option<u16>,
        request_time: Option<i64>,
    ) -> Self {
        let code = code.into();
        let (kind, retriable) = categorize(&code);
        Self {
            code,
            message: message.into(),
            http_status,
            request_time,
            kind,
            retriable,
        }
    }

    /// Synthesizes an error from an HTTP status when no envelope code is
    /// available. 429 maps to `RateLimit`, the transient 5xx statuses map to
    /// `System`; both are retriable. Everything else is `Unknown`.
    #[must_use]
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let (kind, retriable) = match status {
            429 => (ErrorKind::RateLimit, true),
            500 | 502 | 503 | 504 => (ErrorKind::System, true),
            _ => (ErrorKind::Unknown, false),
        };
        Self {
            code: String::new(),
            message: message.into(),
            http_status: Some(status),
            request_time: None,
            kind,
            retriable,
        }
    }

    /// Creates a local validation error, raised before any network effect.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: String::new(),
            message: message.into(),
            http_status: None,
            request_time: None,
            kind: ErrorKind::Validation,
            retriable: false,
        }
    }

    /// Returns true if this is an authentication error.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.kind == ErrorKind::Auth
    }

    /// Returns true if this is a rate-limiting error.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        self.kind == ErrorKind::RateLimit
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Api] {}", self.kind)?;
        if !self.code.is_empty() {
            write!(f, " [{}]", self.code)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(status) = self.http_status {
            write!(f, " (http {status})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}
