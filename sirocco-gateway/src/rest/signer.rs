//! Request signing.
//!
//! The venue authenticates requests with an HMAC-SHA256 signature over the
//! canonical string `timestamp + METHOD + path + body`, base64-encoded.
//! Unary requests use millisecond timestamps; the stream login uses second
//! timestamps over the fixed path `/users/self/verify`.
//!
//! The signer is the only component that reads the secret key; its API
//! exposes signatures and header bundles, never the secret itself.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;

use sirocco_core::credentials::Credentials;
use sirocco_core::error::{ApiError, ConfigError, Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// API key header.
pub const HEADER_ACCESS_KEY: &str = "ACCESS-KEY";
/// Signature header.
pub const HEADER_ACCESS_SIGN: &str = "ACCESS-SIGN";
/// Passphrase header.
pub const HEADER_ACCESS_PASSPHRASE: &str = "ACCESS-PASSPHRASE";
/// Timestamp header (milliseconds since epoch).
pub const HEADER_ACCESS_TIMESTAMP: &str = "ACCESS-TIMESTAMP";
/// Locale header.
pub const HEADER_LOCALE: &str = "locale";

/// Canonical path signed during the stream login handshake.
pub const STREAM_LOGIN_PATH: &str = "/users/self/verify";

/// Maximum tolerated distance between the signed timestamp and the venue
/// clock, in milliseconds.
pub const MAX_CLOCK_DRIFT_MS: i64 = 30_000;

/// Signs requests on behalf of a credential set.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    /// Creates a new signer.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    /// Returns the passphrase.
    #[must_use]
    pub fn passphrase(&self) -> &str {
        self.credentials.passphrase()
    }

    /// Signs a raw message and returns the base64-encoded signature.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the secret cannot be used as HMAC key
    /// material.
    pub fn sign(&self, message: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key().as_bytes())
            .map_err(|_| {
                Error::Config(ConfigError::InvalidValue {
                    field: "secret_key".to_string(),
                    reason: "invalid HMAC key material".to_string(),
                })
            })?;
        mac.update(message.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }

    /// Signs a unary request.
    ///
    /// Canonical string: `timestamp_ms + METHOD + path_with_query + body`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if signing fails.
    pub fn sign_request(
        &self,
        timestamp_ms: i64,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<String> {
        let method = method.to_ascii_uppercase();
        self.sign(&format!("{timestamp_ms}{method}{path}{body}"))
    }

    /// Signs the stream login payload.
    ///
    /// Canonical string: `timestamp_secs + "GET" + "/users/self/verify"`,
    /// with an empty body. The login clock is seconds, not milliseconds.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if signing fails.
    pub fn sign_login(&self, timestamp_secs: i64) -> Result<String> {
        self.sign(&format!("{timestamp_secs}GET{STREAM_LOGIN_PATH}"))
    }

    /// Builds the `args` array for the stream login frame:
    /// `[api_key, passphrase, timestamp_secs, signature]`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if signing fails.
    pub fn login_args(&self, timestamp_secs: i64) -> Result<[String; 4]> {
        let signature = self.sign_login(timestamp_secs)?;
        Ok([
            self.credentials.api_key().to_string(),
            self.credentials.passphrase().to_string(),
            timestamp_secs.to_string(),
            signature,
        ])
    }

    /// Builds the authentication header bundle for a unary request.
    ///
    /// Emits `ACCESS-KEY`, `ACCESS-SIGN`, `ACCESS-PASSPHRASE`, and
    /// `ACCESS-TIMESTAMP`. `Content-Type`, `User-Agent`, and `locale` are
    /// carried as transport default headers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if signing fails or a credential part is not a
    /// valid header value.
    pub fn rest_headers(
        &self,
        timestamp_ms: i64,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<HeaderMap> {
        let signature = self.sign_request(timestamp_ms, method, path, body)?;

        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(
            HeaderName::from_static("access-key"),
            header_value(self.credentials.api_key(), HEADER_ACCESS_KEY)?,
        );
        headers.insert(
            HeaderName::from_static("access-sign"),
            header_value(&signature, HEADER_ACCESS_SIGN)?,
        );
        headers.insert(
            HeaderName::from_static("access-passphrase"),
            header_value(self.credentials.passphrase(), HEADER_ACCESS_PASSPHRASE)?,
        );
        headers.insert(
            HeaderName::from_static("access-timestamp"),
            header_value(&timestamp_ms.to_string(), HEADER_ACCESS_TIMESTAMP)?,
        );
        Ok(headers)
    }
}

fn header_value(value: &str, header: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        Error::Config(ConfigError::InvalidValue {
            field: header.to_string(),
            reason: "not a valid header value".to_string(),
        })
    })
}

/// Returns the current timestamp in milliseconds since epoch.
#[must_use]
pub fn timestamp_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as i64
}

/// Returns the current timestamp in seconds since epoch.
#[must_use]
pub fn timestamp_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs() as i64
}

/// Checks that a millisecond timestamp is within the venue's tolerated
/// clock drift of the local clock. The library validates but never adjusts.
///
/// # Errors
///
/// Returns a validation error when the drift exceeds
/// [`MAX_CLOCK_DRIFT_MS`].
pub fn validate_timestamp(timestamp_ms_value: i64) -> Result<()> {
    let now = timestamp_ms();
    let drift = (now - timestamp_ms_value).abs();
    if drift > MAX_CLOCK_DRIFT_MS {
        return Err(Error::Api(ApiError::validation(format!(
            "timestamp {timestamp_ms_value} is {drift}ms from local time {now}, beyond the {MAX_CLOCK_DRIFT_MS}ms bound"
        ))));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> RequestSigner {
        RequestSigner::new(Credentials::new("key", "secret").with_passphrase("phrase"))
    }

    #[test]
    fn test_sign_known_vector() {
        // Known HMAC-SHA256 base64 result for "message" with key "secret".
        let signature = signer().sign("message").unwrap();
        assert_eq!(signature, "i19IcCmVwVmMVz2x4hhmqbgl1KeU0WnXBgoDYFeWNgs=");
    }

    #[test]
    fn test_sign_matches_manual_hmac() {
        let canonical = "1700000000000GET/capi/v2/market/ticker?symbol=X";
        let signature = signer().sign(canonical).unwrap();

        let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
        mac.update(canonical.as_bytes());
        let expected = BASE64.encode(mac.finalize().into_bytes());
        assert_eq!(signature, expected);
    }

    #[test]
    fn test_sign_request_is_deterministic() {
        let s = signer();
        let a = s
            .sign_request(1_700_000_000_000, "GET", "/capi/v2/market/ticker?symbol=X", "")
            .unwrap();
        let b = s
            .sign_request(1_700_000_000_000, "GET", "/capi/v2/market/ticker?symbol=X", "")
            .unwrap();
        assert_eq!(a, b);
        assert!(BASE64.decode(&a).is_ok());
    }

    #[test]
    fn test_sign_request_uppercases_method() {
        let s = signer();
        let lower = s.sign_request(1, "get", "/capi/v2/market/time", "").unwrap();
        let upper = s.sign_request(1, "GET", "/capi/v2/market/time", "").unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_sign_request_canonical_layout() {
        let s = signer();
        let composed = s
            .sign_request(1_700_000_000_000, "POST", "/capi/v2/order/placeOrder", "{}")
            .unwrap();
        let manual = s
            .sign("1700000000000POST/capi/v2/order/placeOrder{}")
            .unwrap();
        assert_eq!(composed, manual);
    }

    #[test]
    fn test_sign_login_canonical_layout() {
        let s = signer();
        let login = s.sign_login(1_700_000_000).unwrap();
        let manual = s.sign("1700000000GET/users/self/verify").unwrap();
        assert_eq!(login, manual);
    }

    #[test]
    fn test_login_args_order() {
        let args = signer().login_args(1_700_000_000).unwrap();
        assert_eq!(args[0], "key");
        assert_eq!(args[1], "phrase");
        assert_eq!(args[2], "1700000000");
        assert_eq!(args[3], signer().sign_login(1_700_000_000).unwrap());
    }

    #[test]
    fn test_rest_headers_bundle() {
        let headers = signer()
            .rest_headers(1_700_000_000_000, "GET", "/capi/v2/market/time", "")
            .unwrap();

        assert_eq!(headers.get("ACCESS-KEY").unwrap(), "key");
        assert_eq!(headers.get("ACCESS-PASSPHRASE").unwrap(), "phrase");
        assert_eq!(headers.get("ACCESS-TIMESTAMP").unwrap(), "1700000000000");
        let sign = headers.get("ACCESS-SIGN").unwrap().to_str().unwrap();
        assert_eq!(
            sign,
            signer()
                .sign_request(1_700_000_000_000, "GET", "/capi/v2/market/time", "")
                .unwrap()
        );
    }

    #[test]
    fn test_validate_timestamp() {
        assert!(validate_timestamp(timestamp_ms()).is_ok());
        assert!(validate_timestamp(timestamp_ms() - 29_000).is_ok());
        assert!(validate_timestamp(timestamp_ms() - 31_000).is_err());
        assert!(validate_timestamp(timestamp_ms() + 31_000).is_err());
    }

    #[test]
    fn test_millisecond_and_second_clocks_disagree() {
        // The unary path signs milliseconds, the login path seconds.
        let ms = timestamp_ms();
        let secs = timestamp_secs();
        assert!(ms / 1_000 - secs <= 1);
        assert!(ms > 1_000_000_000_000);
        assert!(secs < 10_000_000_000);
    }
}
