//! API credentials with secure secret handling.
//!
//! The secret key is held in a zeroize-on-drop container and is never
//! printed by `Debug` or `Display`. It leaves this module only through
//! [`Credentials::secret_key`], which the request signer uses as HMAC key
//! material.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret value that is wiped from memory on drop.
///
/// # Example
///
/// ```
/// use sirocco_core::credentials::SecretKey;
///
/// let secret = SecretKey::new("my-secret-key");
/// assert_eq!(secret.expose(), "my-secret-key");
/// assert_eq!(format!("{secret:?}"), "SecretKey([REDACTED])");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    value: String,
}

impl SecretKey {
    /// Creates a new secret from the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Exposes the secret value.
    ///
    /// The returned reference must not be stored, logged, or serialized.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Returns true if the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

impl fmt::Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison.
        if self.value.len() != other.value.len() {
            return false;
        }
        let mut result = 0u8;
        for (a, b) in self.value.bytes().zip(other.value.bytes()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for SecretKey {}

/// Authentication credentials for the venue API.
///
/// Contains the API key, the signing secret, and the account passphrase.
/// All three are required for private REST endpoints and the private
/// stream login.
///
/// # Example
///
/// ```
/// use sirocco_core::credentials::Credentials;
///
/// let creds = Credentials::new("my_api_key", "my_api_secret")
///     .with_passphrase("my_passphrase");
/// assert_eq!(creds.api_key(), "my_api_key");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    secret_key: SecretKey,
    passphrase: String,
}

impl Credentials {
    /// Creates new credentials with API key and secret.
    #[must_use]
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: SecretKey::new(secret_key),
            passphrase: String::new(),
        }
    }

    /// Sets the passphrase.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = passphrase.into();
        self
    }

    /// Returns the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the signing secret.
    ///
    /// For use as HMAC key material only; must never be logged.
    #[must_use]
    pub fn secret_key(&self) -> &str {
        self.secret_key.expose()
    }

    /// Returns the passphrase.
    #[must_use]
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// Returns true if all three credential parts are present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty() && !self.passphrase.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_expose() {
        let secret = SecretKey::new("s3cret");
        assert_eq!(secret.expose(), "s3cret");
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = SecretKey::new("sensitive");
        let debug = format!("{secret:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("sensitive"));
    }

    #[test]
    fn test_secret_equality() {
        assert_eq!(SecretKey::new("abc"), SecretKey::new("abc"));
        assert_ne!(SecretKey::new("abc"), SecretKey::new("abd"));
        assert_ne!(SecretKey::new("abc"), SecretKey::new("abcd"));
    }

    #[test]
    fn test_credentials_builder() {
        let creds = Credentials::new("key", "secret").with_passphrase("phrase");
        assert_eq!(creds.api_key(), "key");
        assert_eq!(creds.secret_key(), "secret");
        assert_eq!(creds.passphrase(), "phrase");
        assert!(creds.is_complete());
    }

    #[test]
    fn test_credentials_incomplete_without_passphrase() {
        let creds = Credentials::new("key", "secret");
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let creds = Credentials::new("key", "very-secret").with_passphrase("phrase");
        let debug = format!("{creds:?}");
        assert!(debug.contains("key"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("phrase"));
    }
}
