//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default REST API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api-contract.weex.com";
/// Default public stream URL.
pub const DEFAULT_WS_PUBLIC_URL: &str = "wss://ws-contract.weex.com/v2/ws/public";
/// Default private stream URL.
pub const DEFAULT_WS_PRIVATE_URL: &str = "wss://ws-contract.weex.com/v2/ws/private";

/// Configuration for the venue client.
///
/// Covers the REST pipeline (timeout, retry, admission control) and the
/// streaming session (heartbeat, reconnection). All durations are stored as
/// milliseconds so the struct round-trips through serde without custom
/// codecs; `Duration` accessors are provided for call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// REST API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Public stream URL.
    #[serde(default = "default_ws_public_url")]
    pub ws_public_url: String,

    /// Private stream URL.
    #[serde(default = "default_ws_private_url")]
    pub ws_private_url: String,

    /// Per-request transport deadline in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// Maximum retry attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum retry backoff in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier applied per attempt.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Master switch for weight-based admission control.
    #[serde(default = "default_enable_rate_limit")]
    pub enable_rate_limit: bool,

    /// IP weight budget per refill window.
    #[serde(default = "default_ip_weight")]
    pub ip_weight: u32,

    /// UID weight budget per refill window.
    #[serde(default = "default_uid_weight")]
    pub uid_weight: u32,

    /// Weight budget refill window in milliseconds.
    ///
    /// The venue documents a 5-minute budget window; the default here keeps
    /// the 5-second window the reference deployment runs with. Set this to
    /// 300_000 to match the published policy.
    #[serde(default = "default_refill_window_ms")]
    pub refill_window_ms: u64,

    /// Stream heartbeat interval in milliseconds.
    #[serde(default = "default_ws_ping_interval_ms")]
    pub ws_ping_interval_ms: u64,

    /// Stream read deadline in milliseconds; the connection is considered
    /// dead when no frame (pong included) arrives within this window.
    #[serde(default = "default_ws_pong_wait_ms")]
    pub ws_pong_wait_ms: u64,

    /// Whether the stream session reconnects automatically.
    #[serde(default = "default_ws_reconnect")]
    pub ws_reconnect: bool,

    /// Maximum stream reconnection attempts.
    #[serde(default = "default_ws_max_reconnect")]
    pub ws_max_reconnect: u32,

    /// Base stream reconnection delay in milliseconds.
    #[serde(default = "default_ws_reconnect_delay_ms")]
    pub ws_reconnect_delay_ms: u64,

    /// Value for the `locale` header.
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Value for the `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Envelope codes treated as success.
    ///
    /// The venue's success-code set is discovered behavior rather than a
    /// documented contract, so it is kept extensible.
    #[serde(default = "default_success_codes")]
    pub success_codes: Vec<String>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_ws_public_url() -> String {
    DEFAULT_WS_PUBLIC_URL.to_string()
}

fn default_ws_private_url() -> String {
    DEFAULT_WS_PRIVATE_URL.to_string()
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_enable_rate_limit() -> bool {
    true
}

fn default_ip_weight() -> u32 {
    300
}

fn default_uid_weight() -> u32 {
    100
}

fn default_refill_window_ms() -> u64 {
    5_000
}

fn default_ws_ping_interval_ms() -> u64 {
    20_000
}

fn default_ws_pong_wait_ms() -> u64 {
    30_000
}

fn default_ws_reconnect() -> bool {
    true
}

fn default_ws_max_reconnect() -> u32 {
    10
}

fn default_ws_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_user_agent() -> String {
    format!("sirocco/{}", env!("CARGO_PKG_VERSION"))
}

fn default_success_codes() -> Vec<String> {
    vec!["0".to_string(), "200".to_string()]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_public_url: default_ws_public_url(),
            ws_private_url: default_ws_private_url(),
            http_timeout_ms: default_http_timeout_ms(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_factor: default_backoff_factor(),
            enable_rate_limit: default_enable_rate_limit(),
            ip_weight: default_ip_weight(),
            uid_weight: default_uid_weight(),
            refill_window_ms: default_refill_window_ms(),
            ws_ping_interval_ms: default_ws_ping_interval_ms(),
            ws_pong_wait_ms: default_ws_pong_wait_ms(),
            ws_reconnect: default_ws_reconnect(),
            ws_max_reconnect: default_ws_max_reconnect(),
            ws_reconnect_delay_ms: default_ws_reconnect_delay_ms(),
            locale: default_locale(),
            user_agent: default_user_agent(),
            success_codes: default_success_codes(),
        }
    }
}

impl Config {
    /// Creates a new builder for `Config`.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Returns the per-request transport deadline as a Duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Returns the initial retry backoff as a Duration.
    #[must_use]
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Returns the maximum retry backoff as a Duration.
    #[must_use]
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Returns the weight refill window as a Duration.
    #[must_use]
    pub fn refill_window(&self) -> Duration {
        Duration::from_millis(self.refill_window_ms)
    }

    /// Returns the stream heartbeat interval as a Duration.
    #[must_use]
    pub fn ws_ping_interval(&self) -> Duration {
        Duration::from_millis(self.ws_ping_interval_ms)
    }

    /// Returns the stream read deadline as a Duration.
    #[must_use]
    pub fn ws_pong_wait(&self) -> Duration {
        Duration::from_millis(self.ws_pong_wait_ms)
    }

    /// Returns the base stream reconnection delay as a Duration.
    #[must_use]
    pub fn ws_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.ws_reconnect_delay_ms)
    }

    /// Returns true if the given envelope code denotes success.
    #[must_use]
    pub fn is_success_code(&self, code: &str) -> bool {
        self.success_codes.iter().any(|c| c == code)
    }

    /// Validates settings shared by public and private use.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on an invalid value.
    pub fn validate_public(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "base_url".to_string(),
            });
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http_timeout_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.initial_backoff_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "initial_backoff_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err(ConfigError::InvalidValue {
                field: "max_backoff_ms".to_string(),
                reason: "must be at least initial_backoff_ms".to_string(),
            });
        }
        if self.backoff_factor <= 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_factor".to_string(),
                reason: "must be greater than 1.0".to_string(),
            });
        }
        if self.refill_window_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "refill_window_ms".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Validates settings for authenticated use.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on an invalid value.
    pub fn validate(&self, has_credentials: bool) -> Result<(), ConfigError> {
        if !has_credentials {
            return Err(ConfigError::MissingCredentials);
        }
        self.validate_public()
    }
}

/// Builder for [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    base_url: Option<String>,
    ws_public_url: Option<String>,
    ws_private_url: Option<String>,
    http_timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    initial_backoff_ms: Option<u64>,
    max_backoff_ms: Option<u64>,
    backoff_factor: Option<f64>,
    enable_rate_limit: Option<bool>,
    ip_weight: Option<u32>,
    uid_weight: Option<u32>,
    refill_window_ms: Option<u64>,
    ws_ping_interval_ms: Option<u64>,
    ws_pong_wait_ms: Option<u64>,
    ws_reconnect: Option<bool>,
    ws_max_reconnect: Option<u32>,
    ws_reconnect_delay_ms: Option<u64>,
    locale: Option<String>,
    user_agent: Option<String>,
    success_codes: Option<Vec<String>>,
}

impl ConfigBuilder {
    /// Sets the REST API base URL.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the public stream URL.
    #[must_use]
    pub fn ws_public_url(mut self, url: impl Into<String>) -> Self {
        self.ws_public_url = Some(url.into());
        self
    }

    /// Sets the private stream URL.
    #[must_use]
    pub fn ws_private_url(mut self, url: impl Into<String>) -> Self {
        self.ws_private_url = Some(url.into());
        self
    }

    /// Sets the per-request transport deadline.
    #[must_use]
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Sets the maximum retry attempts after the first failure.
    #[must_use]
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Sets the initial retry backoff.
    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = Some(backoff.as_millis() as u64);
        self
    }

    /// Sets the maximum retry backoff.
    #[must_use]
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff_ms = Some(backoff.as_millis() as u64);
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = Some(factor);
        self
    }

    /// Enables or disables admission control.
    #[must_use]
    pub fn enable_rate_limit(mut self, enabled: bool) -> Self {
        self.enable_rate_limit = Some(enabled);
        self
    }

    /// Sets the IP weight budget.
    #[must_use]
    pub fn ip_weight(mut self, weight: u32) -> Self {
        self.ip_weight = Some(weight);
        self
    }

    /// Sets the UID weight budget.
    #[must_use]
    pub fn uid_weight(mut self, weight: u32) -> Self {
        self.uid_weight = Some(weight);
        self
    }

    /// Sets the weight refill window.
    #[must_use]
    pub fn refill_window(mut self, window: Duration) -> Self {
        self.refill_window_ms = Some(window.as_millis() as u64);
        self
    }

    /// Sets the stream heartbeat interval.
    #[must_use]
    pub fn ws_ping_interval(mut self, interval: Duration) -> Self {
        self.ws_ping_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Sets the stream read deadline.
    #[must_use]
    pub fn ws_pong_wait(mut self, wait: Duration) -> Self {
        self.ws_pong_wait_ms = Some(wait.as_millis() as u64);
        self
    }

    /// Enables or disables automatic stream reconnection.
    #[must_use]
    pub fn ws_reconnect(mut self, enabled: bool) -> Self {
        self.ws_reconnect = Some(enabled);
        self
    }

    /// Sets the maximum stream reconnection attempts.
    #[must_use]
    pub fn ws_max_reconnect(mut self, attempts: u32) -> Self {
        self.ws_max_reconnect = Some(attempts);
        self
    }

    /// Sets the base stream reconnection delay.
    #[must_use]
    pub fn ws_reconnect_delay(mut self, delay: Duration) -> Self {
        self.ws_reconnect_delay_ms = Some(delay.as_millis() as u64);
        self
    }

    /// Sets the `locale` header value.
    #[must_use]
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Sets the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets the envelope codes treated as success.
    #[must_use]
    pub fn success_codes(mut self, codes: Vec<String>) -> Self {
        self.success_codes = Some(codes);
        self
    }

    /// Builds the `Config`.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            base_url: self.base_url.unwrap_or_else(default_base_url),
            ws_public_url: self.ws_public_url.unwrap_or_else(default_ws_public_url),
            ws_private_url: self.ws_private_url.unwrap_or_else(default_ws_private_url),
            http_timeout_ms: self.http_timeout_ms.unwrap_or_else(default_http_timeout_ms),
            max_retries: self.max_retries.unwrap_or_else(default_max_retries),
            initial_backoff_ms: self
                .initial_backoff_ms
                .unwrap_or_else(default_initial_backoff_ms),
            max_backoff_ms: self.max_backoff_ms.unwrap_or_else(default_max_backoff_ms),
            backoff_factor: self.backoff_factor.unwrap_or_else(default_backoff_factor),
            enable_rate_limit: self
                .enable_rate_limit
                .unwrap_or_else(default_enable_rate_limit),
            ip_weight: self.ip_weight.unwrap_or_else(default_ip_weight),
            uid_weight: self.uid_weight.unwrap_or_else(default_uid_weight),
            refill_window_ms: self
                .refill_window_ms
                .unwrap_or_else(default_refill_window_ms),
            ws_ping_interval_ms: self
                .ws_ping_interval_ms
                .unwrap_or_else(default_ws_ping_interval_ms),
            ws_pong_wait_ms: self.ws_pong_wait_ms.unwrap_or_else(default_ws_pong_wait_ms),
            ws_reconnect: self.ws_reconnect.unwrap_or_else(default_ws_reconnect),
            ws_max_reconnect: self
                .ws_max_reconnect
                .unwrap_or_else(default_ws_max_reconnect),
            ws_reconnect_delay_ms: self
                .ws_reconnect_delay_ms
                .unwrap_or_else(default_ws_reconnect_delay_ms),
            locale: self.locale.unwrap_or_else(default_locale),
            user_agent: self.user_agent.unwrap_or_else(default_user_agent),
            success_codes: self.success_codes.unwrap_or_else(default_success_codes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_backoff(), Duration::from_secs(1));
        assert_eq!(config.max_backoff(), Duration::from_secs(30));
        assert!(config.enable_rate_limit);
        assert_eq!(config.ip_weight, 300);
        assert_eq!(config.uid_weight, 100);
        assert_eq!(config.refill_window(), Duration::from_secs(5));
        assert_eq!(config.ws_ping_interval(), Duration::from_secs(20));
        assert_eq!(config.ws_pong_wait(), Duration::from_secs(30));
        assert!(config.ws_reconnect);
        assert_eq!(config.ws_max_reconnect, 10);
        assert_eq!(config.locale, "en");
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .base_url("https://api.example.com")
            .http_timeout(Duration::from_secs(5))
            .max_retries(5)
            .ip_weight(600)
            .refill_window(Duration::from_secs(300))
            .locale("zh-CN")
            .build();

        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.http_timeout_ms, 5_000);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.ip_weight, 600);
        assert_eq!(config.refill_window_ms, 300_000);
        assert_eq!(config.locale, "zh-CN");
    }

    #[test]
    fn test_success_codes() {
        let config = Config::default();
        assert!(config.is_success_code("0"));
        assert!(config.is_success_code("200"));
        assert!(!config.is_success_code("40007"));

        let extended = Config::builder()
            .success_codes(vec!["0".to_string(), "ok".to_string()])
            .build();
        assert!(extended.is_success_code("ok"));
        assert!(!extended.is_success_code("200"));
    }

    #[test]
    fn test_validate_public_rejects_bad_values() {
        let mut config = Config::default();
        config.http_timeout_ms = 0;
        assert!(config.validate_public().is_err());

        let mut config = Config::default();
        config.backoff_factor = 1.0;
        assert!(config.validate_public().is_err());

        let mut config = Config::default();
        config.max_backoff_ms = 10;
        assert!(config.validate_public().is_err());

        let mut config = Config::default();
        config.refill_window_ms = 0;
        assert!(config.validate_public().is_err());
    }

    #[test]
    fn test_validate_requires_credentials() {
        let config = Config::default();
        assert!(config.validate(false).is_err());
        assert!(config.validate(true).is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = Config::builder()
            .base_url("https://api.example.com")
            .max_retries(7)
            .build();

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.base_url, parsed.base_url);
        assert_eq!(config.max_retries, parsed.max_retries);
        assert_eq!(config.success_codes, parsed.success_codes);
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"max_retries": 1}"#).unwrap();
        assert_eq!(parsed.max_retries, 1);
        assert_eq!(parsed.base_url, DEFAULT_BASE_URL);
        assert_eq!(parsed.ip_weight, 300);
    }
}
