//! HTTP transport abstraction.
//!
//! The request pipeline depends on this narrow trait rather than on a
//! concrete HTTP client, so it can be driven in tests without a network.
//! [`ReqwestTransport`] is the production implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;

use sirocco_core::config::Config;
use sirocco_core::error::{ConfigError, Error, NetworkError};

use super::signer::HEADER_LOCALE;

/// A fully prepared HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including query.
    pub url: String,
    /// Per-request headers (authentication bundle).
    pub headers: HeaderMap,
    /// Serialized JSON body, if any.
    pub body: Option<Vec<u8>>,
}

/// A raw HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Full response body.
    pub body: Vec<u8>,
}

/// Minimal HTTP execution capability consumed by the request pipeline.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Executes one request and reads the full response body.
    ///
    /// # Errors
    ///
    /// Returns `NetworkError` on connect, timeout, or read failures; HTTP
    /// error statuses are returned as responses, not errors.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError>;
}

/// Production transport backed by `reqwest`.
///
/// `Content-Type`, `User-Agent`, and `locale` ride as default headers on
/// every request; the per-request header bundle carries authentication.
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout_ms: u64,
}

impl ReqwestTransport {
    /// Creates a new transport from the client configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when a configured header value is invalid or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).map_err(|_| {
                ConfigError::InvalidValue {
                    field: "user_agent".to_string(),
                    reason: "not a valid header value".to_string(),
                }
            })?,
        );
        headers.insert(
            HEADER_LOCALE,
            HeaderValue::from_str(&config.locale).map_err(|_| ConfigError::InvalidValue {
                field: "locale".to_string(),
                reason: "not a valid header value".to_string(),
            })?,
        );

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                Error::Network(NetworkError::ConnectionFailed {
                    reason: format!("failed to create http client: {e}"),
                })
            })?;

        Ok(Self {
            client,
            timeout_ms: config.http_timeout_ms,
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, NetworkError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                NetworkError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else if e.is_connect() {
                NetworkError::ConnectionFailed {
                    reason: e.to_string(),
                }
            } else {
                NetworkError::Http {
                    status_code: e.status().map_or(0, |s| s.as_u16()),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| NetworkError::ConnectionClosed {
                reason: format!("failed to read response body: {e}"),
            })?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_creation() {
        let config = Config::default();
        let transport = ReqwestTransport::new(&config).unwrap();
        assert_eq!(transport.timeout_ms, 10_000);
    }

    #[test]
    fn test_transport_rejects_bad_header_values() {
        let mut config = Config::default();
        config.locale = "bad\nvalue".to_string();
        assert!(ReqwestTransport::new(&config).is_err());
    }
}
