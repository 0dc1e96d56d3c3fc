//! REST request pipeline.
//!
//! A single call runs admission → body serialization → path composition →
//! signing → transport → envelope parse, in that order, exactly once. The
//! retry executor re-drives the whole pipeline, so every attempt draws
//! fresh admission tokens and signs a fresh timestamp.

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use sirocco_core::config::Config;
use sirocco_core::credentials::Credentials;
use sirocco_core::error::{ApiError, DataError, Error, Result};
use sirocco_core::retry::RetryPolicy;

use super::rate_limit::{RateLimiter, Weight};
use super::signer::{timestamp_ms, RequestSigner};
use super::transport::{HttpRequest, HttpTransport, ReqwestTransport};

/// Canonical path prefix for every unary endpoint.
pub const API_PATH_PREFIX: &str = "/capi/v2";

/// The venue's uniform response wrapper.
#[derive(Debug, serde::Deserialize)]
struct Envelope {
    #[serde(default)]
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default, rename = "requestTime")]
    request_time: i64,
    #[serde(default)]
    data: Option<Box<RawValue>>,
}

impl Envelope {
    /// Two envelope shapes co-exist in the wild; a body with none of the
    /// wrapper fields is a bare record and parses directly.
    fn is_wrapper(&self) -> bool {
        !self.code.is_empty() || !self.msg.is_empty() || self.request_time != 0
    }
}

/// REST client: signed, admission-controlled, retrying access to the
/// venue's unary endpoints.
pub struct RestClient {
    config: Config,
    signer: Option<RequestSigner>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    transport: Arc<dyn HttpTransport>,
    cancel: CancellationToken,
}

impl RestClient {
    /// Creates a new REST client with the production transport.
    ///
    /// Without credentials the client can reach public endpoints only.
    ///
    /// # Errors
    ///
    /// Returns an error when the configuration is invalid or the transport
    /// cannot be constructed.
    pub fn new(config: Config, credentials: Option<Credentials>) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Self::with_transport(config, credentials, transport)
    }

    /// Creates a REST client over an injected transport.
    ///
    /// # Errors
    ///
    /// Returns an error when the retry configuration is invalid.
    pub fn with_transport(
        config: Config,
        credentials: Option<Credentials>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self> {
        let retry = RetryPolicy::new(
            config.max_retries,
            config.initial_backoff(),
            config.max_backoff(),
            config.backoff_factor,
        )?;
        let limiter = Arc::new(RateLimiter::from_config(&config));
        let signer = credentials.map(RequestSigner::new);

        Ok(Self {
            config,
            signer,
            limiter,
            retry,
            transport,
            cancel: CancellationToken::new(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the shared admission controller.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Returns the client's cancellation token. Cancelling it aborts every
    /// in-flight and future call with [`sirocco_core::error::Error::Cancelled`].
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancels all in-flight and future calls.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Returns true if the client can sign private requests.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.signer.is_some()
    }

    /// Performs a GET request.
    ///
    /// # Errors
    ///
    /// Returns the categorized error, `Cancelled`, or `RetriesExhausted`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, weight: Weight) -> Result<T> {
        self.request::<(), T>(Method::GET, path, None, weight).await
    }

    /// Performs a POST request.
    ///
    /// # Errors
    ///
    /// Returns the categorized error, `Cancelled`, or `RetriesExhausted`.
    pub async fn post<B, T>(&self, path: &str, body: Option<&B>, weight: Weight) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, body, weight).await
    }

    /// Performs a PUT request.
    ///
    /// # Errors
    ///
    /// Returns the categorized error, `Cancelled`, or `RetriesExhausted`.
    pub async fn put<B, T>(&self, path: &str, body: Option<&B>, weight: Weight) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, body, weight).await
    }

    /// Performs a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns the categorized error, `Cancelled`, or `RetriesExhausted`.
    pub async fn delete<B, T>(&self, path: &str, body: Option<&B>, weight: Weight) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, path, body, weight).await
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        weight: Weight,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.retry
            .run(&self.cancel, || {
                self.execute_once(&method, path, body, weight)
            })
            .await
    }

    /// One pipeline pass. Admission and signing happen here so that every
    /// retry attempt draws new tokens and a new timestamp.
    async fn execute_once<B, T>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&B>,
        weight: Weight,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.limiter.acquire(weight, &self.cancel).await?;

        let body_str = match body {
            Some(value) => serde_json::to_string(value).map_err(|e| DataError::Encode {
                reason: e.to_string(),
            })?,
            None => String::new(),
        };

        let full_path = format!("{API_PATH_PREFIX}{path}");
        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            full_path
        );

        let timestamp = timestamp_ms();
        let headers = match &self.signer {
            Some(signer) => signer.rest_headers(timestamp, method.as_str(), &full_path, &body_str)?,
            None => HeaderMap::new(),
        };

        debug!(
            method = %method,
            path,
            ip_weight = weight.ip,
            uid_weight = weight.uid,
            "sending request"
        );

        let request = HttpRequest {
            method: method.clone(),
            url,
            headers,
            body: (!body_str.is_empty()).then(|| body_str.into_bytes()),
        };
        // Dropping the in-flight execute aborts the transport.
        let response = tokio::select! {
            () = self.cancel.cancelled() => return Err(Error::Cancelled),
            result = self.transport.execute(request) => result?,
        };

        debug!(
            method = %method,
            path,
            status = response.status,
            bytes = response.body.len(),
            "received response"
        );

        parse_response(&self.config, response.status, &response.body)
    }
}

/// Parses a unary response per the envelope contract.
///
/// Wrapped bodies are checked against the success-code set, then `data` is
/// deserialized (or the whole body, for endpoints whose success payload is
/// the envelope itself). Bare bodies parse directly into the expected
/// record. Error statuses without an envelope code synthesize a categorized
/// error from the status alone.
fn parse_response<T: DeserializeOwned>(config: &Config, status: u16, body: &[u8]) -> Result<T> {
    if let Ok(envelope) = serde_json::from_slice::<Envelope>(body) {
        if envelope.is_wrapper() {
            let success = config.is_success_code(&envelope.code)
                || (envelope.code.is_empty() && (200..300).contains(&status));
            if !success {
                return Err(ApiError::from_code(
                    envelope.code,
                    envelope.msg,
                    Some(status),
                    (envelope.request_time != 0).then_some(envelope.request_time),
                )
                .into());
            }
            if let Some(data) = envelope.data {
                return serde_json::from_str(data.get()).map_err(|e| {
                    DataError::Decode {
                        reason: e.to_string(),
                    }
                    .into()
                });
            }
            return serde_json::from_slice(body).map_err(|e| {
                DataError::Decode {
                    reason: e.to_string(),
                }
                .into()
            });
        }
    }

    if status >= 400 {
        let snippet = String::from_utf8_lossy(&body[..body.len().min(256)]).into_owned();
        return Err(ApiError::from_http_status(status, snippet).into());
    }

    serde_json::from_slice(body).map_err(|e| {
        DataError::Decode {
            reason: e.to_string(),
        }
        .into()
    })
}
