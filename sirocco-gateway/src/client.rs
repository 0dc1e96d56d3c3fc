//! Top-level venue client.

use std::sync::Arc;

use sirocco_core::config::Config;
use sirocco_core::credentials::Credentials;
use sirocco_core::error::Result;

use crate::rest::{AccountService, MarketService, RestClient, TradeService};
use crate::ws::StreamSession;

/// The venue client: REST services plus stream session constructors.
///
/// # Example
///
/// ```ignore
/// use sirocco_core::{config::Config, credentials::Credentials};
/// use sirocco_gateway::Client;
///
/// let credentials = Credentials::new("key", "secret").with_passphrase("phrase");
/// let client = Client::new(Config::default(), credentials)?;
///
/// let ticker = client.market().ticker("cmt_btcusdt").await?;
/// let order = client.trade().place_order(&request).await?;
/// ```
pub struct Client {
    config: Config,
    credentials: Option<Credentials>,
    market: MarketService,
    account: AccountService,
    trade: TradeService,
    rest: Arc<RestClient>,
}

impl Client {
    /// Creates an authenticated client.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration is invalid or the
    /// credentials are incomplete.
    pub fn new(config: Config, credentials: Credentials) -> Result<Self> {
        config.validate(credentials.is_complete())?;
        Self::build(config, Some(credentials))
    }

    /// Creates a client for public endpoints only.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the configuration is invalid.
    pub fn new_public(config: Config) -> Result<Self> {
        config.validate_public()?;
        Self::build(config, None)
    }

    fn build(config: Config, credentials: Option<Credentials>) -> Result<Self> {
        let rest = Arc::new(RestClient::new(config.clone(), credentials.clone())?);
        Ok(Self {
            market: MarketService::new(Arc::clone(&rest)),
            account: AccountService::new(Arc::clone(&rest)),
            trade: TradeService::new(Arc::clone(&rest)),
            config,
            credentials,
            rest,
        })
    }

    /// Returns the market-data service.
    #[must_use]
    pub fn market(&self) -> &MarketService {
        &self.market
    }

    /// Returns the account service. Requires credentials to succeed against
    /// the venue.
    #[must_use]
    pub fn account(&self) -> &AccountService {
        &self.account
    }

    /// Returns the trading service. Requires credentials to succeed against
    /// the venue.
    #[must_use]
    pub fn trade(&self) -> &TradeService {
        &self.trade
    }

    /// Returns the underlying REST client.
    #[must_use]
    pub fn rest(&self) -> &Arc<RestClient> {
        &self.rest
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Creates a session over the public stream endpoint.
    #[must_use]
    pub fn public_stream(&self) -> StreamSession {
        StreamSession::public(self.config.clone())
    }

    /// Creates a session over the private stream endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the client has no credentials.
    pub fn private_stream(&self) -> Result<StreamSession> {
        let credentials = self
            .credentials
            .clone()
            .ok_or(sirocco_core::error::ConfigError::MissingCredentials)?;
        Ok(StreamSession::private(self.config.clone(), credentials))
    }

    /// Cancels every in-flight and future REST call.
    pub fn shutdown(&self) {
        self.rest.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_client() {
        let client = Client::new_public(Config::default()).unwrap();
        assert!(!client.rest().is_authenticated());
        assert!(client.private_stream().is_err());
    }

    #[test]
    fn test_authenticated_client() {
        let credentials = Credentials::new("key", "secret").with_passphrase("phrase");
        let client = Client::new(Config::default(), credentials).unwrap();
        assert!(client.rest().is_authenticated());
        assert!(client.private_stream().is_ok());
    }

    #[test]
    fn test_incomplete_credentials_rejected() {
        // No passphrase.
        let credentials = Credentials::new("key", "secret");
        assert!(Client::new(Config::default(), credentials).is_err());
    }
}
