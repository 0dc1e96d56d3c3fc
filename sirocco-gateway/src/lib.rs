//! # Sirocco Gateway
//!
//! REST pipeline and streaming session for the sirocco venue client.
//!
//! This crate provides:
//! - Signed, admission-controlled, retrying REST access (`rest`)
//! - A reconnecting stream session with a subscription registry and
//!   per-channel dispatch (`ws`)
//! - A top-level [`Client`] wiring both together
//!
//! # Example
//!
//! ```ignore
//! use sirocco_core::{config::Config, credentials::Credentials};
//! use sirocco_gateway::Client;
//!
//! let credentials = Credentials::new("key", "secret").with_passphrase("phrase");
//! let client = Client::new(Config::default(), credentials)?;
//! let ticker = client.market().ticker("cmt_btcusdt").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]

/// REST client infrastructure.
pub mod rest;

/// Stream client infrastructure.
pub mod ws;

mod client;

pub use client::Client;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::rest::{
        MarketService, RateLimiter, RequestSigner, RestClient, TokenBucket, TradeService, Weight,
    };
    pub use crate::ws::{SessionState, StreamSession, SubscriptionHandler, SubscriptionRegistry};
    pub use sirocco_core::prelude::*;
}
