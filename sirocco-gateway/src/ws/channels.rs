//! Channel names and typed per-channel payloads.
//!
//! Channel names are dotted strings: `ticker.<symbol>`,
//! `candlestick.<symbol>.<interval>`, and so on. The typed subscribe
//! helpers wrap a caller closure over the decoded payload; the generic
//! [`StreamSession::subscribe`] stays available for raw-frame handlers.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sirocco_core::error::{DataError, Result};

use super::client::StreamSession;

/// `account` private channel.
pub const CHANNEL_ACCOUNT: &str = "account";
/// `positions` private channel.
pub const CHANNEL_POSITIONS: &str = "positions";
/// `orders` private channel.
pub const CHANNEL_ORDERS: &str = "orders";
/// `fill` private channel.
pub const CHANNEL_FILL: &str = "fill";

/// Builds the ticker channel name for a symbol.
#[must_use]
pub fn ticker_channel(symbol: &str) -> String {
    format!("ticker.{symbol}")
}

/// Builds the depth channel name for a symbol.
#[must_use]
pub fn depth_channel(symbol: &str) -> String {
    format!("depth.{symbol}")
}

/// Builds the candlestick channel name for a symbol and interval.
#[must_use]
pub fn candlestick_channel(symbol: &str, interval: &str) -> String {
    format!("candlestick.{symbol}.{interval}")
}

/// Builds the trades channel name for a symbol.
#[must_use]
pub fn trades_channel(symbol: &str) -> String {
    format!("trades.{symbol}")
}

/// Ticker stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Ticker updates.
    #[serde(default)]
    pub data: Vec<TickerItem>,
}

/// One ticker update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerItem {
    /// Contract symbol.
    pub symbol: String,
    /// Last traded price.
    #[serde(default)]
    pub last_price: Decimal,
    /// Best bid price.
    #[serde(default)]
    pub best_bid_price: Decimal,
    /// Best ask price.
    #[serde(default)]
    pub best_ask_price: Decimal,
    /// 24h high.
    #[serde(default)]
    pub high24h: Decimal,
    /// 24h low.
    #[serde(default)]
    pub low24h: Decimal,
    /// 24h base volume.
    #[serde(default)]
    pub volume24h: Decimal,
    /// Update timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// Depth stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Depth updates.
    #[serde(default)]
    pub data: Vec<DepthItem>,
}

/// One order-book update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthItem {
    /// Contract symbol.
    pub symbol: String,
    /// Buy side levels.
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    /// Sell side levels.
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    /// Update timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// One price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price.
    pub price: Decimal,
    /// Quantity at this price.
    pub quantity: Decimal,
}

/// Candlestick stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlestickData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Candle updates.
    #[serde(default)]
    pub data: Vec<CandlestickItem>,
}

/// One candle update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandlestickItem {
    /// Contract symbol.
    pub symbol: String,
    /// Candle interval.
    #[serde(default)]
    pub interval: String,
    /// Open time in milliseconds.
    #[serde(default)]
    pub open_time: i64,
    /// Open price.
    #[serde(default)]
    pub open: Decimal,
    /// High price.
    #[serde(default)]
    pub high: Decimal,
    /// Low price.
    #[serde(default)]
    pub low: Decimal,
    /// Close price.
    #[serde(default)]
    pub close: Decimal,
    /// Base volume.
    #[serde(default)]
    pub volume: Decimal,
}

/// Trades stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradesData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Trade updates.
    #[serde(default)]
    pub data: Vec<TradeItem>,
}

/// One trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeItem {
    /// Contract symbol.
    pub symbol: String,
    /// Trade ID.
    #[serde(default)]
    pub trade_id: String,
    /// Trade price.
    #[serde(default)]
    pub price: Decimal,
    /// Trade size.
    #[serde(default)]
    pub size: Decimal,
    /// `buy` or `sell`.
    #[serde(default)]
    pub side: String,
    /// Trade timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// Account stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Balance updates.
    #[serde(default)]
    pub data: Vec<AccountItem>,
}

/// One balance update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountItem {
    /// Currency name.
    pub coin_name: String,
    /// Available balance.
    #[serde(default)]
    pub available: Decimal,
    /// Frozen balance.
    #[serde(default)]
    pub frozen: Decimal,
    /// Account equity.
    #[serde(default)]
    pub equity: Decimal,
    /// Unrealized PnL.
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    /// Update timestamp in milliseconds.
    #[serde(default)]
    pub update_time: i64,
}

/// Positions stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Position updates.
    #[serde(default)]
    pub data: Vec<PositionItem>,
}

/// One position update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionItem {
    /// Contract symbol.
    pub symbol: String,
    /// `LONG` or `SHORT`.
    #[serde(default)]
    pub position_side: String,
    /// Position size.
    #[serde(default)]
    pub size: Decimal,
    /// Average open price.
    #[serde(default)]
    pub average_open_price: Decimal,
    /// Mark price.
    #[serde(default)]
    pub mark_price: Decimal,
    /// Estimated liquidation price.
    #[serde(default)]
    pub liquidate_price: Decimal,
    /// Unrealized PnL.
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    /// Leverage.
    #[serde(default)]
    pub leverage: Decimal,
    /// Update timestamp in milliseconds.
    #[serde(default)]
    pub update_time: i64,
}

/// Orders stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Order updates.
    #[serde(default)]
    pub data: Vec<OrderItem>,
}

/// One order update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Venue-assigned order ID.
    pub order_id: String,
    /// Client order ID.
    #[serde(default)]
    pub client_oid: String,
    /// Contract symbol.
    #[serde(default)]
    pub symbol: String,
    /// `buy` or `sell`.
    #[serde(default)]
    pub side: String,
    /// Order price.
    #[serde(default)]
    pub price: Decimal,
    /// Order size.
    #[serde(default)]
    pub size: Decimal,
    /// Filled size.
    #[serde(default)]
    pub filled_size: Decimal,
    /// Average fill price.
    #[serde(default)]
    pub avg_fill_price: Decimal,
    /// Order state.
    #[serde(default)]
    pub state: i32,
    /// Update timestamp in milliseconds.
    #[serde(default)]
    pub update_time: i64,
}

/// Fill stream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillData {
    /// Channel the payload arrived on.
    pub channel: String,
    /// Fill notifications.
    #[serde(default)]
    pub data: Vec<FillItem>,
}

/// One fill notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillItem {
    /// Fill ID.
    pub fill_id: String,
    /// Parent order ID.
    #[serde(default)]
    pub order_id: String,
    /// Contract symbol.
    #[serde(default)]
    pub symbol: String,
    /// Fill price.
    #[serde(default)]
    pub price: Decimal,
    /// Fill size.
    #[serde(default)]
    pub size: Decimal,
    /// `buy` or `sell`.
    #[serde(default)]
    pub side: String,
    /// `maker` or `taker`.
    #[serde(default)]
    pub liquidity: String,
    /// Fee charged.
    #[serde(default)]
    pub fee: Decimal,
    /// Fill timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

fn decode_handler<T, F>(callback: F) -> super::subscription::SubscriptionHandler
where
    T: serde::de::DeserializeOwned + 'static,
    F: Fn(T) -> Result<()> + Send + Sync + 'static,
{
    Arc::new(move |raw: &[u8]| {
        let payload: T = serde_json::from_slice(raw).map_err(|e| DataError::Decode {
            reason: e.to_string(),
        })?;
        callback(payload)
    })
}

impl StreamSession {
    /// Subscribes to ticker updates for a symbol.
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_ticker<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(TickerData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(&ticker_channel(symbol), decode_handler(callback))
            .await
    }

    /// Subscribes to order-book depth updates for a symbol.
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_depth<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(DepthData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(&depth_channel(symbol), decode_handler(callback))
            .await
    }

    /// Subscribes to candlestick updates for a symbol and interval.
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_candlestick<F>(
        &self,
        symbol: &str,
        interval: &str,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(CandlestickData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(
            &candlestick_channel(symbol, interval),
            decode_handler(callback),
        )
        .await
    }

    /// Subscribes to trade updates for a symbol.
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_trades<F>(&self, symbol: &str, callback: F) -> Result<()>
    where
        F: Fn(TradesData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(&trades_channel(symbol), decode_handler(callback))
            .await
    }

    /// Subscribes to account balance updates (private sessions).
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_account<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(AccountData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(CHANNEL_ACCOUNT, decode_handler(callback))
            .await
    }

    /// Subscribes to position updates (private sessions).
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_positions<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(PositionData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(CHANNEL_POSITIONS, decode_handler(callback))
            .await
    }

    /// Subscribes to order updates (private sessions).
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_orders<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(OrderData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(CHANNEL_ORDERS, decode_handler(callback))
            .await
    }

    /// Subscribes to fill notifications (private sessions).
    ///
    /// # Errors
    ///
    /// Returns an error when not connected or the frame cannot be enqueued.
    pub async fn subscribe_fills<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(FillData) -> Result<()> + Send + Sync + 'static,
    {
        self.subscribe(CHANNEL_FILL, decode_handler(callback)).await
    }
}
