//! Public market-data endpoints.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sirocco_core::error::{ApiError, Result};

use super::client::RestClient;
use super::rate_limit::Weight;

const CONTRACTS_WEIGHT: Weight = Weight::new(10, 5);
const TICKER_WEIGHT: Weight = Weight::new(5, 2);
const TICKERS_WEIGHT: Weight = Weight::new(20, 10);
const DEPTH_WEIGHT: Weight = Weight::new(10, 5);
const KLINES_WEIGHT: Weight = Weight::new(10, 5);
const TRADES_WEIGHT: Weight = Weight::new(10, 5);
const SERVER_TIME_WEIGHT: Weight = Weight::new(1, 1);
const INDEX_WEIGHT: Weight = Weight::new(5, 2);
const FUNDING_RATE_WEIGHT: Weight = Weight::new(5, 2);

/// Contract metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractInfo {
    /// Contract symbol, e.g. `cmt_btcusdt`.
    pub symbol: String,
    /// Base coin.
    #[serde(default)]
    pub base_coin: String,
    /// Quote coin.
    #[serde(default)]
    pub quote_coin: String,
    /// Contract type, e.g. `PERPETUAL`.
    #[serde(default)]
    pub contract_type: String,
    /// Minimum price increment.
    #[serde(default)]
    pub price_tick: Decimal,
    /// Minimum order size.
    #[serde(default)]
    pub lot_size: Decimal,
    /// Maximum leverage.
    #[serde(default)]
    pub max_leverage: Decimal,
    /// Maker fee rate.
    #[serde(default)]
    pub maker_fee: Decimal,
    /// Taker fee rate.
    #[serde(default)]
    pub taker_fee: Decimal,
}

/// 24h ticker snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// Contract symbol.
    pub symbol: String,
    /// Last traded price.
    #[serde(default)]
    pub last_price: Decimal,
    /// Mark price.
    #[serde(default)]
    pub mark_price: Decimal,
    /// Index price.
    #[serde(default)]
    pub index_price: Decimal,
    /// 24h high.
    #[serde(default)]
    pub high_price: Decimal,
    /// 24h low.
    #[serde(default)]
    pub low_price: Decimal,
    /// 24h base volume.
    #[serde(default)]
    pub volume: Decimal,
    /// 24h quote volume.
    #[serde(default)]
    pub quote_volume: Decimal,
    /// Best bid price.
    #[serde(default)]
    pub bid_price: Decimal,
    /// Best ask price.
    #[serde(default)]
    pub ask_price: Decimal,
    /// 24h price change.
    #[serde(default)]
    pub price_change: Decimal,
    /// 24h price change percentage.
    #[serde(default)]
    pub price_change_percent: Decimal,
}

/// One order-book level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthEntry {
    /// Price level.
    pub price: Decimal,
    /// Quantity at this level.
    pub quantity: Decimal,
}

/// Order-book snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    /// Contract symbol.
    pub symbol: String,
    /// Buy side, price descending.
    #[serde(default)]
    pub bids: Vec<DepthEntry>,
    /// Sell side, price ascending.
    #[serde(default)]
    pub asks: Vec<DepthEntry>,
    /// Snapshot timestamp in milliseconds.
    #[serde(default)]
    pub time: i64,
}

/// One candlestick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kline {
    /// Open time in milliseconds.
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
    /// Close time in milliseconds.
    #[serde(default)]
    pub close_time: i64,
    /// Quote volume.
    #[serde(default)]
    pub quote_volume: Decimal,
}

/// One public trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTrade {
    /// Trade ID.
    pub id: i64,
    /// Trade price.
    #[serde(default)]
    pub price: Decimal,
    /// Trade quantity.
    #[serde(default)]
    pub qty: Decimal,
    /// Trade time in milliseconds.
    #[serde(default)]
    pub time: i64,
    /// True when the buyer was the maker.
    #[serde(default)]
    pub is_buyer_maker: bool,
}

/// Venue clock reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerTime {
    /// Venue timestamp in milliseconds.
    pub server_time: i64,
}

/// Index price snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPrice {
    /// Contract symbol.
    pub symbol: String,
    /// Index price.
    #[serde(default)]
    pub index_price: Decimal,
    /// Snapshot timestamp in milliseconds.
    #[serde(default)]
    pub time: i64,
}

/// Current funding rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRate {
    /// Contract symbol.
    pub symbol: String,
    /// Current funding rate.
    #[serde(default)]
    pub funding_rate: Decimal,
    /// Current funding time in milliseconds.
    #[serde(default)]
    pub funding_time: i64,
    /// Next funding time in milliseconds.
    #[serde(default)]
    pub next_funding_time: i64,
}

/// Public market-data service.
pub struct MarketService {
    client: Arc<RestClient>,
}

impl MarketService {
    pub(crate) fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    /// Lists contracts, optionally filtered to one symbol.
    ///
    /// `GET /market/contracts`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn contracts(&self, symbol: Option<&str>) -> Result<Vec<ContractInfo>> {
        let path = match symbol {
            Some(symbol) => format!("/market/contracts?symbol={symbol}"),
            None => "/market/contracts".to_string(),
        };
        self.client.get(&path, CONTRACTS_WEIGHT).await
    }

    /// Fetches the ticker for one contract.
    ///
    /// `GET /market/ticker`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        validate_symbol(symbol)?;
        let path = format!("/market/ticker?symbol={symbol}");
        self.client.get(&path, TICKER_WEIGHT).await
    }

    /// Fetches tickers for every contract.
    ///
    /// `GET /market/tickers`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn tickers(&self) -> Result<Vec<Ticker>> {
        self.client.get("/market/tickers", TICKERS_WEIGHT).await
    }

    /// Fetches order-book depth.
    ///
    /// `GET /market/depth`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn depth(&self, symbol: &str, limit: Option<u32>) -> Result<Depth> {
        validate_symbol(symbol)?;
        let path = match limit {
            Some(limit) => format!("/market/depth?symbol={symbol}&limit={limit}"),
            None => format!("/market/depth?symbol={symbol}"),
        };
        self.client.get(&path, DEPTH_WEIGHT).await
    }

    /// Fetches candlesticks.
    ///
    /// `GET /market/klines`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn klines(&self, request: &KlinesRequest) -> Result<Vec<Kline>> {
        validate_symbol(&request.symbol)?;
        if request.interval.is_empty() {
            return Err(ApiError::validation("interval cannot be empty").into());
        }

        let mut path = format!(
            "/market/klines?symbol={}&interval={}",
            request.symbol, request.interval
        );
        if let Some(start) = request.start_time {
            path.push_str(&format!("&startTime={start}"));
        }
        if let Some(end) = request.end_time {
            path.push_str(&format!("&endTime={end}"));
        }
        if let Some(limit) = request.limit {
            path.push_str(&format!("&limit={limit}"));
        }
        self.client.get(&path, KLINES_WEIGHT).await
    }

    /// Fetches recent trades.
    ///
    /// `GET /market/trades`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn trades(&self, symbol: &str, limit: Option<u32>) -> Result<Vec<PublicTrade>> {
        validate_symbol(symbol)?;
        let path = match limit {
            Some(limit) => format!("/market/trades?symbol={symbol}&limit={limit}"),
            None => format!("/market/trades?symbol={symbol}"),
        };
        self.client.get(&path, TRADES_WEIGHT).await
    }

    /// Reads the venue clock.
    ///
    /// `GET /market/time`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn server_time(&self) -> Result<ServerTime> {
        self.client.get("/market/time", SERVER_TIME_WEIGHT).await
    }

    /// Fetches the index price for one contract.
    ///
    /// `GET /market/index`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn index_price(&self, symbol: &str) -> Result<IndexPrice> {
        validate_symbol(symbol)?;
        let path = format!("/market/index?symbol={symbol}");
        self.client.get(&path, INDEX_WEIGHT).await
    }

    /// Fetches the current funding rate.
    ///
    /// `GET /market/fundingRate`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn funding_rate(&self, symbol: &str) -> Result<FundingRate> {
        validate_symbol(symbol)?;
        let path = format!("/market/fundingRate?symbol={symbol}");
        self.client.get(&path, FUNDING_RATE_WEIGHT).await
    }
}

/// Candlestick query parameters.
#[derive(Debug, Clone, Default)]
pub struct KlinesRequest {
    /// Contract symbol.
    pub symbol: String,
    /// Candle interval, e.g. `1m`, `1h`, `1d`.
    pub interval: String,
    /// Range start in milliseconds.
    pub start_time: Option<i64>,
    /// Range end in milliseconds.
    pub end_time: Option<i64>,
    /// Maximum candles to return.
    pub limit: Option<u32>,
}

fn validate_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(ApiError::validation("symbol cannot be empty").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_ticker_deserializes_from_wire_shape() {
        let body = r#"{
            "symbol": "cmt_btcusdt",
            "lastPrice": "64250.5",
            "markPrice": "64251.0",
            "highPrice": "65000",
            "lowPrice": "63000",
            "volume": "1234.5",
            "bidPrice": "64250.0",
            "askPrice": "64251.5",
            "priceChangePercent": "1.25"
        }"#;
        let ticker: Ticker = serde_json::from_str(body).unwrap();
        assert_eq!(ticker.symbol, "cmt_btcusdt");
        assert_eq!(ticker.last_price, dec!(64250.5));
        assert_eq!(ticker.price_change_percent, dec!(1.25));
        // Omitted fields default to zero.
        assert_eq!(ticker.index_price, Decimal::ZERO);
    }

    #[test]
    fn test_depth_deserializes() {
        let body = r#"{
            "symbol": "cmt_btcusdt",
            "bids": [{"price": "100.5", "quantity": "2"}],
            "asks": [{"price": "101.0", "quantity": "3"}],
            "time": 1700000000000
        }"#;
        let depth: Depth = serde_json::from_str(body).unwrap();
        assert_eq!(depth.bids.len(), 1);
        assert_eq!(depth.bids[0].price, dec!(100.5));
        assert_eq!(depth.asks[0].quantity, dec!(3));
    }

    #[test]
    fn test_kline_deserializes() {
        let body = r#"{
            "openTime": 1700000000000,
            "open": "100",
            "high": "110",
            "low": "90",
            "close": "105",
            "volume": "42",
            "closeTime": 1700000059999,
            "quoteVolume": "4410"
        }"#;
        let kline: Kline = serde_json::from_str(body).unwrap();
        assert_eq!(kline.open, dec!(100));
        assert_eq!(kline.close, dec!(105));
    }

    #[tokio::test]
    async fn test_empty_symbol_rejected_locally() {
        use std::sync::Arc;

        // No transport call should ever happen; constructing the client with
        // the production transport is safe because validation fails first.
        let client = Arc::new(
            RestClient::new(sirocco_core::config::Config::default(), None).unwrap(),
        );
        let market = MarketService::new(client);

        let err = market.ticker("").await.unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.kind, sirocco_core::error::ErrorKind::Validation);
    }
}
