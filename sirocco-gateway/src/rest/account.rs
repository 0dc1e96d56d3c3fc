//! Private account and position endpoints.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sirocco_core::error::{ApiError, Result};

use super::client::RestClient;
use super::rate_limit::Weight;

const ACCOUNTS_WEIGHT: Weight = Weight::new(10, 5);
const ASSET_WEIGHT: Weight = Weight::new(5, 2);
const POSITIONS_WEIGHT: Weight = Weight::new(20, 10);
const POSITION_WEIGHT: Weight = Weight::new(5, 2);
const LEVERAGE_WEIGHT: Weight = Weight::new(10, 5);

/// Per-coin account balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
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
    pub unrealized: Decimal,
    /// Margin mode: 1 cross, 3 isolated.
    #[serde(default)]
    pub margin_mode: i32,
}

/// Single-asset detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
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
    /// Margin balance.
    #[serde(default)]
    pub margin_balance: Decimal,
    /// Margin rate.
    #[serde(default)]
    pub margin_rate: Decimal,
}

/// An open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Position ID.
    #[serde(default)]
    pub id: i64,
    /// Contract symbol.
    pub symbol: String,
    /// Position side, `LONG` or `SHORT`.
    #[serde(default)]
    pub side: String,
    /// Margin mode.
    #[serde(default)]
    pub margin_mode: String,
    /// Leverage.
    #[serde(default)]
    pub leverage: Decimal,
    /// Position size.
    #[serde(default)]
    pub size: Decimal,
    /// Average open value.
    #[serde(default)]
    pub open_value: Decimal,
    /// Margin allocated to the position.
    #[serde(default, rename = "marginSize")]
    pub margin_size: Decimal,
    /// Unrealized PnL.
    #[serde(default, rename = "unrealizePnl")]
    pub unrealized_pnl: Decimal,
    /// Estimated liquidation price.
    #[serde(default, rename = "liquidatePrice")]
    pub liquidate_price: Decimal,
    /// Last update time in milliseconds.
    #[serde(default)]
    pub updated_time: i64,
}

/// Request to adjust leverage on a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustLeverageRequest {
    /// Contract symbol.
    pub symbol: String,
    /// Margin mode: 1 cross, 3 isolated.
    pub margin_mode: i32,
    /// Target leverage.
    pub leverage: Decimal,
    /// Position side for isolated mode, `LONG` or `SHORT`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

/// Result of a leverage adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustLeverageResponse {
    /// Contract symbol.
    #[serde(default)]
    pub symbol: String,
    /// Leverage now in effect.
    #[serde(default)]
    pub leverage: Decimal,
    /// Whether the adjustment was accepted.
    #[serde(default)]
    pub result: bool,
}

/// Private account service. Requires credentials.
pub struct AccountService {
    client: Arc<RestClient>,
}

impl AccountService {
    pub(crate) fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    /// Lists balances for every coin.
    ///
    /// `GET /account/accounts`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn accounts(&self) -> Result<Vec<AccountInfo>> {
        self.client.get("/account/accounts", ACCOUNTS_WEIGHT).await
    }

    /// Fetches the balance of a single coin.
    ///
    /// `GET /account/asset`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn asset(&self, coin: &str) -> Result<AssetInfo> {
        if coin.is_empty() {
            return Err(ApiError::validation("coin cannot be empty").into());
        }
        let path = format!("/account/asset?coin={coin}");
        self.client.get(&path, ASSET_WEIGHT).await
    }

    /// Lists every open position, optionally filtered to one symbol.
    ///
    /// `GET /account/positions`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn positions(&self, symbol: Option<&str>) -> Result<Vec<Position>> {
        let path = match symbol {
            Some(symbol) => format!("/account/positions?symbol={symbol}"),
            None => "/account/positions".to_string(),
        };
        self.client.get(&path, POSITIONS_WEIGHT).await
    }

    /// Fetches the position on one contract.
    ///
    /// `GET /account/position`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn position(&self, symbol: &str) -> Result<Position> {
        if symbol.is_empty() {
            return Err(ApiError::validation("symbol cannot be empty").into());
        }
        let path = format!("/account/position?symbol={symbol}");
        self.client.get(&path, POSITION_WEIGHT).await
    }

    /// Adjusts leverage on a contract.
    ///
    /// `POST /account/leverage`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn adjust_leverage(
        &self,
        request: &AdjustLeverageRequest,
    ) -> Result<AdjustLeverageResponse> {
        if request.symbol.is_empty() {
            return Err(ApiError::validation("symbol cannot be empty").into());
        }
        self.client
            .post("/account/leverage", Some(request), LEVERAGE_WEIGHT)
            .await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_account_info_deserializes() {
        let body = r#"{
            "coinName": "USDT",
            "available": "1000.5",
            "frozen": "10",
            "equity": "1010.5",
            "unrealized": "-2.5",
            "marginMode": 1
        }"#;
        let info: AccountInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.coin_name, "USDT");
        assert_eq!(info.available, dec!(1000.5));
        assert_eq!(info.unrealized, dec!(-2.5));
    }

    #[test]
    fn test_position_deserializes_mixed_case_wire() {
        // The venue mixes snake_case and camelCase on this record.
        let body = r#"{
            "id": 7,
            "symbol": "cmt_btcusdt",
            "side": "LONG",
            "margin_mode": "CROSS",
            "leverage": "10",
            "size": "0.5",
            "open_value": "32000",
            "marginSize": "3200",
            "unrealizePnl": "15.5",
            "liquidatePrice": "58000",
            "updated_time": 1700000000000
        }"#;
        let position: Position = serde_json::from_str(body).unwrap();
        assert_eq!(position.side, "LONG");
        assert_eq!(position.leverage, dec!(10));
        assert_eq!(position.unrealized_pnl, dec!(15.5));
        assert_eq!(position.liquidate_price, dec!(58000));
    }

    #[test]
    fn test_adjust_leverage_request_serializes() {
        let request = AdjustLeverageRequest {
            symbol: "cmt_btcusdt".to_string(),
            margin_mode: 1,
            leverage: dec!(20),
            side: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["symbol"], "cmt_btcusdt");
        assert_eq!(json["marginMode"], 1);
        assert_eq!(json["leverage"], "20");
        assert!(json.get("side").is_none());
    }
}
