//! Private order and trading endpoints.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sirocco_core::error::{ApiError, Result};

use super::client::RestClient;
use super::rate_limit::Weight;

const PLACE_ORDER_WEIGHT: Weight = Weight::new(2, 5);
const BATCH_ORDERS_WEIGHT: Weight = Weight::new(5, 10);
const CANCEL_ORDER_WEIGHT: Weight = Weight::new(2, 3);
const CANCEL_BATCH_WEIGHT: Weight = Weight::new(5, 10);
const CANCEL_ALL_WEIGHT: Weight = Weight::new(40, 50);
const ORDER_DETAIL_WEIGHT: Weight = Weight::new(2, 2);
const OPEN_ORDERS_WEIGHT: Weight = Weight::new(2, 2);
const ORDER_HISTORY_WEIGHT: Weight = Weight::new(10, 10);
const FILLS_WEIGHT: Weight = Weight::new(5, 5);

/// Maximum orders accepted in one batch request.
pub const MAX_BATCH_ORDERS: usize = 20;

/// Order intent: the venue encodes open/close and direction together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderIntent {
    /// Open a long position.
    #[serde(rename = "1")]
    OpenLong,
    /// Open a short position.
    #[serde(rename = "2")]
    OpenShort,
    /// Close a long position.
    #[serde(rename = "3")]
    CloseLong,
    /// Close a short position.
    #[serde(rename = "4")]
    CloseShort,
}

/// Execution constraint for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionType {
    /// Normal order.
    #[serde(rename = "0")]
    Normal,
    /// Maker-only order.
    #[serde(rename = "1")]
    PostOnly,
    /// Fill entirely or cancel.
    #[serde(rename = "2")]
    FillOrKill,
    /// Fill what is possible, cancel the rest.
    #[serde(rename = "3")]
    ImmediateOrCancel,
}

/// Price mode for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceMode {
    /// Limit price.
    #[serde(rename = "0")]
    Limit,
    /// Market price.
    #[serde(rename = "1")]
    Market,
}

/// Request to place a single order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Contract symbol.
    pub symbol: String,
    /// Client-chosen order ID, at most 40 characters.
    pub client_oid: String,
    /// Order quantity.
    pub size: Decimal,
    /// Order intent.
    #[serde(rename = "type")]
    pub intent: OrderIntent,
    /// Execution constraint.
    pub order_type: ExecutionType,
    /// Price mode.
    pub match_price: PriceMode,
    /// Limit price; ignored for market orders.
    pub price: Decimal,
    /// Margin mode: 1 cross, 3 isolated.
    #[serde(rename = "marginMode", skip_serializing_if = "Option::is_none")]
    pub margin_mode: Option<i32>,
}

/// Acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    /// Client order ID.
    #[serde(default)]
    pub client_oid: String,
    /// Venue-assigned order ID.
    #[serde(default)]
    pub order_id: String,
}

/// One order inside a batch request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOrderRequest {
    /// Client-chosen order ID.
    pub client_oid: String,
    /// Order quantity.
    pub size: Decimal,
    /// Order intent.
    #[serde(rename = "type")]
    pub intent: OrderIntent,
    /// Execution constraint.
    pub order_type: ExecutionType,
    /// Price mode.
    pub match_price: PriceMode,
    /// Limit price.
    pub price: Decimal,
}

/// Request to place up to [`MAX_BATCH_ORDERS`] orders at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceBatchOrdersRequest {
    /// Contract symbol shared by all orders.
    pub symbol: String,
    /// Margin mode: 1 cross, 3 isolated.
    #[serde(rename = "marginMode", skip_serializing_if = "Option::is_none")]
    pub margin_mode: Option<i32>,
    /// Orders to place.
    #[serde(rename = "orderDataList")]
    pub orders: Vec<BatchOrderRequest>,
}

/// Per-order outcome in a batch response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOrderResult {
    /// Venue-assigned order ID.
    #[serde(default)]
    pub order_id: String,
    /// Client order ID.
    #[serde(default)]
    pub client_oid: String,
    /// Whether the order was accepted.
    #[serde(default)]
    pub result: bool,
    /// Error code when rejected.
    #[serde(default)]
    pub error_code: String,
    /// Error message when rejected.
    #[serde(default)]
    pub error_message: String,
}

/// Acknowledgement of a batch order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceBatchOrdersResponse {
    /// Per-order outcomes.
    #[serde(default, rename = "order_info")]
    pub order_info: Vec<BatchOrderResult>,
    /// Whether the batch was accepted as a whole.
    #[serde(default)]
    pub result: bool,
}

/// Request to cancel a single order by venue ID or client ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    /// Venue-assigned order ID.
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Client order ID.
    #[serde(rename = "clientOid", skip_serializing_if = "Option::is_none")]
    pub client_oid: Option<String>,
}

/// Acknowledgement of a cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelOrderResponse {
    /// Venue-assigned order ID.
    #[serde(default)]
    pub order_id: String,
    /// Client order ID.
    #[serde(default)]
    pub client_oid: String,
    /// Whether the cancellation succeeded.
    #[serde(default)]
    pub result: bool,
    /// Error message when it did not.
    #[serde(default)]
    pub err_msg: String,
}

/// Request to cancel several orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelBatchOrdersRequest {
    /// Venue-assigned order IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
    /// Client order IDs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cids: Vec<String>,
}

/// Acknowledgement of a batch cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelBatchOrdersResponse {
    /// Whether the batch was accepted as a whole.
    #[serde(default)]
    pub result: bool,
    /// Per-order outcomes.
    #[serde(default, rename = "cancelOrderResultList")]
    pub results: Vec<CancelOrderResponse>,
    /// Failed cancellations.
    #[serde(default, rename = "failInfos")]
    pub failures: Vec<CancelOrderResponse>,
}

/// Request to cancel every order, optionally scoped to one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CancelAllOrdersRequest {
    /// Contract symbol; all symbols when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// `normal` for resting orders, `plan` for trigger orders.
    #[serde(rename = "cancelOrderType")]
    pub cancel_order_type: String,
}

/// Per-order outcome of a cancel-all request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelAllResult {
    /// Venue-assigned order ID.
    #[serde(default)]
    pub order_id: i64,
    /// Whether the order was cancelled.
    #[serde(default)]
    pub success: bool,
}

/// An order as returned by the open-order and history queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Contract symbol.
    pub symbol: String,
    /// Order quantity.
    #[serde(default)]
    pub size: Decimal,
    /// Client order ID.
    #[serde(default)]
    pub client_oid: String,
    /// Venue-assigned order ID.
    #[serde(default)]
    pub order_id: String,
    /// Order price.
    #[serde(default)]
    pub price: Decimal,
    /// Average fill price.
    #[serde(default)]
    pub price_avg: Decimal,
    /// Filled quantity.
    #[serde(default)]
    pub filled_qty: Decimal,
    /// Accumulated fee.
    #[serde(default)]
    pub fee: Decimal,
    /// Order status.
    #[serde(default)]
    pub status: String,
    /// Order intent, `1`..`4`.
    #[serde(default, rename = "type")]
    pub intent: String,
    /// Execution constraint, `0`..`3`.
    #[serde(default)]
    pub order_type: String,
    /// Creation time (Unix millisecond timestamp, as text on the wire).
    #[serde(default, rename = "createTime")]
    pub create_time: String,
}

/// One fill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    /// Fill ID.
    #[serde(default)]
    pub trade_id: i64,
    /// Parent order ID.
    #[serde(default)]
    pub order_id: i64,
    /// Contract symbol.
    pub symbol: String,
    /// Position side.
    #[serde(default)]
    pub position_side: String,
    /// Order side.
    #[serde(default)]
    pub order_side: String,
    /// Filled quantity.
    #[serde(default)]
    pub fill_size: Decimal,
    /// Filled value.
    #[serde(default)]
    pub fill_value: Decimal,
    /// Fee charged.
    #[serde(default)]
    pub fill_fee: Decimal,
    /// Realized PnL.
    #[serde(default, rename = "realizePnl")]
    pub realized_pnl: Decimal,
    /// Fill time in milliseconds.
    #[serde(default)]
    pub created_time: i64,
}

/// Paged fills response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FillsResponse {
    /// Fills on this page.
    #[serde(default)]
    pub list: Vec<Fill>,
    /// Whether more pages exist.
    #[serde(default)]
    pub next_flag: bool,
    /// Total entries.
    #[serde(default)]
    pub totals: i64,
}

/// Open-order and history query parameters.
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Contract symbol.
    pub symbol: Option<String>,
    /// Filter to one order ID.
    pub order_id: Option<i64>,
    /// Range start in milliseconds.
    pub start_time: Option<i64>,
    /// Range end in milliseconds.
    pub end_time: Option<i64>,
    /// Maximum rows to return.
    pub limit: Option<u32>,
}

impl OrderQuery {
    fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(symbol) = &self.symbol {
            parts.push(format!("symbol={symbol}"));
        }
        if let Some(order_id) = self.order_id {
            parts.push(format!("orderId={order_id}"));
        }
        if let Some(start) = self.start_time {
            parts.push(format!("startTime={start}"));
        }
        if let Some(end) = self.end_time {
            parts.push(format!("endTime={end}"));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!("?{}", parts.join("&"))
        }
    }
}

/// Private trading service. Requires credentials.
pub struct TradeService {
    client: Arc<RestClient>,
}

impl TradeService {
    pub(crate) fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    /// Places a single order.
    ///
    /// `POST /order/placeOrder`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<PlaceOrderResponse> {
        if request.symbol.is_empty() {
            return Err(ApiError::validation("symbol cannot be empty").into());
        }
        if request.client_oid.len() > 40 {
            return Err(ApiError::validation("client_oid exceeds 40 characters").into());
        }
        self.client
            .post("/order/placeOrder", Some(request), PLACE_ORDER_WEIGHT)
            .await
    }

    /// Places up to [`MAX_BATCH_ORDERS`] orders in one request.
    ///
    /// `POST /order/batchOrders`
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty or oversized batch, or the
    /// categorized error on failure.
    pub async fn place_batch_orders(
        &self,
        request: &PlaceBatchOrdersRequest,
    ) -> Result<PlaceBatchOrdersResponse> {
        if request.orders.is_empty() {
            return Err(ApiError::validation("batch contains no orders").into());
        }
        if request.orders.len() > MAX_BATCH_ORDERS {
            return Err(ApiError::validation(format!(
                "maximum {MAX_BATCH_ORDERS} orders allowed in batch, got {}",
                request.orders.len()
            ))
            .into());
        }
        self.client
            .post("/order/batchOrders", Some(request), BATCH_ORDERS_WEIGHT)
            .await
    }

    /// Cancels a single order.
    ///
    /// `POST /order/cancel_order`
    ///
    /// # Errors
    ///
    /// Returns a validation error when neither identifier is given, or the
    /// categorized error on failure.
    pub async fn cancel_order(&self, request: &CancelOrderRequest) -> Result<CancelOrderResponse> {
        if request.order_id.is_none() && request.client_oid.is_none() {
            return Err(ApiError::validation("either orderId or clientOid is required").into());
        }
        self.client
            .post("/order/cancel_order", Some(request), CANCEL_ORDER_WEIGHT)
            .await
    }

    /// Cancels several orders in one request.
    ///
    /// `POST /order/cancel_batch_orders`
    ///
    /// # Errors
    ///
    /// Returns a validation error when neither id list is given, or the
    /// categorized error on failure.
    pub async fn cancel_batch_orders(
        &self,
        request: &CancelBatchOrdersRequest,
    ) -> Result<CancelBatchOrdersResponse> {
        if request.ids.is_empty() && request.cids.is_empty() {
            return Err(ApiError::validation("either ids or cids is required").into());
        }
        self.client
            .post(
                "/order/cancel_batch_orders",
                Some(request),
                CANCEL_BATCH_WEIGHT,
            )
            .await
    }

    /// Cancels every order, optionally scoped to one symbol.
    ///
    /// `POST /order/cancelAllOrders`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn cancel_all_orders(
        &self,
        request: &CancelAllOrdersRequest,
    ) -> Result<Vec<CancelAllResult>> {
        self.client
            .post("/order/cancelAllOrders", Some(request), CANCEL_ALL_WEIGHT)
            .await
    }

    /// Fetches a single order.
    ///
    /// `GET /order/detail`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn order(&self, order_id: &str) -> Result<Order> {
        if order_id.is_empty() {
            return Err(ApiError::validation("orderId cannot be empty").into());
        }
        let path = format!("/order/detail?orderId={order_id}");
        self.client.get(&path, ORDER_DETAIL_WEIGHT).await
    }

    /// Lists open orders.
    ///
    /// `GET /order/current`
    ///
    /// Errors propagate as-is; an empty result is only ever a genuine empty
    /// order book, never a masked failure.
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn open_orders(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let path = format!("/order/current{}", query.to_query_string());
        self.client.get(&path, OPEN_ORDERS_WEIGHT).await
    }

    /// Lists completed orders.
    ///
    /// `GET /order/history`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn order_history(&self, query: &OrderQuery) -> Result<Vec<Order>> {
        let path = format!("/order/history{}", query.to_query_string());
        self.client.get(&path, ORDER_HISTORY_WEIGHT).await
    }

    /// Lists fills.
    ///
    /// `GET /order/fills`
    ///
    /// # Errors
    ///
    /// Returns the categorized error on failure.
    pub async fn fills(&self, query: &OrderQuery) -> Result<FillsResponse> {
        let path = format!("/order/fills{}", query.to_query_string());
        self.client.get(&path, FILLS_WEIGHT).await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn place_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            symbol: "cmt_btcusdt".to_string(),
            client_oid: "oid-1".to_string(),
            size: dec!(0.5),
            intent: OrderIntent::OpenLong,
            order_type: ExecutionType::Normal,
            match_price: PriceMode::Limit,
            price: dec!(64000),
            margin_mode: None,
        }
    }

    #[test]
    fn test_place_order_serializes_wire_shape() {
        let json = serde_json::to_value(place_request()).unwrap();
        assert_eq!(json["symbol"], "cmt_btcusdt");
        assert_eq!(json["client_oid"], "oid-1");
        assert_eq!(json["type"], "1");
        assert_eq!(json["order_type"], "0");
        assert_eq!(json["match_price"], "0");
        assert_eq!(json["size"], "0.5");
        assert_eq!(json["price"], "64000");
        assert!(json.get("marginMode").is_none());
    }

    #[test]
    fn test_order_intent_variants() {
        assert_eq!(
            serde_json::to_value(OrderIntent::CloseShort).unwrap(),
            serde_json::json!("4")
        );
        assert_eq!(
            serde_json::to_value(ExecutionType::ImmediateOrCancel).unwrap(),
            serde_json::json!("3")
        );
        assert_eq!(
            serde_json::to_value(PriceMode::Market).unwrap(),
            serde_json::json!("1")
        );
    }

    #[test]
    fn test_cancel_request_skips_absent_ids() {
        let request = CancelOrderRequest {
            order_id: Some("42".to_string()),
            client_oid: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["orderId"], "42");
        assert!(json.get("clientOid").is_none());
    }

    #[test]
    fn test_order_query_string() {
        let query = OrderQuery {
            symbol: Some("cmt_btcusdt".to_string()),
            order_id: None,
            start_time: Some(1_700_000_000_000),
            end_time: None,
            limit: Some(50),
        };
        assert_eq!(
            query.to_query_string(),
            "?symbol=cmt_btcusdt&startTime=1700000000000&limit=50"
        );
        assert_eq!(OrderQuery::default().to_query_string(), "");
    }

    #[test]
    fn test_order_deserializes_from_wire_shape() {
        let body = r#"{
            "symbol": "cmt_btcusdt",
            "size": "1",
            "client_oid": "oid-9",
            "order_id": "123456",
            "price": "64000",
            "price_avg": "63999.5",
            "filled_qty": "0.4",
            "fee": "0.02",
            "status": "1",
            "type": "1",
            "order_type": "0",
            "createTime": "1700000000000"
        }"#;
        let order: Order = serde_json::from_str(body).unwrap();
        assert_eq!(order.order_id, "123456");
        assert_eq!(order.filled_qty, dec!(0.4));
        assert_eq!(order.intent, "1");
    }

    #[test]
    fn test_fills_response_deserializes() {
        let body = r#"{
            "list": [{
                "tradeId": 1,
                "orderId": 2,
                "symbol": "cmt_btcusdt",
                "positionSide": "LONG",
                "orderSide": "BUY",
                "fillSize": "0.1",
                "fillValue": "6400",
                "fillFee": "0.01",
                "realizePnl": "3.5",
                "createdTime": 1700000000000
            }],
            "nextFlag": false,
            "totals": 1
        }"#;
        let fills: FillsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(fills.list.len(), 1);
        assert_eq!(fills.list[0].realized_pnl, dec!(3.5));
        assert!(!fills.next_flag);
    }

    #[tokio::test]
    async fn test_batch_size_cap_enforced_locally() {
        let client = Arc::new(
            RestClient::new(sirocco_core::config::Config::default(), None).unwrap(),
        );
        let trade = TradeService::new(client);

        let request = PlaceBatchOrdersRequest {
            symbol: "cmt_btcusdt".to_string(),
            margin_mode: None,
            orders: (0..21)
                .map(|i| BatchOrderRequest {
                    client_oid: format!("oid-{i}"),
                    size: dec!(1),
                    intent: OrderIntent::OpenLong,
                    order_type: ExecutionType::Normal,
                    match_price: PriceMode::Limit,
                    price: dec!(100),
                })
                .collect(),
        };

        let err = trade.place_batch_orders(&request).await.unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.kind, sirocco_core::error::ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_cancel_requires_an_identifier() {
        let client = Arc::new(
            RestClient::new(sirocco_core::config::Config::default(), None).unwrap(),
        );
        let trade = TradeService::new(client);

        let err = trade
            .cancel_order(&CancelOrderRequest::default())
            .await
            .unwrap_err();
        let api = err.as_api().unwrap();
        assert_eq!(api.kind, sirocco_core::error::ErrorKind::Validation);
    }
}
