//! REST access to the venue's unary endpoints.

mod account;
mod client;
mod market;
mod rate_limit;
mod signer;
mod trade;
mod transport;

pub use account::{
    AccountInfo, AccountService, AdjustLeverageRequest, AdjustLeverageResponse, AssetInfo,
    Position,
};
pub use client::{RestClient, API_PATH_PREFIX};
pub use market::{
    ContractInfo, Depth, DepthEntry, FundingRate, IndexPrice, Kline, KlinesRequest, MarketService,
    PublicTrade, ServerTime, Ticker,
};
pub use rate_limit::{RateLimiter, TokenBucket, Weight};
pub use signer::{
    timestamp_ms, timestamp_secs, validate_timestamp, RequestSigner, HEADER_ACCESS_KEY,
    HEADER_ACCESS_PASSPHRASE, HEADER_ACCESS_SIGN, HEADER_ACCESS_TIMESTAMP, HEADER_LOCALE,
    MAX_CLOCK_DRIFT_MS, STREAM_LOGIN_PATH,
};
pub use trade::{
    BatchOrderRequest, BatchOrderResult, CancelAllOrdersRequest, CancelAllResult,
    CancelBatchOrdersRequest, CancelBatchOrdersResponse, CancelOrderRequest, CancelOrderResponse,
    ExecutionType, Fill, FillsResponse, Order, OrderIntent, OrderQuery, PlaceBatchOrdersRequest,
    PlaceBatchOrdersResponse, PlaceOrderRequest, PlaceOrderResponse, PriceMode, TradeService,
    MAX_BATCH_ORDERS,
};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
