//! Streaming access to the venue's public and private channels.

mod channels;
mod client;
mod message;
mod router;
mod state;
mod subscription;

pub use channels::{
    candlestick_channel, depth_channel, ticker_channel, trades_channel, AccountData, AccountItem,
    CandlestickData, CandlestickItem, DepthData, DepthItem, FillData, FillItem, OrderData,
    OrderItem, PositionData, PositionItem, PriceLevel, TickerData, TickerItem, TradeItem,
    TradesData, CHANNEL_ACCOUNT, CHANNEL_FILL, CHANNEL_ORDERS, CHANNEL_POSITIONS,
};
pub use client::{ConnectCallback, DisconnectCallback, StreamSession};
pub use message::{OpRequest, StreamFrame};
pub use router::{ErrorCallback, MessageRouter};
pub use state::SessionState;
pub use subscription::{SubscriptionHandler, SubscriptionRegistry};
