//! Stream wire messages.
//!
//! Outbound control frames are `{"op": ..., "args": [...]}`; inbound frames
//! carry `event`/`channel`/`code`/`msg` plus an opaque payload that channel
//! handlers parse themselves.

use serde::{Deserialize, Serialize};

use sirocco_core::error::{DataError, Result};

/// `subscribe` op.
pub const OP_SUBSCRIBE: &str = "subscribe";
/// `unsubscribe` op.
pub const OP_UNSUBSCRIBE: &str = "unsubscribe";
/// `ping` op.
pub const OP_PING: &str = "ping";
/// `login` op.
pub const OP_LOGIN: &str = "login";

/// `pong` event.
pub const EVENT_PONG: &str = "pong";
/// `error` event.
pub const EVENT_ERROR: &str = "error";
/// `login` event.
pub const EVENT_LOGIN: &str = "login";

/// An outbound control frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpRequest {
    /// Operation name.
    pub op: String,
    /// Operation arguments; omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl OpRequest {
    /// Builds a subscribe frame for the given channels.
    #[must_use]
    pub fn subscribe(channels: Vec<String>) -> Self {
        Self {
            op: OP_SUBSCRIBE.to_string(),
            args: channels,
        }
    }

    /// Builds an unsubscribe frame for the given channels.
    #[must_use]
    pub fn unsubscribe(channels: Vec<String>) -> Self {
        Self {
            op: OP_UNSUBSCRIBE.to_string(),
            args: channels,
        }
    }

    /// Builds a heartbeat ping frame.
    #[must_use]
    pub fn ping() -> Self {
        Self {
            op: OP_PING.to_string(),
            args: Vec::new(),
        }
    }

    /// Builds a login frame from `[key, passphrase, timestamp, signature]`.
    #[must_use]
    pub fn login(args: [String; 4]) -> Self {
        Self {
            op: OP_LOGIN.to_string(),
            args: args.to_vec(),
        }
    }

    /// Serializes the frame to its wire text.
    ///
    /// # Errors
    ///
    /// Returns `DataError` when serialization fails.
    pub fn to_text(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            DataError::Encode {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// The routing-relevant fields of an inbound frame. The payload stays in the
/// raw frame bytes, which are handed to channel handlers whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StreamFrame {
    /// Event type: `pong`, `subscribe`, `unsubscribe`, `login`, `error`,
    /// or empty for data frames.
    #[serde(default)]
    pub event: String,
    /// Channel name for data frames and acks.
    #[serde(default)]
    pub channel: String,
    /// Error code on acks and error events.
    #[serde(default)]
    pub code: String,
    /// Error message on acks and error events.
    #[serde(default, rename = "msg")]
    pub message: String,
}

impl StreamFrame {
    /// Parses the routing fields from raw frame bytes.
    ///
    /// # Errors
    ///
    /// Returns `DataError` when the frame is not a JSON object.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| {
            DataError::Decode {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Acks carry no code, an empty code, or `"0"` on success.
    #[must_use]
    pub fn is_success_code(&self) -> bool {
        self.code.is_empty() || self.code == "0"
    }

    /// Returns true for data frames: no event, a channel name.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.event.is_empty() && !self.channel.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_frame_wire_shape() {
        let frame = OpRequest::subscribe(vec!["ticker.cmt_btcusdt".to_string()]);
        let text = frame.to_text().unwrap();
        assert_eq!(text, r#"{"op":"subscribe","args":["ticker.cmt_btcusdt"]}"#);
    }

    #[test]
    fn test_ping_frame_omits_args() {
        let text = OpRequest::ping().to_text().unwrap();
        assert_eq!(text, r#"{"op":"ping"}"#);
    }

    #[test]
    fn test_login_frame_arg_order() {
        let frame = OpRequest::login([
            "key".to_string(),
            "phrase".to_string(),
            "1700000000".to_string(),
            "c2ln".to_string(),
        ]);
        let text = frame.to_text().unwrap();
        assert_eq!(
            text,
            r#"{"op":"login","args":["key","phrase","1700000000","c2ln"]}"#
        );
    }

    #[test]
    fn test_parse_pong() {
        let frame = StreamFrame::parse(br#"{"event":"pong"}"#).unwrap();
        assert_eq!(frame.event, EVENT_PONG);
        assert!(!frame.is_data());
    }

    #[test]
    fn test_parse_subscribe_ack() {
        let frame =
            StreamFrame::parse(br#"{"event":"subscribe","channel":"account","code":"0"}"#).unwrap();
        assert_eq!(frame.event, "subscribe");
        assert!(frame.is_success_code());

        let frame = StreamFrame::parse(
            br#"{"event":"subscribe","channel":"account","code":"40018","msg":"denied"}"#,
        )
        .unwrap();
        assert!(!frame.is_success_code());
        assert_eq!(frame.message, "denied");
    }

    #[test]
    fn test_parse_data_frame() {
        let frame = StreamFrame::parse(
            br#"{"channel":"ticker.cmt_btcusdt","data":[{"lastPrice":"100"}]}"#,
        )
        .unwrap();
        assert!(frame.is_data());
        assert_eq!(frame.channel, "ticker.cmt_btcusdt");
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(StreamFrame::parse(b"not json").is_err());
    }
}
