//! Inbound frame classification and dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, warn};

use sirocco_core::error::{ApiError, DataError, Error};

use super::message::{StreamFrame, EVENT_ERROR, EVENT_LOGIN, EVENT_PONG, OP_SUBSCRIBE, OP_UNSUBSCRIBE};
use super::subscription::SubscriptionRegistry;

/// Callback invoked with per-frame errors: failed acks, venue error events,
/// and contained handler failures.
pub type ErrorCallback = Arc<dyn Fn(Error) + Send + Sync>;

/// Classifies each inbound frame and dispatches data frames to the
/// registered channel handler.
///
/// Handlers are user code: a panicking or failing handler is contained to
/// its frame, reported through the error callback, and never affects the
/// session or subsequent frames.
pub struct MessageRouter {
    registry: Arc<SubscriptionRegistry>,
    on_error: parking_lot::RwLock<Option<ErrorCallback>>,
}

impl MessageRouter {
    /// Creates a router over the given registry.
    #[must_use]
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            on_error: parking_lot::RwLock::new(None),
        }
    }

    /// Sets the per-frame error callback.
    pub fn set_on_error(&self, callback: ErrorCallback) {
        *self.on_error.write() = Some(callback);
    }

    /// Routes one raw inbound frame.
    pub fn route(&self, raw: &[u8]) {
        let frame = match StreamFrame::parse(raw) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "dropping unparseable stream frame");
                return;
            }
        };

        match frame.event.as_str() {
            EVENT_PONG => {}
            OP_SUBSCRIBE | OP_UNSUBSCRIBE => {
                if !frame.is_success_code() {
                    error!(
                        event = %frame.event,
                        channel = %frame.channel,
                        code = %frame.code,
                        msg = %frame.message,
                        "subscription request rejected"
                    );
                    self.report(
                        ApiError::from_code(frame.code, frame.message, None, None).into(),
                    );
                }
            }
            EVENT_ERROR => {
                error!(code = %frame.code, msg = %frame.message, "stream error event");
                self.report(ApiError::from_code(frame.code, frame.message, None, None).into());
            }
            // Login acks are consumed during the connect handshake; one
            // arriving here is late and carries no routing work.
            EVENT_LOGIN => debug!(code = %frame.code, "late login ack dropped"),
            _ => self.dispatch(&frame.channel, raw),
        }
    }

    fn dispatch(&self, channel: &str, raw: &[u8]) {
        if channel.is_empty() {
            debug!("frame with no event and no channel dropped");
            return;
        }
        let Some(handler) = self.registry.get(channel) else {
            debug!(channel, "frame for unregistered channel dropped");
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| handler(raw))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(channel, error = %err, "channel handler failed");
                self.report(err);
            }
            Err(_) => {
                error!(channel, "channel handler panicked");
                self.report(
                    DataError::Decode {
                        reason: format!("handler for channel {channel} panicked"),
                    }
                    .into(),
                );
            }
        }
    }

    pub(crate) fn report(&self, err: Error) {
        if let Some(callback) = self.on_error.read().clone() {
            callback(err);
        }
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use sirocco_core::error::ErrorKind;

    use super::*;

    struct Fixture {
        registry: Arc<SubscriptionRegistry>,
        router: MessageRouter,
        errors: Arc<Mutex<Vec<Error>>>,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(SubscriptionRegistry::new());
        let router = MessageRouter::new(Arc::clone(&registry));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        router.set_on_error(Arc::new(move |err: Error| sink.lock().unwrap().push(err)));
        Fixture {
            registry,
            router,
            errors,
        }
    }

    #[test]
    fn test_data_frame_dispatched_with_raw_bytes() {
        let f = fixture();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        f.registry.add(
            "ticker.cmt_btcusdt",
            Arc::new(move |raw: &[u8]| {
                sink.lock().unwrap().push(raw.to_vec());
                Ok(())
            }),
        );

        let raw = br#"{"channel":"ticker.cmt_btcusdt","data":[{"lastPrice":"1"}]}"#;
        f.router.route(raw);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], raw.to_vec());
        assert!(f.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_pong_silently_dropped() {
        let f = fixture();
        f.router.route(br#"{"event":"pong"}"#);
        assert!(f.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_successful_ack_silent() {
        let f = fixture();
        f.router
            .route(br#"{"event":"subscribe","channel":"account","code":"0"}"#);
        f.router.route(br#"{"event":"unsubscribe","channel":"account"}"#);
        assert!(f.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_ack_reported() {
        let f = fixture();
        f.router.route(
            br#"{"event":"subscribe","channel":"orders","code":"40018","msg":"denied"}"#,
        );

        let errors = f.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        let api = errors[0].as_api().unwrap();
        assert_eq!(api.code, "40018");
        assert_eq!(api.kind, ErrorKind::System);
    }

    #[test]
    fn test_error_event_reported() {
        let f = fixture();
        f.router
            .route(br#"{"event":"error","code":"40007","msg":"bad login"}"#);

        let errors = f.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].as_api().unwrap().kind, ErrorKind::Auth);
    }

    #[test]
    fn test_unregistered_channel_dropped() {
        let f = fixture();
        f.router.route(br#"{"channel":"ticker.unknown","data":[]}"#);
        assert!(f.errors.lock().unwrap().is_empty());
    }

    #[test]
    fn test_handler_error_contained() {
        let f = fixture();
        f.registry.add(
            "ticker.x",
            Arc::new(|_: &[u8]| {
                Err(DataError::Decode {
                    reason: "bad payload".to_string(),
                }
                .into())
            }),
        );
        let delivered = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&delivered);
        f.registry.add(
            "trades.x",
            Arc::new(move |_: &[u8]| {
                sink.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        f.router.route(br#"{"channel":"ticker.x","data":[]}"#);
        f.router.route(br#"{"channel":"trades.x","data":[]}"#);

        // The failing handler was reported, the healthy one still ran.
        assert_eq!(f.errors.lock().unwrap().len(), 1);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_panic_contained() {
        let f = fixture();
        f.registry
            .add("ticker.x", Arc::new(|_: &[u8]| panic!("handler bug")));
        let delivered = Arc::new(AtomicU32::new(0));
        let sink = Arc::clone(&delivered);
        f.registry.add(
            "trades.x",
            Arc::new(move |_: &[u8]| {
                sink.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        f.router.route(br#"{"channel":"ticker.x","data":[]}"#);
        f.router.route(br#"{"channel":"ticker.x","data":[]}"#);
        f.router.route(br#"{"channel":"trades.x","data":[]}"#);

        assert_eq!(f.errors.lock().unwrap().len(), 2);
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unparseable_frame_dropped() {
        let f = fixture();
        f.router.route(b"garbage");
        assert!(f.errors.lock().unwrap().is_empty());
    }
}
