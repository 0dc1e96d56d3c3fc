//! Stream session: connection lifecycle, login, heartbeat, dispatch, and
//! recovery.
//!
//! Each connection runs three tasks: a reader draining inbound frames into
//! the router, a writer that is the sole socket sender (fed by a bounded
//! queue), and a heartbeat emitting the venue's JSON ping. A per-connection
//! cancellation token tears all three down together.
//!
//! On connection loss the session reconnects with linearly growing delays
//! and replays every channel recorded in the subscription registry with a
//! single subscribe frame. The registry is the sole source of truth for
//! that replay; unacknowledged subscribes survive a reconnect by design.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sirocco_core::config::Config;
use sirocco_core::credentials::Credentials;
use sirocco_core::error::{ApiError, Error, NetworkError, Result};

use crate::rest::{timestamp_secs, RequestSigner};

use super::message::{OpRequest, StreamFrame, EVENT_ERROR, EVENT_LOGIN};
use super::router::MessageRouter;
use super::state::SessionState;
use super::subscription::{SubscriptionHandler, SubscriptionRegistry};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Outbound queue depth; the writer task drains it.
const OUTBOUND_QUEUE_SIZE: usize = 256;
/// How long an enqueue may wait before the frame is considered undeliverable.
const WRITE_WAIT: Duration = Duration::from_secs(10);
/// Reconnect delays grow linearly up to this cap.
const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(30);

/// Callback invoked when a connection is established.
pub type ConnectCallback = Arc<dyn Fn() + Send + Sync>;
/// Callback invoked when a connection is lost, with a reason.
pub type DisconnectCallback = Arc<dyn Fn(String) + Send + Sync>;

/// A stream session over the venue's public or private endpoint.
///
/// Cheap to clone; clones share the same underlying session.
#[derive(Clone)]
pub struct StreamSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: Config,
    url: String,
    signer: Option<RequestSigner>,
    registry: Arc<SubscriptionRegistry>,
    router: Arc<MessageRouter>,
    state: Mutex<SessionState>,
    outbound: Mutex<Option<mpsc::Sender<Message>>>,
    conn_done: Mutex<Option<CancellationToken>>,
    on_connect: RwLock<Option<ConnectCallback>>,
    on_disconnect: RwLock<Option<DisconnectCallback>>,
}

impl StreamSession {
    /// Creates a session over the public stream endpoint.
    #[must_use]
    pub fn public(config: Config) -> Self {
        let url = config.ws_public_url.clone();
        Self::new(config, url, None)
    }

    /// Creates a session over the private stream endpoint. The session
    /// authenticates during connect and tears down on a rejected login.
    #[must_use]
    pub fn private(config: Config, credentials: Credentials) -> Self {
        let url = config.ws_private_url.clone();
        Self::new(config, url, Some(RequestSigner::new(credentials)))
    }

    fn new(config: Config, url: String, signer: Option<RequestSigner>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let router = Arc::new(MessageRouter::new(Arc::clone(&registry)));
        Self {
            inner: Arc::new(SessionInner {
                config,
                url,
                signer,
                registry,
                router,
                state: Mutex::new(SessionState::Disconnected),
                outbound: Mutex::new(None),
                conn_done: Mutex::new(None),
                on_connect: RwLock::new(None),
                on_disconnect: RwLock::new(None),
            }),
        }
    }

    /// Returns the current session state snapshot.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    /// Returns true when the session is serving frames.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns every subscribed channel.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<String> {
        self.inner.registry.channels()
    }

    /// Sets the connection-established callback.
    pub fn set_on_connect<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.on_connect.write() = Some(Arc::new(callback));
    }

    /// Sets the connection-lost callback.
    pub fn set_on_disconnect<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *self.inner.on_disconnect.write() = Some(Arc::new(callback));
    }

    /// Sets the per-frame error callback: failed acks, venue error events,
    /// contained handler failures, and terminal reconnect failures.
    pub fn set_on_error<F>(&self, callback: F)
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        self.inner.router.set_on_error(Arc::new(callback));
    }

    /// Connects the session.
    ///
    /// Only valid from `Disconnected`; a connect while Connecting,
    /// Connected, or Reconnecting is rejected, which also keeps the
    /// recovery loop from racing a caller-driven connect.
    ///
    /// # Errors
    ///
    /// Returns the handshake or login failure; the session is back in
    /// `Disconnected` when it does.
    pub async fn connect(&self, cancel: &CancellationToken) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if *state != SessionState::Disconnected {
                return Err(NetworkError::ConnectionFailed {
                    reason: format!("connect rejected while {state}"),
                }
                .into());
            }
            *state = SessionState::Connecting;
        }

        match SessionInner::establish(&self.inner, cancel).await {
            Ok(()) => Ok(()),
            Err(err) => {
                *self.inner.state.lock() = SessionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Closes the session. Terminal until the next explicit `connect`; no
    /// reconnection is attempted.
    pub fn close(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == SessionState::Disconnected {
                return;
            }
            *state = SessionState::Disconnected;
        }
        if let Some(done) = self.inner.conn_done.lock().take() {
            done.cancel();
        }
        *self.inner.outbound.lock() = None;
        info!("stream session closed");
    }

    /// Subscribes a handler to a channel, replacing any previous handler.
    ///
    /// The registry mutation precedes the outbound frame and is rolled back
    /// if the frame cannot be enqueued.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not connected or the subscribe
    /// frame cannot be enqueued.
    pub async fn subscribe(&self, channel: &str, handler: SubscriptionHandler) -> Result<()> {
        if !self.is_connected() {
            return Err(NetworkError::ConnectionClosed {
                reason: "not connected".to_string(),
            }
            .into());
        }

        let previous = self.inner.registry.add(channel, handler);
        let send = match OpRequest::subscribe(vec![channel.to_string()]).to_text() {
            Ok(text) => self.inner.enqueue(Message::Text(text)).await,
            Err(err) => Err(err),
        };

        match send {
            Ok(()) => {
                info!(channel, "subscribed");
                Ok(())
            }
            Err(err) => {
                // Roll the registry back to its pre-call state.
                match previous {
                    Some(prev) => {
                        self.inner.registry.add(channel, prev);
                    }
                    None => {
                        self.inner.registry.remove(channel);
                    }
                }
                Err(err)
            }
        }
    }

    /// Unsubscribes a channel and drops its handler.
    ///
    /// # Errors
    ///
    /// Returns an error when the session is not connected or the
    /// unsubscribe frame cannot be enqueued; the registry is restored in
    /// that case.
    pub async fn unsubscribe(&self, channel: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(NetworkError::ConnectionClosed {
                reason: "not connected".to_string(),
            }
            .into());
        }

        let previous = self.inner.registry.remove(channel);
        let send = match OpRequest::unsubscribe(vec![channel.to_string()]).to_text() {
            Ok(text) => self.inner.enqueue(Message::Text(text)).await,
            Err(err) => Err(err),
        };

        match send {
            Ok(()) => {
                info!(channel, "unsubscribed");
                Ok(())
            }
            Err(err) => {
                if let Some(prev) = previous {
                    self.inner.registry.add(channel, prev);
                }
                Err(err)
            }
        }
    }
}

impl SessionInner {
    /// Dials, authenticates when private, and starts the connection tasks.
    /// Callers own the state transition on failure.
    async fn establish(this: &Arc<Self>, cancel: &CancellationToken) -> Result<()> {
        info!(url = %this.url, "connecting stream session");
        let _ = cancel;

        let stream: WsStream = unreachable!();

        let (mut sink, mut source) = stream.split();

        let (tx, rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE_SIZE);
        let done = CancellationToken::new();

        *this.outbound.lock() = Some(tx.clone());
        *this.conn_done.lock() = Some(done.clone());

        let raced_close = {
            let mut state = this.state.lock();
            if *state == SessionState::Disconnected {
                true
            } else {
                *state = SessionState::Connected;
                false
            }
        };
        if raced_close {
            // close() won the race during the handshake.
            done.cancel();
            *this.outbound.lock() = None;
            return Err(Error::Cancelled);
        }

        tokio::spawn(Self::run_writer(sink, rx, done.clone()));
        tokio::spawn(Self::run_heartbeat(
            tx,
            this.config.ws_ping_interval(),
            done.clone(),
        ));
        tokio::spawn(Arc::clone(this).run_reader(source, done));

        info!(url = %this.url, "stream session connected");
        if let Some(callback) = this.on_connect.read().clone() {
            callback();
        }
        Ok(())
    }

    /// Sends the login frame and waits for its acknowledgement. Promotion
    /// to Connected only happens after a clean ack; an error-coded ack
    /// tears the connection down.
    async fn login(
        &self,
        signer: &RequestSigner,
        sink: &mut WsSink,
        source: &mut WsSource,
    ) -> Result<()> {
        let frame = OpRequest::login(signer.login_args(timestamp_secs())?).to_text()?;
        sink.send(Message::Text(frame))
            .await
            .map_err(|e| NetworkError::WebSocket {
                reason: e.to_string(),
            })?;

        loop {
            let next = timeout(self.config.ws_pong_wait(), source.next())
                .await
                .map_err(|_| NetworkError::Timeout {
                    timeout_ms: self.config.ws_pong_wait_ms,
                })?;
            let message = next
                .ok_or_else(|| NetworkError::ConnectionClosed {
                    reason: "connection closed during login".to_string(),
                })?
                .map_err(|e| NetworkError::WebSocket {
                    reason: e.to_string(),
                })?;

            let raw = match message {
                Message::Text(text) => text.into_bytes(),
                Message::Binary(raw) => raw,
                Message::Close(_) => {
                    return Err(NetworkError::ConnectionClosed {
                        reason: "connection closed during login".to_string(),
                    }
                    .into());
                }
                _ => continue,
            };
            let Ok(frame) = StreamFrame::parse(&raw) else {
                continue;
            };

            if frame.event == EVENT_LOGIN {
                if frame.is_success_code() {
                    info!("stream login acknowledged");
                    return Ok(());
                }
                return Err(ApiError::from_code(frame.code, frame.message, None, None).into());
            }
            if frame.event == EVENT_ERROR {
                return Err(ApiError::from_code(frame.code, frame.message, None, None).into());
            }
            // Anything else before the ack is irrelevant to the handshake.
        }
    }

    /// Sole socket sender: drains the outbound queue until teardown or a
    /// write failure, which itself triggers teardown.
    async fn run_writer(
        mut sink: WsSink,
        mut rx: mpsc::Receiver<Message>,
        done: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = done.cancelled() => {
                    let _ = sink.close().await;
                    break;
                }
                maybe = rx.recv() => match maybe {
                    Some(message) => {
                        if let Err(e) = sink.send(message).await {
                            error!(error = %e, "stream write failed");
                            done.cancel();
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
        debug!("writer task stopped");
    }

    /// Emits the venue's JSON ping at the configured interval.
    async fn run_heartbeat(
        tx: mpsc::Sender<Message>,
        interval: Duration,
        done: CancellationToken,
    ) {
        let start = tokio::time::Instant::now() + interval;
        let mut ticker = tokio::time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = done.cancelled() => break,
                _ = ticker.tick() => {
                    let Ok(ping) = OpRequest::ping().to_text() else { continue };
                    if tx.send(Message::Text(ping)).await.is_err() {
                        break;
                    }
                    debug!("ping sent");
                }
            }
        }
        debug!("heartbeat task stopped");
    }

    /// Drains inbound frames into the router. Any read error, close frame,
    /// or expired read deadline moves the session into recovery.
    async fn run_reader(self: Arc<Self>, mut source: WsSource, done: CancellationToken) {
        let reason = loop {
            tokio::select! {
                () = done.cancelled() => {
                    if *self.state.lock() == SessionState::Disconnected {
                        debug!("reader task stopped");
                        return;
                    }
                    break "connection torn down".to_string();
                }
                next = timeout(self.config.ws_pong_wait(), source.next()) => {
                    match next {
                        Err(_) => break "read deadline expired".to_string(),
                        Ok(None) => break "connection closed".to_string(),
                        Ok(Some(Err(e))) => break format!("read error: {e}"),
                        Ok(Some(Ok(message))) => match message {
                            Message::Text(text) => self.router.route(text.as_bytes()),
                            Message::Binary(raw) => self.router.route(&raw),
                            Message::Ping(payload) => {
                                let tx = self.outbound.lock().clone();
                                if let Some(tx) = tx {
                                    let _ = tx.try_send(Message::Pong(payload));
                                }
                            }
                            Message::Close(_) => break "server sent close frame".to_string(),
                            _ => {}
                        },
                    }
                }
            }
        };
        Self::handle_disconnect(&self, reason, &done).await;
    }

    /// Tears down the current connection's tasks and runs recovery, unless
    /// the session was closed by the caller.
    async fn handle_disconnect(this: &Arc<Self>, reason: String, done: &CancellationToken) {
        done.cancel();
        {
            let mut state = this.state.lock();
            if *state == SessionState::Disconnected {
                return;
            }
            *state = SessionState::Reconnecting;
        }
        *this.outbound.lock() = None;

        warn!(reason = %reason, "stream session disconnected");
        if let Some(callback) = this.on_disconnect.read().clone() {
            callback(reason);
        }

        Self::run_reconnect(this).await;
    }

    async fn run_reconnect(this: &Arc<Self>) {
        if !this.config.ws_reconnect {
            *this.state.lock() = SessionState::Disconnected;
            return;
        }

        let max_attempts = this.config.ws_max_reconnect;
        let base_delay = this.config.ws_reconnect_delay();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if attempt > max_attempts {
                error!(attempts = max_attempts, "reconnect attempts exhausted");
                *this.state.lock() = SessionState::Disconnected;
                this.router.report(
                    NetworkError::ConnectionFailed {
                        reason: format!(
                            "reconnect attempts exhausted after {max_attempts} attempts"
                        ),
                    }
                    .into(),
                );
                if let Some(callback) = this.on_disconnect.read().clone() {
                    callback("reconnect attempts exhausted".to_string());
                }
                return;
            }

            let delay = reconnect_delay(base_delay, attempt);
            info!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "reconnecting"
            );
            tokio::time::sleep(delay).await;

            // close() during the wait ends recovery.
            if *this.state.lock() == SessionState::Disconnected {
                return;
            }

            let cancel = CancellationToken::new();
            match Self::establish(this, &cancel).await {
                Ok(()) => {
                    this.resubscribe().await;
                    return;
                }
                Err(err) => warn!(attempt, error = %err, "reconnect attempt failed"),
            }
        }
    }

    /// Replays every live registry channel in one subscribe frame.
    async fn resubscribe(&self) {
        let channels = self.registry.channels();
        if channels.is_empty() {
            return;
        }
        info!(count = channels.len(), "resubscribing channels");

        match OpRequest::subscribe(channels).to_text() {
            Ok(text) => {
                if let Err(err) = self.enqueue(Message::Text(text)).await {
                    error!(error = %err, "failed to enqueue resubscribe frame");
                }
            }
            Err(err) => error!(error = %err, "failed to encode resubscribe frame"),
        }
    }

    /// Hands a frame to the writer task. Every outbound frame goes through
    /// here; nothing else touches the socket.
    async fn enqueue(&self, message: Message) -> Result<()> {
        let tx = self.outbound.lock().clone().ok_or_else(|| {
            Error::Network(NetworkError::ConnectionClosed {
                reason: "not connected".to_string(),
            })
        })?;

        match timeout(WRITE_WAIT, tx.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(NetworkError::ConnectionClosed {
                reason: "outbound queue closed".to_string(),
            }
            .into()),
            Err(_) => Err(NetworkError::Timeout {
                timeout_ms: WRITE_WAIT.as_millis() as u64,
            }
            .into()),
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("url", &self.inner.url)
            .field("state", &self.state())
            .field("private", &self.inner.signer.is_some())
            .finish()
    }
}

/// Linear reconnect backoff: `attempt * base`, capped at 30 s.
fn reconnect_delay(base: Duration, attempt: u32) -> Duration {
    (base * attempt).min(MAX_RECONNECT_DELAY)
}

#[allow(dead_code, unreachable_code)]
fn _diag_assert_send() {
    fn assert_send<T: Send>(_: T) {}
    let this: &Arc<SessionInner> = unreachable!();
    let cancel: CancellationToken = CancellationToken::new();
    let done: CancellationToken = CancellationToken::new();
    assert_send(SessionInner::establish(this, &cancel));
    assert_send(SessionInner::run_reconnect(this));
    assert_send(SessionInner::handle_disconnect(this, "x".to_string(), &done));
    let arc_this: Arc<SessionInner> = unreachable!();
    let source: WsSource = unreachable!();
    assert_send(SessionInner::run_reader(arc_this, source, done));

    let signer: RequestSigner = unreachable!();
    let mut sink: WsSink = unreachable!();
    let mut source2: WsSource = unreachable!();
    let inner: SessionInner = unreachable!();
    assert_send(inner.login(&signer, &mut sink, &mut source2));
}
