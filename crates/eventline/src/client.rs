//! The bridge client: connection supervision, receive loop, dispatch.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use eventline_protocol::{Event, Pong, codec};
use eventline_session::{ClientSession, ServerVersion};
use eventline_transport::{Connection, Connector, WsConnection, WsConnector};

use crate::dispatch::{HandlerId, HandlerRegistry};
use crate::reconnect::reconnect_delay;
use crate::liveness::LivenessMonitor;
use crate::state::{ConnectionState, StateMachine};
use crate::{ClientError, ConnectionOptions};

/// Client for the Eventline event bridge.
///
/// Owns one duplex connection at a time and keeps it alive: failed
/// handshakes and lost connections are retried with exponential backoff,
/// heartbeats are answered and monitored, and decoded events are fanned
/// out to subscribers registered through [`BridgeClient::on`] /
/// [`BridgeClient::on_any`].
///
/// All methods take `&self`; the client is internally synchronized and
/// can be shared behind an `Arc` if multiple tasks need it.
///
/// # Example
///
/// ```ignore
/// use eventline::{BridgeClient, ConnectionOptions, Event};
///
/// let client = BridgeClient::new(
///     ConnectionOptions::builder()
///         .url("ws://localhost:9696")
///         .build(),
/// );
/// client.on("message", |event: &Event| {
///     if let Event::Message(msg) = event {
///         println!("{}: {}", msg.username, msg.message);
///     }
/// });
/// client.connect().await?;
/// ```
pub struct BridgeClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    options: ConnectionOptions,
    machine: StateMachine,
    registry: HandlerRegistry,
    session: Arc<Mutex<Option<ClientSession>>>,
    /// Consecutive automatic reconnect attempts in the current outage.
    attempts: AtomicU32,
    /// Sender into the live connection's write half, present only while
    /// a connection epoch is running.
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    supervisor: Mutex<Option<SupervisorHandle>>,
}

struct SupervisorHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Why a connection epoch ended.
enum LoopExit {
    /// Explicit disconnect; the caller drives the remaining transitions.
    Shutdown,
    /// The bridge closed the connection, or liveness expired. Eligible
    /// for automatic reconnect.
    Closed,
    /// A transport-level receive failure. Settles at Disconnected.
    Failed,
}

impl BridgeClient {
    /// Creates a client with the given options. Nothing is dialed until
    /// [`BridgeClient::connect`].
    #[must_use]
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                options,
                machine: StateMachine::new(),
                registry: HandlerRegistry::default(),
                session: Arc::new(Mutex::new(None)),
                attempts: AtomicU32::new(0),
                outbound: Mutex::new(None),
                supervisor: Mutex::new(None),
            }),
        }
    }

    /// Connects to the bridge, awaiting the transport handshake.
    ///
    /// On a handshake failure with reconnection enabled and attempts
    /// remaining, the client moves to `Reconnecting`, retries in the
    /// background and this returns `Ok(())`; the failure is only
    /// surfaced when it cannot be retried.
    ///
    /// Calling this while already connected (or mid-handshake) is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// [`ClientError::Config`] for an unusable URL or token (never
    /// retried), [`ClientError::Transport`] for a handshake failure with
    /// reconnection disabled or exhausted.
    pub async fn connect(&self) -> Result<(), ClientError> {
        match self.state() {
            ConnectionState::Connected | ConnectionState::Connecting => return Ok(()),
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {}
        }

        // A pending reconnect timer belongs to the previous epoch; an
        // explicit connect takes over from it.
        self.teardown_supervisor().await;

        self.inner.machine.transition(ConnectionState::Connecting);

        let connector = match WsConnector::new(
            &self.inner.options.url,
            self.inner.options.token.as_deref(),
            self.inner.options.connect_timeout(),
        ) {
            Ok(connector) => connector,
            Err(e) => {
                self.inner.machine.transition(ConnectionState::Disconnected);
                return Err(ClientError::Config(e));
            }
        };

        match connector.connect().await {
            Ok(conn) => {
                self.inner.machine.transition(ConnectionState::Connected);
                self.inner.attempts.store(0, Ordering::SeqCst);
                self.spawn_supervisor(connector, Some(conn));
                Ok(())
            }
            Err(e) => {
                if self.inner.arm_reconnect() {
                    tracing::warn!(error = %e, "connection failed, scheduling retry");
                    self.inner.machine.transition(ConnectionState::Reconnecting);
                    self.spawn_supervisor(connector, None);
                    Ok(())
                } else {
                    self.inner.machine.transition(ConnectionState::Disconnected);
                    Err(ClientError::Transport(e))
                }
            }
        }
    }

    /// Disconnects from the bridge.
    ///
    /// Cancels and joins the receive loop and any pending reconnect or
    /// liveness timer before declaring `Disconnected`; once this
    /// returns, no further automatic reconnect or event delivery for the
    /// prior connection can occur. The reconnect-attempt counter resets
    /// to zero.
    pub async fn disconnect(&self) {
        self.teardown_supervisor().await;

        self.inner.attempts.store(0, Ordering::SeqCst);
        self.inner.session.lock().take();
        self.inner.outbound.lock().take();
        self.inner.machine.transition(ConnectionState::Disconnected);
    }

    /// Sends an event to the bridge.
    ///
    /// # Errors
    ///
    /// [`ClientError::Protocol`] if the event fails to serialize,
    /// [`ClientError::NotConnected`] without a live connection.
    pub async fn send(&self, event: &Event) -> Result<(), ClientError> {
        let payload = codec::encode(event)?;
        let sender = self
            .inner
            .outbound
            .lock()
            .clone()
            .ok_or(ClientError::NotConnected)?;
        sender
            .send(payload)
            .await
            .map_err(|_| ClientError::NotConnected)
    }

    /// The current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.machine.current()
    }

    /// Number of automatic reconnect attempts in the current outage;
    /// zero while the connection is healthy.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// The client id the bridge assigned, while connected.
    #[must_use]
    pub fn client_id(&self) -> Option<String> {
        self.inner
            .session
            .lock()
            .as_ref()
            .map(|s| s.client_id().to_owned())
    }

    /// The negotiated server version, while connected and well-formed.
    #[must_use]
    pub fn server_version(&self) -> Option<ServerVersion> {
        self.inner.session.lock().as_ref().and_then(ClientSession::version)
    }

    /// Registers a handler for one event type (wire discriminator).
    pub fn on(
        &self,
        event_type: &str,
        handler: impl Fn(&Event) + Send + Sync + 'static,
    ) -> HandlerId {
        self.inner.registry.on(event_type, Arc::new(handler))
    }

    /// Removes a type-scoped handler. Returns whether it was registered.
    pub fn off(&self, event_type: &str, id: HandlerId) -> bool {
        self.inner.registry.off(event_type, id)
    }

    /// Registers a wildcard handler, invoked for every decoded event
    /// (heartbeat pings excepted) after the type-scoped handlers.
    pub fn on_any(&self, handler: impl Fn(&Event) + Send + Sync + 'static) -> HandlerId {
        self.inner.registry.on_any(Arc::new(handler))
    }

    /// Removes a wildcard handler. Returns whether it was registered.
    pub fn off_any(&self, id: HandlerId) -> bool {
        self.inner.registry.off_any(id)
    }

    /// Registers a connection-state observer. It is invoked immediately
    /// with the current state, then on every subsequent change.
    pub fn on_state_change(
        &self,
        handler: impl Fn(ConnectionState) + Send + Sync + 'static,
    ) -> HandlerId {
        self.inner.machine.subscribe(Arc::new(handler))
    }

    /// Removes a connection-state observer. Returns whether it was
    /// registered.
    pub fn off_state_change(&self, id: HandlerId) -> bool {
        self.inner.machine.unsubscribe(id)
    }

    fn spawn_supervisor(&self, connector: WsConnector, conn: Option<WsConnection>) {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_supervisor(
            Arc::clone(&self.inner),
            connector,
            conn,
            cancel.clone(),
        ));
        *self.inner.supervisor.lock() = Some(SupervisorHandle { cancel, task });
    }

    /// Cancels the supervisor (receive loop plus any pending timer) and
    /// waits for it to finish.
    async fn teardown_supervisor(&self) {
        let handle = self.inner.supervisor.lock().take();
        if let Some(SupervisorHandle { cancel, task }) = handle {
            cancel.cancel();
            let _ = task.await;
        }
    }
}

impl Drop for BridgeClient {
    fn drop(&mut self) {
        // Without this, a dropped client would keep reconnecting from
        // its background task forever. Joining is not possible here;
        // cancellation alone lets the task wind down promptly.
        if let Some(handle) = self.inner.supervisor.lock().take() {
            handle.cancel.cancel();
        }
    }
}

impl ClientInner {
    /// Claims the next automatic reconnect attempt if policy allows,
    /// bumping the counter. Returns false when reconnection is disabled
    /// or attempts are exhausted.
    fn arm_reconnect(&self) -> bool {
        if !self.options.reconnect {
            return false;
        }
        let next = self.attempts.load(Ordering::SeqCst) + 1;
        if next > self.options.max_reconnect_attempts {
            return false;
        }
        self.attempts.store(next, Ordering::SeqCst);
        true
    }
}

/// Drives one connect cycle: runs the live connection, and between
/// connections sleeps out the backoff delay and redials. At most one
/// supervisor exists per client, so there is never more than one armed
/// reconnect timer or active receive loop.
async fn run_supervisor(
    inner: Arc<ClientInner>,
    connector: WsConnector,
    mut live: Option<WsConnection>,
    cancel: CancellationToken,
) {
    loop {
        let conn = match live.take() {
            Some(conn) => conn,
            None => {
                let attempt = inner.attempts.load(Ordering::SeqCst);
                let delay = reconnect_delay(inner.options.reconnect_interval(), attempt);
                tracing::info!(
                    attempt,
                    max_attempts = inner.options.max_reconnect_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "reconnecting after delay"
                );

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }

                inner.machine.transition(ConnectionState::Connecting);

                let dialed = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = connector.connect() => result,
                };

                match dialed {
                    Ok(conn) => {
                        inner.machine.transition(ConnectionState::Connected);
                        inner.attempts.store(0, Ordering::SeqCst);
                        conn
                    }
                    Err(e) => {
                        if inner.arm_reconnect() {
                            tracing::warn!(error = %e, "reconnect attempt failed");
                            inner.machine.transition(ConnectionState::Reconnecting);
                            continue;
                        }
                        tracing::error!(error = %e, "reconnect attempts exhausted");
                        inner.machine.transition(ConnectionState::Disconnected);
                        return;
                    }
                }
            }
        };

        match run_connection(&inner, &conn, &cancel).await {
            LoopExit::Shutdown => return,
            LoopExit::Closed => {
                if inner.arm_reconnect() {
                    inner.machine.transition(ConnectionState::Reconnecting);
                    continue;
                }
                inner.machine.transition(ConnectionState::Disconnected);
                return;
            }
            LoopExit::Failed => {
                inner.machine.transition(ConnectionState::Disconnected);
                return;
            }
        }
    }
}

/// Runs one connection epoch: the receive loop, outbound writes, and
/// liveness monitoring. Returns why the epoch ended; the caller decides
/// what to do next.
async fn run_connection(
    inner: &Arc<ClientInner>,
    conn: &WsConnection,
    cancel: &CancellationToken,
) -> LoopExit {
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(64);
    *inner.outbound.lock() = Some(outbound_tx);

    let (expired_tx, mut expired_rx) = mpsc::channel::<()>(1);
    let mut liveness: Option<LivenessMonitor> = None;

    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = conn.close().await;
                break LoopExit::Shutdown;
            }
            Some(()) = expired_rx.recv() => {
                let _ = conn.close().await;
                break LoopExit::Closed;
            }
            Some(payload) = outbound_rx.recv() => {
                if let Err(e) = conn.send(&payload).await {
                    tracing::warn!(error = %e, "outbound send failed");
                }
            }
            received = conn.recv() => match received {
                Ok(Some(text)) => {
                    handle_message(inner, conn, &text, &mut liveness, &expired_tx).await;
                }
                Ok(None) => {
                    tracing::info!("bridge closed the connection");
                    break LoopExit::Closed;
                }
                Err(e) => {
                    tracing::error!(error = %e, "receive loop failed");
                    break LoopExit::Failed;
                }
            }
        }
    };

    if let Some(monitor) = liveness.take() {
        monitor.shutdown().await;
    }
    inner.outbound.lock().take();
    inner.session.lock().take();

    exit
}

/// Decodes and processes one inbound payload.
///
/// Heartbeat pings are consumed here (recorded, answered with a pong)
/// and never reach subscribers; everything else dispatches. A payload
/// that fails to decode is logged and dropped — the connection stays up.
async fn handle_message(
    inner: &Arc<ClientInner>,
    conn: &WsConnection,
    text: &str,
    liveness: &mut Option<LivenessMonitor>,
    expired_tx: &mpsc::Sender<()>,
) {
    match codec::decode(text) {
        Ok(Some(Event::Ping(ping))) => {
            if let Some(session) = inner.session.lock().as_mut() {
                session.record_heartbeat();
            }
            let pong = Event::Pong(Pong {
                responding_to: ping.timestamp,
                timestamp: Some(epoch_ms()),
            });
            match codec::encode(&pong) {
                Ok(payload) => {
                    if let Err(e) = conn.send(&payload).await {
                        tracing::warn!(error = %e, "failed to send pong");
                    }
                }
                Err(e) => tracing::error!(error = %e, "failed to encode pong"),
            }
        }
        Ok(Some(event)) => {
            if let Event::Established(established) = &event {
                let session = ClientSession::new(&established.client_id, &established.version);
                let monitor_heartbeats = session.supports_heartbeat();

                tracing::info!(
                    client_id = %established.client_id,
                    version = %established.version,
                    endpoint = %masked_url(&inner.options.url),
                    "connected to bridge"
                );

                *inner.session.lock() = Some(session);

                if let Some(previous) = liveness.take() {
                    previous.shutdown().await;
                }
                if monitor_heartbeats {
                    *liveness = Some(LivenessMonitor::start(
                        Arc::clone(&inner.session),
                        inner.options.ping_timeout(),
                        expired_tx.clone(),
                    ));
                }
            }

            inner.registry.dispatch(&event);
        }
        Ok(None) => {
            tracing::debug!("dropping payload without a discriminator");
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to decode payload");
        }
    }
}

/// Milliseconds since the Unix epoch.
fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The configured endpoint with any `token` query value masked, for log
/// output.
fn masked_url(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_owned();
    };
    if !parsed.query_pairs().any(|(key, _)| key == "token") {
        return url.to_owned();
    }

    let mut masked = parsed.clone();
    masked
        .query_pairs_mut()
        .clear()
        .extend_pairs(parsed.query_pairs().map(|(key, value)| {
            let value = if key == "token" { "***".into() } else { value };
            (key.into_owned(), value.into_owned())
        }));
    masked.to_string()
}
