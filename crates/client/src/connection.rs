// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection manager and the public sync client handle.
//!
//! A single driver task owns the transport, the subscription registry, the
//! heartbeat and reconnect timers, and the state observers. Handles talk to it
//! over an unbounded command channel, so every transition, registry mutation,
//! timer expiry and inbound dispatch happens in one `tokio::select!` loop.
//!
//! ```text
//! disconnected ──connect()──► connecting ──opened──► connected
//!      ▲                        │    ▲                   │
//!      │                   error│    │timer       closed/error/
//!      │                        ▼    │            heartbeat
//!      └──────────────── disconnected ──► reconnecting ◄─┘
//! ```
//!
//! Connection attempts run in their own task and report back tagged with a
//! generation number; an outcome from a superseded attempt is discarded.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pulse_core::{ClientFrame, Params, SubscriptionKey, Update};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::ClientConfig;
use crate::heartbeat::{Action, Beat, Heartbeat};
use crate::registry::{CallbackId, Registry, UpdateCallback};
use crate::router::{Dispatched, Router};
use crate::timer::Timer;
use crate::transport::{Connector, Transport, TransportError, TransportResult, WebSocketConnector};

/// Upper bound on a graceful close before the transport is simply dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// State of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not connected and no reconnect pending.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected to the push service.
    Connected,
    /// Waiting for the reconnect timer after a disconnect.
    Reconnecting,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Error type for sync client operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// The connection attempt failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// `disconnect()` was called before the attempt finished.
    #[error("disconnected before the connection was established")]
    Disconnected,

    /// The driver task is gone.
    #[error("sync client has shut down")]
    Shutdown,
}

/// Result type for sync client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Observer invoked on every connection state change.
pub type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

enum Command {
    Connect(oneshot::Sender<ClientResult<()>>),
    Disconnect(oneshot::Sender<()>),
    Subscribe {
        key: SubscriptionKey,
        topic: String,
        params: Params,
        id: CallbackId,
        callback: UpdateCallback,
    },
    Unsubscribe {
        key: SubscriptionKey,
        id: CallbackId,
    },
    Observe {
        id: u64,
        observer: StateCallback,
    },
    Unobserve {
        id: u64,
    },
    CountSubscriptions(oneshot::Sender<usize>),
}

struct ConnectOutcome<T> {
    generation: u64,
    result: TransportResult<T>,
}

/// Builder for [`SyncClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    router: Router,
}

impl ClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        ClientBuilder {
            config,
            router: Router::default(),
        }
    }

    /// Adds or replaces a route for an update type.
    pub fn route(mut self, kind: &str, topic: &str, correlation: &[&str]) -> Self {
        self.router = self.router.with_route(kind, topic, correlation);
        self
    }

    /// Replaces the whole routing table.
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Builds a client using WebSocket transport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> SyncClient {
        self.build_with_connector(WebSocketConnector)
    }

    /// Builds a client with a custom connector (for testing).
    pub fn build_with_connector<C: Connector>(self, connector: C) -> SyncClient {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let driver = Driver {
            backoff: Backoff::from_config(&self.config),
            heartbeat: Heartbeat::from_config(&self.config),
            config: self.config,
            connector: Arc::new(connector),
            router: self.router,
            registry: Registry::new(),
            reconnect: Timer::new(),
            state: ConnectionState::Disconnected,
            state_tx,
            observers: Vec::new(),
            transport: None,
            waiters: Vec::new(),
            generation: 0,
            attempt_cancel: None,
            outcomes_tx,
        };
        tokio::spawn(driver.run(commands_rx, outcomes_rx));

        SyncClient {
            commands: commands_tx,
            state: state_rx,
            ids: Arc::new(AtomicU64::new(1)),
        }
    }
}

/// Handle to the sync client.
///
/// Cheap to clone; pass it to every consumer that needs pushed updates. The
/// driver task stops when the last clone is dropped.
#[derive(Clone)]
pub struct SyncClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    ids: Arc<AtomicU64>,
}

impl SyncClient {
    /// Create a new sync client with default WebSocket transport.
    pub fn new(config: ClientConfig) -> Self {
        ClientBuilder::new(config).build()
    }

    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Create a new sync client with custom transport (for testing).
    pub fn with_connector<C: Connector>(config: ClientConfig, connector: C) -> Self {
        ClientBuilder::new(config).build_with_connector(connector)
    }

    /// Connect to the push service.
    ///
    /// Resolves immediately when already connected; joins the pending attempt
    /// when connecting. On failure the client keeps retrying in the
    /// background until [`disconnect`](Self::disconnect) is called.
    pub async fn connect(&self) -> ClientResult<()> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Connect(reply))
            .map_err(|_| ClientError::Shutdown)?;
        response.await.map_err(|_| ClientError::Shutdown)?
    }

    /// Disconnect and forget all subscriptions. No reconnect follows.
    pub async fn disconnect(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Disconnect(reply)).is_ok() {
            let _ = done.await;
        }
    }

    /// Get the current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch channel following the connection state.
    ///
    /// Intermediate states may be coalesced; use
    /// [`on_connection_state_change`](Self::on_connection_state_change) to see
    /// every transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Registers an observer for every state transition.
    ///
    /// The observer first receives the current state, before any later
    /// transition. It runs on the driver task and must not block.
    pub fn on_connection_state_change<F>(&self, observer: F) -> StateObserver
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let id = self.next_id();
        let _ = self.commands.send(Command::Observe {
            id,
            observer: Arc::new(observer),
        });
        StateObserver {
            id,
            commands: self.commands.downgrade(),
        }
    }

    /// Subscribes `callback` to updates for `(topic, params)`.
    ///
    /// Identical subscriptions share one wire subscription; the subscribe
    /// frame is sent only for the first one, and only while connected
    /// (otherwise it goes out when the connection opens). The callback runs on
    /// the driver task and must not block.
    pub fn subscribe<F>(
        &self,
        topic: impl Into<String>,
        params: Params,
        callback: F,
    ) -> Subscription
    where
        F: Fn(&Update) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let key = SubscriptionKey::new(topic.clone(), &params);
        let id = self.next_id();

        let command = Command::Subscribe {
            key: key.clone(),
            topic,
            params,
            id,
            callback: Arc::new(callback),
        };
        if self.commands.send(command).is_err() {
            warn!(%key, "sync client has shut down; subscription ignored");
        }

        Subscription {
            key,
            id,
            commands: self.commands.downgrade(),
        }
    }

    /// Number of distinct subscriptions currently tracked.
    pub async fn active_subscriptions(&self) -> ClientResult<usize> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::CountSubscriptions(reply))
            .map_err(|_| ClientError::Shutdown)?;
        response.await.map_err(|_| ClientError::Shutdown)
    }

    fn next_id(&self) -> u64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }
}

/// Handle for one subscribed callback.
///
/// Dropping the handle keeps the callback registered; call
/// [`unsubscribe`](Self::unsubscribe) to remove it.
#[derive(Debug)]
pub struct Subscription {
    key: SubscriptionKey,
    id: CallbackId,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl Subscription {
    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Removes exactly this callback. The unsubscribe frame is sent only when
    /// it was the last one for its key.
    pub fn unsubscribe(self) {
        if let Some(commands) = self.commands.upgrade() {
            let _ = commands.send(Command::Unsubscribe {
                key: self.key,
                id: self.id,
            });
        }
    }
}

/// Handle for one state observer.
#[derive(Debug)]
pub struct StateObserver {
    id: u64,
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl StateObserver {
    pub fn remove(self) {
        if let Some(commands) = self.commands.upgrade() {
            let _ = commands.send(Command::Unobserve { id: self.id });
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(_) => f.write_str("Connect"),
            Self::Disconnect(_) => f.write_str("Disconnect"),
            Self::Subscribe { key, id, .. } => f
                .debug_struct("Subscribe")
                .field("key", key)
                .field("id", id)
                .finish(),
            Self::Unsubscribe { key, id } => f
                .debug_struct("Unsubscribe")
                .field("key", key)
                .field("id", id)
                .finish(),
            Self::Observe { id, .. } => f.debug_struct("Observe").field("id", id).finish(),
            Self::Unobserve { id } => f.debug_struct("Unobserve").field("id", id).finish(),
            Self::CountSubscriptions(_) => f.write_str("CountSubscriptions"),
        }
    }
}

/// The event loop owning all connection state.
struct Driver<C: Connector> {
    config: ClientConfig,
    connector: Arc<C>,
    router: Router,
    registry: Registry,
    heartbeat: Heartbeat,
    backoff: Backoff,
    reconnect: Timer,
    state: ConnectionState,
    state_tx: watch::Sender<ConnectionState>,
    observers: Vec<(u64, StateCallback)>,
    transport: Option<C::Transport>,
    /// `connect()` callers waiting for the current attempt.
    waiters: Vec<oneshot::Sender<ClientResult<()>>>,
    /// Bumped on every attempt and on disconnect; stale outcomes are dropped.
    generation: u64,
    attempt_cancel: Option<CancellationToken>,
    outcomes_tx: mpsc::UnboundedSender<ConnectOutcome<C::Transport>>,
}

impl<C: Connector> Driver<C> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut outcomes: mpsc::UnboundedReceiver<ConnectOutcome<C::Transport>>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },

                Some(outcome) = outcomes.recv() => self.handle_outcome(outcome).await,

                inbound = next_frame(self.transport.as_mut()) => self.handle_inbound(inbound).await,

                beat = self.heartbeat.wait() => self.handle_beat(beat).await,

                _ = self.reconnect.fired() => {
                    self.reconnect.cancel();
                    self.begin_connect();
                }
            }
        }

        debug!("all client handles dropped; stopping");
        self.disconnect().await;
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect(reply) => self.connect(reply),
            Command::Disconnect(reply) => {
                self.disconnect().await;
                let _ = reply.send(());
            }
            Command::Subscribe {
                key,
                topic,
                params,
                id,
                callback,
            } => {
                if let Some(frame) = self.registry.add(key.clone(), &topic, &params, id, callback) {
                    debug!(%key, "new subscription");
                    if self.state.is_connected() {
                        self.send(&frame).await;
                    }
                }
            }
            Command::Unsubscribe { key, id } => {
                if let Some(frame) = self.registry.remove(&key, id) {
                    debug!(%key, "last subscriber removed");
                    if self.state.is_connected() {
                        self.send(&frame).await;
                    }
                }
            }
            Command::Observe { id, observer } => {
                notify(&observer, self.state);
                self.observers.push((id, observer));
            }
            Command::Unobserve { id } => self.observers.retain(|(existing, _)| *existing != id),
            Command::CountSubscriptions(reply) => {
                let _ = reply.send(self.registry.len());
            }
        }
    }

    fn connect(&mut self, reply: oneshot::Sender<ClientResult<()>>) {
        match self.state {
            ConnectionState::Connected => {
                let _ = reply.send(Ok(()));
            }
            ConnectionState::Connecting => self.waiters.push(reply),
            ConnectionState::Disconnected | ConnectionState::Reconnecting => {
                if self.state == ConnectionState::Disconnected {
                    // Explicit request: a previous give-up does not carry over
                    self.backoff.reset();
                }
                self.waiters.push(reply);
                self.reconnect.cancel();
                self.begin_connect();
            }
        }
    }

    fn begin_connect(&mut self) {
        self.generation += 1;
        let generation = self.generation;

        if let Some(previous) = self.attempt_cancel.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.attempt_cancel = Some(cancel.clone());

        self.set_state(ConnectionState::Connecting);
        info!(url = %self.config.url, generation, "connecting");

        let attempt = self.connector.connect(&self.config.url);
        let timeout = self.config.connect_timeout();
        let timeout_secs = self.config.connect_timeout_secs;
        let outcomes = self.outcomes_tx.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = tokio::time::timeout(timeout, attempt) => {
                    result.unwrap_or_else(|_| Err(TransportError::Timeout(timeout_secs)))
                }
            };
            let _ = outcomes.send(ConnectOutcome { generation, result });
        });
    }

    async fn handle_outcome(&mut self, outcome: ConnectOutcome<C::Transport>) {
        if outcome.generation != self.generation || self.state != ConnectionState::Connecting {
            debug!(generation = outcome.generation, "discarding superseded connection attempt");
            if let Ok(mut transport) = outcome.result {
                let _ = tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await;
            }
            return;
        }
        self.attempt_cancel = None;

        match outcome.result {
            Ok(transport) => self.on_open(transport).await,
            Err(e) => {
                warn!(error = %e, "connection attempt failed");
                for waiter in self.waiters.drain(..) {
                    let _ = waiter.send(Err(ClientError::Transport(e.clone())));
                }
                self.set_state(ConnectionState::Disconnected);
                self.schedule_reconnect();
            }
        }
    }

    async fn on_open(&mut self, transport: C::Transport) {
        self.transport = Some(transport);
        self.backoff.reset();
        self.set_state(ConnectionState::Connected);
        self.heartbeat.start();

        let frames = self.registry.replay_frames();
        if !frames.is_empty() {
            info!(count = frames.len(), "replaying subscriptions");
        }
        let mut outcome = Ok(());
        for frame in &frames {
            if let Err(e) = self.try_send(frame).await {
                outcome = Err(ClientError::Transport(e));
                break;
            }
        }
        if outcome.is_ok() && !self.state.is_connected() {
            outcome = Err(ClientError::Transport(TransportError::ConnectionClosed));
        }

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome.clone());
        }
    }

    async fn handle_inbound(&mut self, inbound: TransportResult<Option<String>>) {
        match inbound {
            Ok(Some(text)) => {
                if self.router.dispatch(&text, &self.registry) == Dispatched::Pong {
                    if let Some(rtt) = self.heartbeat.on_pong() {
                        debug!(rtt_ms = rtt.as_millis() as u64, "pong");
                    }
                }
            }
            Ok(None) => self.connection_lost("closed by server").await,
            Err(e) => self.connection_lost(&e.to_string()).await,
        }
    }

    async fn handle_beat(&mut self, beat: Beat) {
        match self.heartbeat.handle(beat) {
            Action::SendProbe => {
                if self.send(&ClientFrame::ping()).await {
                    self.heartbeat.probe_sent();
                }
            }
            Action::Dead => self.connection_lost("heartbeat timed out").await,
        }
    }

    /// Sends a frame on the open transport.
    ///
    /// Returns false when there is no transport or the send failed.
    async fn send(&mut self, frame: &ClientFrame) -> bool {
        self.try_send(frame).await.is_ok()
    }

    /// Like [`Driver::send`], but reports why the frame did not go out. A
    /// failed send tears the connection down.
    async fn try_send(&mut self, frame: &ClientFrame) -> TransportResult<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Err(TransportError::ConnectionClosed);
        };
        let text = match frame.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "failed to encode frame");
                return Ok(());
            }
        };
        debug!(frame = %text, "sending");
        if let Err(e) = transport.send(text).await {
            self.connection_lost(&e.to_string()).await;
            return Err(e);
        }
        Ok(())
    }

    async fn connection_lost(&mut self, reason: &str) {
        warn!(reason, "connection lost");
        self.heartbeat.stop();
        self.close_transport().await;
        self.set_state(ConnectionState::Disconnected);
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        if self.reconnect.is_scheduled() {
            debug!("reconnect already scheduled");
            return;
        }

        let max_retries = self.config.reconnect_max_retries;
        if max_retries > 0 && self.backoff.attempt() >= max_retries {
            warn!(attempts = self.backoff.attempt(), "giving up reconnecting");
            return;
        }

        let delay = self.backoff.next_delay();
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = self.backoff.attempt(),
            "scheduling reconnect"
        );
        self.reconnect.schedule(delay);
        self.set_state(ConnectionState::Reconnecting);
    }

    async fn disconnect(&mut self) {
        self.generation += 1;
        if let Some(cancel) = self.attempt_cancel.take() {
            cancel.cancel();
        }
        self.reconnect.cancel();
        self.heartbeat.stop();
        self.registry.clear();
        self.backoff.reset();
        self.close_transport().await;

        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(Err(ClientError::Disconnected));
        }
        self.set_state(ConnectionState::Disconnected);
    }

    async fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            let _ = tokio::time::timeout(CLOSE_TIMEOUT, transport.close()).await;
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        info!(from = %self.state, to = %state, "connection state changed");
        self.state = state;
        self.state_tx.send_replace(state);
        for (_, observer) in &self.observers {
            notify(observer, state);
        }
    }
}

fn notify(observer: &StateCallback, state: ConnectionState) {
    if catch_unwind(AssertUnwindSafe(|| observer(state))).is_err() {
        warn!(%state, "state observer panicked");
    }
}

/// Next inbound frame, or pending forever without a transport.
async fn next_frame<T: Transport>(transport: Option<&mut T>) -> TransportResult<Option<String>> {
    match transport {
        Some(transport) => transport.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
