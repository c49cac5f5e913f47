//! # Connection Manager
//!
//! Owns the push transport lifecycle: connect, register, read, keepalive and
//! reconnect with exponential backoff after unclean closures. Transport and
//! protocol failures never reach callers of `send` or subscribers; they are
//! reported as status changes.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use realtime::{Error, Result, connection_error};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::backoff::ReconnectPolicy;
use crate::config::FeedConfig;
use crate::listeners::{Listeners, Subscription};
use crate::protocol::{InboundMessage, OutboundMessage};
use crate::status::{ConnectionState, ConnectionStatus};
use crate::transport::{Transport, TransportConnection, TransportEvent};

/// Single logical connection to the location push server.
///
/// Cloning yields another handle to the same connection.
pub struct ConnectionManager<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for ConnectionManager<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<T: Transport> {
    transport: T,
    policy: ReconnectPolicy,
    keepalive: Option<Duration>,
    state: Mutex<State<T::Connection>>,
    events: Listeners<InboundMessage>,
    statuses: Listeners<ConnectionStatus>,
}

struct State<C> {
    status: ConnectionStatus,
    identity: Option<String>,
    connection: Option<Arc<C>>,

    // bumped by every connect and disconnect; tasks holding an older value
    // are stale and must not touch state
    generation: u64,
    connecting: bool,
    reader: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl<C> Default for State<C> {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::default(),
            identity: None,
            connection: None,
            generation: 0,
            connecting: false,
            reader: None,
            retry: None,
        }
    }
}

impl<C> State<C> {
    fn cancel_tasks(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(retry) = self.retry.take() {
            retry.abort();
        }
    }
}

impl<T: Transport> ConnectionManager<T> {
    #[must_use]
    pub fn new(transport: T, config: &FeedConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                policy: config.reconnect,
                keepalive: config.keepalive,
                state: Mutex::new(State::default()),
                events: Listeners::default(),
                statuses: Listeners::default(),
            }),
        }
    }

    /// Open the transport and register `identity` with the feed source.
    ///
    /// A failed attempt moves the status to `Failed` and schedules a
    /// reconnect before returning the error.
    ///
    /// # Errors
    ///
    /// Returns an invalid input error when `identity` is empty, and a
    /// connection error when an attempt is already in progress or this
    /// attempt fails.
    pub async fn connect(&self, identity: &str) -> Result<()> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(Error::InvalidInput("identity must not be empty".to_string()));
        }

        let (generation, previous) = {
            let mut state = self.inner.lock();
            if state.connecting {
                return Err(connection_error!("a connection attempt is already in progress"));
            }
            state.cancel_tasks();
            state.generation += 1;
            state.connecting = true;
            state.identity = Some(identity.to_string());
            state.status.reconnect_attempts = 0;
            (state.generation, state.connection.take())
        };

        if let Some(previous) = previous {
            close_detached(previous);
        }

        Inner::establish(Arc::clone(&self.inner), generation).await
    }

    /// Close the transport without triggering a reconnect, cancel any pending
    /// reconnect and forget the identity. Idempotent.
    pub fn disconnect(&self) {
        let (connection, status) = {
            let mut state = self.inner.lock();
            state.cancel_tasks();
            state.generation += 1;
            state.connecting = false;
            state.identity = None;

            let connection = state.connection.take();
            if connection.is_none() && state.status.state == ConnectionState::Disconnected {
                return;
            }
            state.status.set(ConnectionState::Disconnected, "disconnected");
            (connection, state.status.clone())
        };

        if let Some(connection) = connection {
            close_detached(connection);
        }
        info!("disconnected from location feed");
        self.inner.statuses.notify(&status);
    }

    /// Send `message` if connected. Otherwise the message is dropped with a
    /// warning. Returns whether the transport accepted the message.
    pub async fn send(&self, message: &OutboundMessage) -> bool {
        let connection = {
            let state = self.inner.lock();
            if state.status.state == ConnectionState::Connected {
                state.connection.clone()
            } else {
                None
            }
        };

        let Some(connection) = connection else {
            warn!(kind = message.kind(), "not connected; dropping outbound message");
            return false;
        };
        self.inner.deliver(&connection, message).await
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().status.clone()
    }

    #[must_use]
    pub fn identity(&self) -> Option<String> {
        self.inner.lock().identity.clone()
    }

    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        self.inner.policy
    }

    /// Subscribe to decoded inbound messages (keepalive traffic excluded).
    pub fn on_event(
        &self, handler: impl Fn(&InboundMessage) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.subscribe(handler)
    }

    pub fn on_status_change(
        &self, handler: impl Fn(&ConnectionStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.statuses.subscribe(handler)
    }
}

impl<T: Transport> Inner<T> {
    fn lock(&self) -> MutexGuard<'_, State<T::Connection>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Boxed so that the reconnect task, which calls back into `establish`,
    // has a nameable future type.
    fn establish(inner: Arc<Self>, generation: u64) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let _attempt = Attempt { inner: Arc::clone(&inner), generation };
            let Some((identity, status)) = inner.begin(generation) else {
                return Err(connection_error!("connection attempt superseded"));
            };
            inner.statuses.notify(&status);

            let (events_tx, events_rx) = mpsc::unbounded_channel();
            let connection = match inner.transport.open(events_tx).await {
                Ok(connection) => Arc::new(connection),
                Err(err) => {
                    let reason = format!("failed to open transport: {err:#}");
                    return Err(Self::fail(&inner, generation, &reason));
                }
            };

            let registration = OutboundMessage::EmployeeConnected { email: identity };
            if !inner.deliver(&connection, &registration).await {
                close_detached(connection);
                return Err(Self::fail(&inner, generation, "failed to register with location feed"));
            }

            let status = {
                let mut state = inner.lock();
                if state.generation == generation {
                    state.connecting = false;
                    state.connection = Some(Arc::clone(&connection));
                    state.status.set(ConnectionState::Connected, "connected");
                    state.status.reconnect_attempts = 0;

                    let reader = Self::read_loop(
                        Arc::clone(&inner),
                        generation,
                        events_rx,
                        Arc::clone(&connection),
                    );
                    state.reader = Some(tokio::spawn(reader));
                    Some(state.status.clone())
                } else {
                    None
                }
            };

            let Some(status) = status else {
                close_detached(connection);
                return Err(connection_error!("connection attempt superseded"));
            };
            info!("connected to location feed");
            inner.statuses.notify(&status);
            Ok(())
        })
    }

    // Mark the start of an attempt, returning the identity to register.
    fn begin(&self, generation: u64) -> Option<(String, ConnectionStatus)> {
        let mut state = self.lock();
        if state.generation != generation {
            return None;
        }
        let identity = state.identity.clone()?;
        state.status.set(ConnectionState::Connecting, "connecting");
        Some((identity, state.status.clone()))
    }

    fn fail(inner: &Arc<Self>, generation: u64, reason: &str) -> Error {
        let status = {
            let mut state = inner.lock();
            if state.generation != generation {
                return connection_error!("connection attempt superseded: {}", reason);
            }
            state.connecting = false;
            state.connection = None;
            state.status.set(ConnectionState::Failed, reason);
            state.status.clone()
        };

        warn!(monotonic_counter.connection_failures = 1, reason = %reason, "location feed connection failed");
        inner.statuses.notify(&status);
        Self::schedule_retry(inner, generation, reason);
        Error::Connection(reason.to_string())
    }

    // Called by the reader when the connection ends without a disconnect.
    fn closed(inner: &Arc<Self>, generation: u64, reason: &str) {
        {
            let mut state = inner.lock();
            if state.generation != generation {
                return;
            }
            state.connection = None;
            state.reader = None;
        }

        warn!(monotonic_counter.connections_lost = 1, reason = %reason, "location feed connection lost");
        Self::schedule_retry(inner, generation, reason);
    }

    fn schedule_retry(inner: &Arc<Self>, generation: u64, cause: &str) {
        let status = {
            let mut state = inner.lock();
            if state.generation != generation {
                return;
            }

            let attempt = state.status.reconnect_attempts.saturating_add(1);
            state.status.reconnect_attempts = attempt;
            let max_attempts = inner.policy.max_attempts;

            if let Some(delay) = inner.policy.delay(attempt) {
                let message = format!(
                    "{cause}; reconnecting in {}s (attempt {attempt} of {max_attempts})",
                    delay.as_secs_f64()
                );
                state.status.set(ConnectionState::Connecting, message);
                state.status.retry_in = Some(delay);

                let task_inner = Arc::clone(inner);
                state.retry = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    Self::retry(task_inner, generation).await;
                }));

                info!(
                    monotonic_counter.reconnects_scheduled = 1,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "scheduling reconnect"
                );
            } else {
                state.status.set(
                    ConnectionState::Failed,
                    format!("{cause}; giving up after {max_attempts} reconnect attempts"),
                );
                error!(attempts = max_attempts, "location feed reconnect attempts exhausted");
            }
            state.status.clone()
        };

        inner.statuses.notify(&status);
    }

    async fn retry(inner: Arc<Self>, generation: u64) {
        let proceed = {
            let mut state = inner.lock();
            let proceed = state.generation == generation && !state.connecting;
            if proceed {
                state.connecting = true;
                state.retry = None;
            }
            proceed
        };
        if !proceed {
            return;
        }

        if let Err(err) = Self::establish(inner, generation).await {
            debug!(error = %err, "reconnect attempt failed");
        }
    }

    async fn read_loop(
        inner: Arc<Self>, generation: u64, mut events: UnboundedReceiver<TransportEvent>,
        connection: Arc<T::Connection>,
    ) {
        let mut keepalive = inner.keepalive.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut awaiting_pong = false;

        let reason = loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(TransportEvent::Frame(frame)) => match InboundMessage::decode(&frame) {
                        Ok(InboundMessage::Pong) => awaiting_pong = false,
                        Ok(InboundMessage::Ping) => {
                            inner.deliver(&connection, &OutboundMessage::Pong).await;
                        }
                        Ok(message) => inner.events.notify(&message),
                        Err(err) => {
                            warn!(monotonic_counter.frames_dropped = 1, error = %err, "dropping malformed frame");
                        }
                    },
                    Some(TransportEvent::Closed { reason }) => {
                        break reason.unwrap_or_else(|| "connection closed by server".to_string());
                    }
                    None => break "transport stopped reporting events".to_string(),
                },
                () = next_tick(keepalive.as_mut()) => {
                    if awaiting_pong {
                        if let Err(err) = connection.close().await {
                            debug!(error = %err, "closing unresponsive connection");
                        }
                        break "keepalive timed out".to_string();
                    }
                    inner.deliver(&connection, &OutboundMessage::Ping).await;
                    awaiting_pong = true;
                }
            }
        };

        Self::closed(&inner, generation, &reason);
    }

    async fn deliver(&self, connection: &T::Connection, message: &OutboundMessage) -> bool {
        let envelope = match message.to_envelope() {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(kind = message.kind(), error = %err, "failed to encode message");
                return false;
            }
        };

        match connection.send(&envelope).await {
            Ok(()) => true,
            Err(err) => {
                warn!(kind = message.kind(), error = %err, "failed to send message");
                false
            }
        }
    }
}

// Settles an attempt whose future was dropped before it finished, e.g. a
// `connect` abandoned under a timeout. Completed attempts have already
// cleared `connecting`, and superseded ones carry an old generation.
struct Attempt<T: Transport> {
    inner: Arc<Inner<T>>,
    generation: u64,
}

impl<T: Transport> Drop for Attempt<T> {
    fn drop(&mut self) {
        let abandoned = {
            let mut state = self.inner.lock();
            let abandoned = state.generation == self.generation && state.connecting;
            if abandoned && tokio::runtime::Handle::try_current().is_err() {
                state.connecting = false;
                state.status.set(ConnectionState::Failed, "connection attempt cancelled");
                return;
            }
            abandoned
        };
        if abandoned {
            debug!("connection attempt cancelled before completing");
            Inner::fail(&self.inner, self.generation, "connection attempt cancelled");
        }
    }
}

async fn next_tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn close_detached<C: TransportConnection>(connection: Arc<C>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        debug!("no runtime available; dropping connection without close");
        return;
    };
    runtime.spawn(async move {
        if let Err(err) = connection.close().await {
            debug!(error = %err, "closing connection");
        }
    });
}
