//! Socket.IO transport for the location push server.
//!
//! The push server speaks Socket.IO, not raw `{type, data}` text frames. An
//! outbound envelope is emitted as the event named by its `type` with `data`
//! as the payload. Inbound events are wrapped back into `{type, data}` so the
//! connection manager sees one frame shape. Keepalive travels the same way,
//! as `ping` and `pong` events.

use anyhow::{Context, Result};
use futures::FutureExt;
use location_feed::{Envelope, Transport, TransportConnection, TransportEvent};
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload, TransportType};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Opens Socket.IO connections over websockets. Reconnection is left to the
/// connection manager, so the client's own reconnect is disabled.
#[derive(Debug, Clone)]
pub struct SocketTransport {
    url: String,
}

impl SocketTransport {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Transport for SocketTransport {
    type Connection = SocketConnection;

    async fn open(&self, events: UnboundedSender<TransportEvent>) -> Result<SocketConnection> {
        let on_any = {
            let events = events.clone();
            move |event: Event, payload: Payload, _socket: Client| {
                forward(&events, event, payload);
                async {}.boxed()
            }
        };
        let on_close = {
            let events = events.clone();
            move |_payload: Payload, _socket: Client| {
                let closed = TransportEvent::Closed { reason: Some("socket closed".to_string()) };
                if events.send(closed).is_err() {
                    debug!("connection already released");
                }
                async {}.boxed()
            }
        };
        let on_error = move |payload: Payload, _socket: Client| {
            warn!(?payload, "socket error");
            async {}.boxed()
        };

        let client = ClientBuilder::new(self.url.as_str())
            .transport_type(TransportType::Websocket)
            .reconnect(false)
            .on_any(on_any)
            .on(Event::Close, on_close)
            .on(Event::Error, on_error)
            .connect()
            .await
            .with_context(|| format!("connecting to {}", self.url))?;

        debug!(url = %self.url, "socket connected");
        Ok(SocketConnection { client })
    }
}

/// An open Socket.IO client.
pub struct SocketConnection {
    client: Client,
}

impl TransportConnection for SocketConnection {
    async fn send(&self, envelope: &Envelope) -> Result<()> {
        self.client
            .emit(envelope.kind.as_str(), envelope.data.clone())
            .await
            .with_context(|| format!("emitting {}", envelope.kind))
    }

    async fn close(&self) -> Result<()> {
        self.client.disconnect().await.context("disconnecting socket")
    }
}

// Socket.IO carries the message type as the event name; frames handed to the
// connection manager are the `{type, data}` envelope.
fn forward(events: &UnboundedSender<TransportEvent>, event: Event, payload: Payload) {
    let Event::Custom(kind) = event else {
        return;
    };
    let Payload::Text(values) = payload else {
        debug!(kind = %kind, "ignoring binary payload");
        return;
    };

    let data = values.into_iter().next().unwrap_or(Value::Null);
    let frame = match serde_json::to_string(&Envelope::new(kind, data)) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "failed to encode inbound frame");
            return;
        }
    };
    if events.send(TransportEvent::Frame(frame)).is_err() {
        debug!("connection already released");
    }
}
