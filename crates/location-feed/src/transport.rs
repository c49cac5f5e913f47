use tokio::sync::mpsc::UnboundedSender;

use crate::protocol::Envelope;

/// Events raised by an open transport, delivered in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame received from the server.
    Frame(String),

    /// The peer closed the connection or the link dropped.
    Closed { reason: Option<String> },
}

/// The `Transport` trait opens connections to the location push server.
pub trait Transport: Send + Sync + 'static {
    type Connection: TransportConnection;

    /// Open a connection. Inbound frames and closure are reported on
    /// `events` for as long as the connection lives.
    fn open(
        &self, events: UnboundedSender<TransportEvent>,
    ) -> impl Future<Output = anyhow::Result<Self::Connection>> + Send;
}

/// An open transport connection.
pub trait TransportConnection: Send + Sync + 'static {
    fn send(&self, envelope: &Envelope) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Close the connection on request of this client.
    fn close(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}
