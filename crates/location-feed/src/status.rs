use std::fmt;
use std::time::Duration;

/// Lifecycle state of the push connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Connection status reported to status subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub message: Option<String>,

    /// Reset to 0 on every successful connect.
    pub reconnect_attempts: u32,

    /// Delay before the next scheduled reconnect, while one is pending.
    pub retry_in: Option<Duration>,
}

impl ConnectionStatus {
    pub(crate) fn set(&mut self, state: ConnectionState, message: impl Into<String>) {
        self.state = state;
        self.message = Some(message.into());
        self.retry_in = None;
    }
}
