//! Fleet tracking errors

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the crate.
pub type Result<T> = anyhow::Result<T, Error>;

/// Domain level error type returned by the tracking crates.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Error {
    /// A caller supplied an argument that violates an operation's contract.
    #[error("code: invalid_input, description: {0}")]
    InvalidInput(String),

    /// The transport could not be opened or the handshake failed.
    #[error("code: connection_error, description: {0}")]
    Connection(String),

    /// An inbound message could not be decoded.
    #[error("code: protocol_error, description: {0}")]
    Protocol(String),

    /// The local position source is unavailable or access was denied.
    #[error("code: geolocation_error, description: {0}")]
    Geolocation(String),

    /// A pull-feed REST request failed.
    #[error("code: fetch_error, description: {0}")]
    Fetch(String),

    /// A non recoverable internal error occurred.
    #[error("code: server_error, description: {0}")]
    ServerError(String),
}

impl Error {
    /// Returns the stable error code associated with the variant.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Connection(_) => "connection_error",
            Self::Protocol(_) => "protocol_error",
            Self::Geolocation(_) => "geolocation_error",
            Self::Fetch(_) => "fetch_error",
            Self::ServerError(_) => "server_error",
        }
    }

    /// Returns the error description.
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Self>() {
            Some(Self::InvalidInput(e)) => Self::InvalidInput(format!("{err}: {e}")),
            Some(Self::Connection(e)) => Self::Connection(format!("{err}: {e}")),
            Some(Self::Protocol(e)) => Self::Protocol(format!("{err}: {e}")),
            Some(Self::Geolocation(e)) => Self::Geolocation(format!("{err}: {e}")),
            Some(Self::Fetch(e)) => Self::Fetch(format!("{err}: {e}")),
            Some(Self::ServerError(e)) => Self::ServerError(format!("{err}: {e}")),
            None => {
                let stack = err.chain().map(ToString::to_string).collect::<Vec<_>>().join(" -> ");
                tracing::debug!("unclassified error: {stack}");
                Self::ServerError(stack)
            }
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[macro_export]
macro_rules! connection_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Connection(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Connection(format!($err))
    };
}

#[macro_export]
macro_rules! protocol_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Protocol(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Protocol(format!($err))
    };
}

#[macro_export]
macro_rules! fetch_error {
    ($fmt:expr, $($arg:tt)*) => {
        $crate::Error::Fetch(format!($fmt, $($arg)*))
    };
     ($err:expr $(,)?) => {
        $crate::Error::Fetch(format!($err))
    };
}
