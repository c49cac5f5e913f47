//! Log output for hosts embedding a session.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

/// Install a global `fmt` subscriber filtered by `RUST_LOG`, or by
/// `directives` when it is unset. Does nothing if a subscriber is already
/// installed.
pub fn init(directives: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    if Registry::default().with(filter).with(fmt::layer()).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
