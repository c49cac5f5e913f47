//! # Location Feed
//!
//! Delivers location samples into a [`SharedHistory`](location_history::SharedHistory)
//! from either a push channel (a socket kept alive by [`ConnectionManager`])
//! or a pull endpoint polled on an interval. Both variants sit behind the
//! [`LocationFeed`] contract so consumers never know which one is active.

mod backoff;
mod config;
mod feed;
mod listeners;
mod manager;
mod poll;
mod protocol;
mod push;
mod status;
mod tracker;
mod transport;

pub use self::backoff::ReconnectPolicy;
pub use self::config::FeedConfig;
pub use self::feed::{FeedUpdate, LocationFeed};
pub use self::listeners::{Handler, Listeners, Subscription};
pub use self::manager::ConnectionManager;
pub use self::poll::PollFeed;
pub use self::protocol::*;
pub use self::push::PushFeed;
pub use self::status::{ConnectionState, ConnectionStatus};
pub use self::tracker::{DeviceProfile, SelfTracker, TrackingStatus};
pub use self::transport::{Transport, TransportConnection, TransportEvent};
