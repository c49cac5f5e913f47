//! # Fleet Tracker
//!
//! Realtime bus locations for a fleet map. A [`Session`] receives positions
//! from the push server (or by polling the REST endpoint), keeps a bounded
//! history per bus and publishes a [`RenderPlan`] of markers, trails and
//! viewport every time something changes.

mod config;
mod provider;
mod session;
mod socket;
pub mod telemetry;

pub use fleet_map::{
    Bus, FleetDirectory, FleetStats, Marker, MarkerBadge, RenderPlan, Terminal, Trail, Viewport,
};
pub use location_feed::{ConnectionState, ConnectionStatus, DeviceProfile, TrackingStatus};
pub use realtime::{GeoPoint, LocationSample};

pub use self::config::{Config, FeedMode};
pub use self::provider::Provider;
pub use self::session::Session;
pub use self::socket::{SocketConnection, SocketTransport};
