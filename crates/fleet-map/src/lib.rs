//! # Fleet Map
//!
//! Turns the tracked entity snapshot and the fleet directory into a render
//! plan: one marker per visible vehicle, trail polylines and a viewport
//! command. Everything here is a pure function of its inputs; the caller
//! decides when to recompute.

mod address;
mod config;
mod directory;
mod marker;
mod plan;
mod resolve;
mod stats;
mod trail;
mod viewport;

pub use self::address::{describe_location, format_coordinate};
pub use self::config::{MapConfig, TrailStyle};
pub use self::directory::{Bus, FleetDirectory, Terminal};
pub use self::marker::{Marker, MarkerBadge};
pub use self::plan::{MapInput, RenderPlan, synchronize};
pub use self::resolve::{PositionOrigin, ResolvedPosition, placeholder, resolve_positions};
pub use self::stats::{FleetStats, fleet_stats, is_fresh};
pub use self::trail::{Stroke, Trail, TrailSegment, build_trail};
pub use self::viewport::{Bounds, Viewport, frame};
