//! # Location History
//!
//! In-memory, per-entity bounded history of recent positions. The store is a
//! faithful log: it records whatever it is given, in the order it is given,
//! and leaves filtering to display code.

mod shared;
mod snapshot;
mod store;

pub use self::shared::SharedHistory;
pub use self::snapshot::Snapshot;
pub use self::store::{DEFAULT_CAPACITY, LocationHistory, TrackedEntity};
