//! # Location
//!
//! Value types describing observed positions and the display attributes
//! attached to tracked vehicles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved entity id for the operator's own device.
pub const SELF_ENTITY: &str = "__self__";

/// A WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `(0, 0)` is what uninitialised data looks like upstream, so it is
    /// read as "no fix".
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_sentinel(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }
}

/// One timestamped position observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,

    /// Horizontal accuracy in meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// When the sample was produced (not received).
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    #[must_use]
    pub const fn new(lat: f64, lng: f64, timestamp: DateTime<Utc>) -> Self {
        Self { lat, lng, accuracy: None, timestamp }
    }

    #[must_use]
    pub const fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    #[must_use]
    pub const fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.point().is_sentinel()
    }
}

/// Operating status reported for a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusStatus {
    Active,
    Inactive,
    Maintenance,
}

/// Display attributes supplied alongside positions. None of these are
/// interpreted by the history store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_seats: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passengers: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BusStatus>,

    /// E-mail of the operator assigned to the vehicle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
}
