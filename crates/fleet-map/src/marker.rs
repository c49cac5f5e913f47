use chrono::{DateTime, TimeDelta, Utc};
use realtime::{EntityMetadata, GeoPoint};
use serde::Serialize;

use crate::resolve::{PositionOrigin, ResolvedPosition};
use crate::stats::is_fresh_at;

/// Badge telling the viewer how far to trust a marker's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerBadge {
    /// A recent sample from the feed.
    Live,

    /// A feed sample older than the staleness window.
    Stale,

    /// The backend's stored location or the assigned terminal.
    Fallback,

    /// No position known; drawn near the map center.
    Placeholder,
}

/// One marker, keyed by `entity_id` for diffing across render passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub entity_id: String,
    pub label: String,
    pub point: GeoPoint,
    pub badge: MarkerBadge,

    /// Marks the operator's own device.
    pub is_self: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntityMetadata>,
}

impl Marker {
    pub(crate) fn from_resolved(
        resolved: ResolvedPosition, now: DateTime<Utc>, stale_after: TimeDelta,
    ) -> Self {
        let badge = match resolved.origin {
            PositionOrigin::Live
                if resolved.observed_at.is_some_and(|at| is_fresh_at(at, now, stale_after)) =>
            {
                MarkerBadge::Live
            }
            PositionOrigin::Live => MarkerBadge::Stale,
            PositionOrigin::Stored | PositionOrigin::Terminal => MarkerBadge::Fallback,
            PositionOrigin::Placeholder => MarkerBadge::Placeholder,
        };

        Self {
            entity_id: resolved.entity_id,
            label: resolved.label,
            point: resolved.point,
            badge,
            is_self: false,
            last_seen: resolved.observed_at,
            metadata: resolved.metadata,
        }
    }

    /// Whether the marker shows a real-time position.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.badge == MarkerBadge::Live
    }
}
