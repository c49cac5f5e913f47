use chrono::{DateTime, Utc};
use location_history::Snapshot;
use realtime::{GeoPoint, LocationSample, SELF_ENTITY};
use serde::Serialize;

use crate::config::MapConfig;
use crate::directory::FleetDirectory;
use crate::marker::{Marker, MarkerBadge};
use crate::resolve::{PositionOrigin, resolve_positions};
use crate::stats::is_fresh;
use crate::trail::{Trail, build_trail};
use crate::viewport::{Viewport, frame};

/// Everything a render pass depends on.
#[derive(Debug, Clone, Copy)]
pub struct MapInput<'a> {
    pub directory: &'a FleetDirectory,
    pub entities: &'a Snapshot,

    /// Current map center.
    pub center: GeoPoint,
    pub now: DateTime<Utc>,
}

/// Output of a render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub markers: Vec<Marker>,
    pub trails: Vec<Trail>,
    pub viewport: Viewport,
}

impl Default for RenderPlan {
    fn default() -> Self {
        Self { markers: Vec::new(), trails: Vec::new(), viewport: Viewport::Unchanged }
    }
}

impl RenderPlan {
    #[must_use]
    pub fn marker(&self, entity_id: &str) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.entity_id == entity_id)
    }

    #[must_use]
    pub fn trail(&self, entity_id: &str) -> Option<&Trail> {
        self.trails.iter().find(|trail| trail.entity_id == entity_id)
    }
}

/// Reconcile `input` into markers, trails and a viewport command.
#[must_use]
pub fn synchronize(input: &MapInput<'_>, config: &MapConfig) -> RenderPlan {
    let resolved =
        resolve_positions(input.directory, input.entities, input.center, config.placeholder_radius);
    let own = input
        .entities
        .get(SELF_ENTITY)
        .and_then(|entity| entity.latest())
        .filter(|latest| !latest.is_sentinel());

    // placeholders are not fixes and don't take part in framing
    let framed = resolved
        .iter()
        .filter(|position| position.origin != PositionOrigin::Placeholder)
        .map(|position| position.point)
        .chain(own.map(LocationSample::point));
    let viewport = frame(framed, config.single_point_zoom);

    let mut trails = Vec::new();
    if config.show_trails {
        let tracked = resolved
            .iter()
            .filter_map(|position| Some((position.entity_id.as_str(), position.tracked_id.as_deref()?)))
            .chain(own.map(|_| (SELF_ENTITY, SELF_ENTITY)));

        for (entity_id, tracked_id) in tracked {
            let Some(entity) = input.entities.get(tracked_id) else {
                continue;
            };
            if let Some(trail) = build_trail(entity_id, entity.history(), &config.trail) {
                trails.push(trail);
            }
        }
    }

    let mut markers: Vec<Marker> = resolved
        .into_iter()
        .map(|position| Marker::from_resolved(position, input.now, config.stale_after))
        .collect();

    if let Some(own) = own {
        let badge = if is_fresh(own, input.now, config.stale_after) {
            MarkerBadge::Live
        } else {
            MarkerBadge::Stale
        };
        markers.push(Marker {
            entity_id: SELF_ENTITY.to_string(),
            label: "You".to_string(),
            point: own.point(),
            badge,
            is_self: true,
            last_seen: Some(own.timestamp),
            metadata: None,
        });
    }

    tracing::trace!(markers = markers.len(), trails = trails.len(), "render plan synchronized");
    RenderPlan { markers, trails, viewport }
}
