//! Position resolution.
//!
//! Each visible entity gets exactly one position, taken from the first
//! source that has a usable fix: live history, the backend's stored
//! location, the assigned terminal, or a placeholder near the map center.
//! The `(0, 0)` sentinel never counts as a fix.

use std::f64::consts::TAU;

use chrono::{DateTime, Utc};
use location_history::{Snapshot, TrackedEntity};
use realtime::{EntityMetadata, GeoPoint, SELF_ENTITY};

use crate::directory::{Bus, FleetDirectory};

/// Where a resolved position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOrigin {
    Live,
    Stored,
    Terminal,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPosition {
    pub entity_id: String,
    pub label: String,
    pub point: GeoPoint,
    pub origin: PositionOrigin,

    /// History entry backing this entity, when it is tracked.
    pub tracked_id: Option<String>,

    /// Timestamp of the sample behind a live position.
    pub observed_at: Option<DateTime<Utc>>,
    pub metadata: Option<EntityMetadata>,
}

/// Resolve every visible entity: listed buses in directory order, followed by
/// tracked entities the directory doesn't list. The operator's own device is
/// not included.
#[must_use]
pub fn resolve_positions(
    directory: &FleetDirectory, entities: &Snapshot, center: GeoPoint, radius: f64,
) -> Vec<ResolvedPosition> {
    let unlisted: Vec<(&str, &TrackedEntity)> = entities
        .iter()
        .filter(|(id, _)| *id != SELF_ENTITY && !directory.lists(id))
        .collect();
    let total = directory.buses.len() + unlisted.len();

    let listed = directory.buses.iter().enumerate().map(|(index, bus)| {
        let tracked = entities.get(&bus.bus_number).or_else(|| entities.get(&bus.id));
        resolve_bus(bus, tracked, directory).unwrap_or_else(|| ResolvedPosition {
            entity_id: bus.entity_id().to_string(),
            label: bus.entity_id().to_string(),
            point: placeholder(center, radius, index, total),
            origin: PositionOrigin::Placeholder,
            tracked_id: tracked.map(|entity| entity.entity_id().to_string()),
            observed_at: None,
            metadata: Some(bus.metadata.clone()),
        })
    });

    let offset = directory.buses.len();
    let tracked_only = unlisted.into_iter().enumerate().map(|(index, (id, entity))| {
        live(entity).map_or_else(
            || ResolvedPosition {
                entity_id: id.to_string(),
                label: id.to_string(),
                point: placeholder(center, radius, offset + index, total),
                origin: PositionOrigin::Placeholder,
                tracked_id: Some(id.to_string()),
                observed_at: None,
                metadata: Some(entity.metadata().clone()),
            },
            |(point, observed_at)| ResolvedPosition {
                entity_id: id.to_string(),
                label: id.to_string(),
                point,
                origin: PositionOrigin::Live,
                tracked_id: Some(id.to_string()),
                observed_at: Some(observed_at),
                metadata: Some(entity.metadata().clone()),
            },
        )
    });

    listed.chain(tracked_only).collect()
}

fn resolve_bus(
    bus: &Bus, tracked: Option<&TrackedEntity>, directory: &FleetDirectory,
) -> Option<ResolvedPosition> {
    let entity_id = bus.entity_id().to_string();
    let tracked_id = tracked.map(|entity| entity.entity_id().to_string());

    // tracked metadata is newer than the directory's when present
    let metadata = tracked
        .map(TrackedEntity::metadata)
        .filter(|metadata| **metadata != EntityMetadata::default())
        .unwrap_or(&bus.metadata)
        .clone();

    if let Some((point, observed_at)) = tracked.and_then(live) {
        return Some(ResolvedPosition {
            label: entity_id.clone(),
            entity_id,
            point,
            origin: PositionOrigin::Live,
            tracked_id,
            observed_at: Some(observed_at),
            metadata: Some(metadata),
        });
    }

    let (point, origin) = bus
        .current_location
        .filter(|point| !point.is_sentinel())
        .map(|point| (point, PositionOrigin::Stored))
        .or_else(|| {
            let terminal = directory.terminal(bus.terminal_id.as_deref()?)?;
            (!terminal.location.is_sentinel())
                .then_some((terminal.location, PositionOrigin::Terminal))
        })?;

    Some(ResolvedPosition {
        label: entity_id.clone(),
        entity_id,
        point,
        origin,
        tracked_id,
        observed_at: None,
        metadata: Some(metadata),
    })
}

fn live(entity: &TrackedEntity) -> Option<(GeoPoint, DateTime<Utc>)> {
    let latest = entity.latest().filter(|sample| !sample.is_sentinel())?;
    Some((latest.point(), latest.timestamp))
}

/// Position `index` of `total` on a circle of `radius` degrees around
/// `center`, starting due east.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn placeholder(center: GeoPoint, radius: f64, index: usize, total: usize) -> GeoPoint {
    let angle = TAU * index as f64 / total.max(1) as f64;
    GeoPoint::new(center.lat + radius * angle.sin(), center.lng + radius * angle.cos())
}
