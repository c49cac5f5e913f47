use chrono::{DateTime, TimeDelta, Utc};
use location_history::Snapshot;
use realtime::{BusStatus, LocationSample, SELF_ENTITY};
use serde::Serialize;

/// Fleet-wide figures over the entities heard from recently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    /// Entities with a fresh sample.
    pub reporting: usize,

    /// Reporting entities not flagged inactive or under maintenance.
    pub active: usize,
    pub passengers: u32,
    pub available_seats: u32,
}

/// Whether `sample` was taken within `stale_after` of `now`. Samples dated in
/// the future count as fresh.
#[must_use]
pub fn is_fresh(sample: &LocationSample, now: DateTime<Utc>, stale_after: TimeDelta) -> bool {
    is_fresh_at(sample.timestamp, now, stale_after)
}

pub(crate) fn is_fresh_at(at: DateTime<Utc>, now: DateTime<Utc>, stale_after: TimeDelta) -> bool {
    now.signed_duration_since(at) <= stale_after
}

/// Aggregate the snapshot, leaving out stale entities and the operator's own
/// device. The store is not modified.
#[must_use]
pub fn fleet_stats(entities: &Snapshot, now: DateTime<Utc>, stale_after: TimeDelta) -> FleetStats {
    entities
        .iter()
        .filter(|(id, _)| *id != SELF_ENTITY)
        .filter(|(_, entity)| entity.latest().is_some_and(|latest| is_fresh(latest, now, stale_after)))
        .fold(FleetStats::default(), |mut stats, (_, entity)| {
            let metadata = entity.metadata();
            stats.reporting += 1;
            if matches!(metadata.status, None | Some(BusStatus::Active)) {
                stats.active += 1;
            }
            stats.passengers = stats.passengers.saturating_add(metadata.passengers.unwrap_or_default());
            stats.available_seats =
                stats.available_seats.saturating_add(metadata.available_seats.unwrap_or_default());
            stats
        })
}
