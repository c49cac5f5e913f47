#![allow(missing_docs)]


use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use fleet_map::{
    Bus, FleetDirectory, MapConfig, MapInput, MarkerBadge, RenderPlan, Stroke, Terminal, Viewport,
    describe_location, synchronize,
};
use location_history::{LocationHistory, Snapshot};
use pretty_assertions::assert_eq;
use realtime::{GeoPoint, LocationSample, SELF_ENTITY};

use self::provider::MockGeocoder;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

fn sample(lat: f64, lng: f64, seconds_ago: i64) -> LocationSample {
    LocationSample::new(lat, lng, now() - TimeDelta::seconds(seconds_ago))
}

fn bus(number: &str) -> Bus {
    Bus { id: format!("id-{number}"), bus_number: number.to_string(), ..Bus::default() }
}

fn plan(directory: &FleetDirectory, entities: &Snapshot) -> RenderPlan {
    let config = MapConfig::default();
    let input = MapInput { directory, entities, center: config.center, now: now() };
    synchronize(&input, &config)
}

// A sentinel-only entity and one real fix center on the real fix.
#[test]
fn single_fix_is_centered() {
    let mut history = LocationHistory::new();
    history.record("BUS-000", sample(0.0, 0.0, 10));
    history.record("BUS-001", sample(14.6, 121.0, 10));

    let plan = plan(&FleetDirectory::default(), &history.all());
    assert_eq!(plan.viewport, Viewport::Center { point: GeoPoint::new(14.6, 121.0), zoom: 15 });

    // the sentinel entity is still drawn, as a placeholder
    assert_eq!(plan.marker("BUS-000").unwrap().badge, MarkerBadge::Placeholder);
    assert_eq!(plan.marker("BUS-001").unwrap().badge, MarkerBadge::Live);
}

#[test]
fn several_fixes_fit_bounds() {
    let mut history = LocationHistory::new();
    history.record("BUS-001", sample(14.6, 121.0, 10));
    history.record("BUS-002", sample(14.7, 121.1, 10));

    let Viewport::Fit { bounds } = plan(&FleetDirectory::default(), &history.all()).viewport
    else {
        panic!("should fit bounds");
    };
    assert!(bounds.contains(GeoPoint::new(14.6, 121.0)));
    assert!(bounds.contains(GeoPoint::new(14.7, 121.1)));
}

#[test]
fn nothing_locatable_leaves_viewport() {
    let directory = FleetDirectory { buses: vec![bus("BUS-001"), bus("BUS-002")], terminals: vec![] };
    let plan = plan(&directory, &Snapshot::default());

    assert_eq!(plan.viewport, Viewport::Unchanged);
    assert_eq!(plan.markers.len(), 2);
    assert!(plan.markers.iter().all(|marker| marker.badge == MarkerBadge::Placeholder));
    assert_ne!(plan.markers[0].point, plan.markers[1].point);
}

// Fallback positions are never presented as live.
#[test]
fn badges_reflect_origin() {
    let mut history = LocationHistory::new();
    history.record("BUS-LIVE", sample(14.6, 121.0, 30));
    history.record("BUS-OLD", sample(14.61, 121.0, 600));

    let directory = FleetDirectory {
        buses: vec![
            bus("BUS-LIVE"),
            bus("BUS-OLD"),
            Bus { current_location: Some(GeoPoint::new(14.62, 121.0)), ..bus("BUS-STORED") },
            Bus { terminal_id: Some("T-1".to_string()), ..bus("BUS-DEPOT") },
        ],
        terminals: vec![Terminal {
            id: "T-1".to_string(),
            name: "Fairview".to_string(),
            location: GeoPoint::new(14.7, 121.06),
        }],
    };
    let plan = plan(&directory, &history.all());

    let badges: Vec<_> =
        plan.markers.iter().map(|marker| (marker.entity_id.as_str(), marker.badge)).collect();
    assert_eq!(
        badges,
        vec![
            ("BUS-LIVE", MarkerBadge::Live),
            ("BUS-OLD", MarkerBadge::Stale),
            ("BUS-STORED", MarkerBadge::Fallback),
            ("BUS-DEPOT", MarkerBadge::Fallback),
        ]
    );
    assert!(plan.marker("BUS-STORED").unwrap().last_seen.is_none());
}

#[test]
fn own_position_joins_framing() {
    let mut history = LocationHistory::new();
    history.record(SELF_ENTITY, sample(14.55, 121.02, 5));
    let directory = FleetDirectory {
        buses: vec![Bus { current_location: Some(GeoPoint::new(14.6, 121.0)), ..bus("BUS-001") }],
        terminals: vec![],
    };

    let plan = plan(&directory, &history.all());
    let Viewport::Fit { bounds } = plan.viewport else {
        panic!("should fit bounds");
    };
    assert!(bounds.contains(GeoPoint::new(14.55, 121.02)));

    let own = plan.marker(SELF_ENTITY).unwrap();
    assert!(own.is_self);
    assert!(own.is_live());
    assert_eq!(plan.markers.len(), 2);
}

#[test]
fn trails_follow_history_length() {
    let mut history = LocationHistory::new();
    history.record("BUS-ONE", sample(14.6, 121.0, 10));
    for n in 0..5 {
        history.record("BUS-FEW", sample(14.6 + f64::from(n) / 1000.0, 121.0, 60 - i64::from(n)));
    }
    for n in 0..12 {
        history.record("BUS-MANY", sample(14.7 + f64::from(n) / 1000.0, 121.0, 60 - i64::from(n)));
    }

    let plan = plan(&FleetDirectory::default(), &history.all());
    assert!(plan.trail("BUS-ONE").is_none());

    let few = plan.trail("BUS-FEW").unwrap();
    assert_eq!(few.segments.len(), 1);
    assert_eq!(few.segments[0].points.len(), 5);

    let many = plan.trail("BUS-MANY").unwrap();
    let strokes: Vec<_> = many.segments.iter().map(|segment| segment.stroke).collect();
    assert_eq!(strokes, vec![Stroke::Dashed, Stroke::Solid]);
    assert!(many.segments[0].opacity < many.segments[1].opacity);
}

#[test]
fn trails_can_be_disabled() {
    let mut history = LocationHistory::new();
    for n in 0..3 {
        history.record("BUS-001", sample(14.6 + f64::from(n) / 1000.0, 121.0, 10));
    }
    let config = MapConfig { show_trails: false, ..MapConfig::default() };
    let directory = FleetDirectory::default();
    let entities = history.all();
    let input = MapInput { directory: &directory, entities: &entities, center: config.center, now: now() };

    assert!(synchronize(&input, &config).trails.is_empty());
}

// Buses reported by the pull endpoint are keyed by id rather than number.
#[test]
fn listed_bus_matches_history_by_id() {
    let mut history = LocationHistory::new();
    history.record("id-BUS-001", sample(14.6, 121.0, 10));
    history.record("id-BUS-001", sample(14.61, 121.0, 5));
    let directory = FleetDirectory { buses: vec![bus("BUS-001")], terminals: vec![] };

    let plan = plan(&directory, &history.all());
    assert_eq!(plan.markers.len(), 1);
    assert_eq!(plan.markers[0].entity_id, "BUS-001");
    assert_eq!(plan.markers[0].badge, MarkerBadge::Live);
    assert_eq!(plan.trail("BUS-001").unwrap().segments[0].points.len(), 2);
}

#[tokio::test]
async fn address_lookup_falls_back_to_coordinates() {
    let geocoder = MockGeocoder::default().with(14.6, 121.0, "EDSA, Quezon City");

    assert_eq!(
        describe_location(&geocoder, GeoPoint::new(14.6, 121.0)).await,
        "EDSA, Quezon City"
    );
    assert_eq!(
        describe_location(&geocoder, GeoPoint::new(14.65, 121.03)).await,
        "14.650000, 121.030000"
    );
}
