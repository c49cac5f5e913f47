#![allow(missing_docs)]


use std::time::Duration;

use chrono::{TimeDelta, Utc};
use fleet_tracker::{
    Bus, Config, ConnectionState, DeviceProfile, FeedMode, FleetDirectory, FleetStats,
    LocationSample, MarkerBadge, Provider, RenderPlan, Session, TrackingStatus, Viewport,
};
use location_feed::PollFeed;
use location_history::SharedHistory;
use pretty_assertions::assert_eq;
use realtime::SELF_ENTITY;
use serde_json::json;
use tokio::time::timeout;

use self::provider::{MockHttp, MockPositionSource};

const POLL_URL: &str = "http://localhost:3000/api/locations/latest";

fn positions() -> String {
    let now = Utc::now();
    json!([
        {"busId": "BUS-001", "latest": {"lat": 14.6, "lng": 121.0, "timestamp": now - TimeDelta::seconds(20)}},
        {"busId": "BUS-002", "latest": {"lat": 14.7, "lng": 121.1, "timestamp": now - TimeDelta::seconds(10)}},
    ])
    .to_string()
}

fn polling_session(http: &MockHttp) -> Session {
    polling_session_with(http, Config { mode: FeedMode::Poll, ..Config::default() })
}

fn polling_session_with(http: &MockHttp, config: Config) -> Session {
    let history = SharedHistory::with_capacity(config.history_capacity);
    let feed = PollFeed::new(http.clone(), POLL_URL, config.feed.poll_interval, history.clone());
    let provider = Provider::new(None).expect("should build provider");
    Session::with_feed(&config, history, Box::new(feed), None, provider)
}

async fn next_plan(session: &Session, done: impl FnMut(&RenderPlan) -> bool) -> RenderPlan {
    let mut plans = session.plan();
    let plan = timeout(Duration::from_secs(5), plans.wait_for(done))
        .await
        .expect("plan should update")
        .expect("session should be alive");
    plan.clone()
}

#[tokio::test]
async fn polled_positions_reach_plan() {
    let http = MockHttp::default();
    http.respond(200, &positions());
    let session = polling_session(&http);
    assert_eq!(session.current_plan(), RenderPlan::default());

    session.start().await.expect("should start");
    let plan = next_plan(&session, |plan| plan.markers.len() == 2).await;
    session.stop();

    assert!(plan.markers.iter().all(|marker| marker.badge == MarkerBadge::Live));
    assert!(matches!(plan.viewport, Viewport::Fit { .. }));
    assert_eq!(
        session.stats(),
        FleetStats { reporting: 2, active: 2, passengers: 0, available_seats: 0 }
    );
}

// A quiet feed must not leave markers claiming to be live.
#[tokio::test]
async fn quiet_feed_ages_markers_to_stale() {
    let http = MockHttp::default();
    let now = Utc::now();
    http.respond(
        200,
        &json!([{"busId": "BUS-001", "latest": {"lat": 14.6, "lng": 121.0, "timestamp": now}}])
            .to_string(),
    );
    let mut config = Config { mode: FeedMode::Poll, ..Config::default() };
    config.map.stale_after = TimeDelta::seconds(2);
    let session = polling_session_with(&http, config);

    session.start().await.expect("should start");
    let plan = next_plan(&session, |plan| plan.marker("BUS-001").is_some()).await;
    session.stop();
    assert_eq!(plan.marker("BUS-001").unwrap().badge, MarkerBadge::Live);

    // no further updates arrive; the clock alone ages the marker
    let plan = next_plan(&session, |plan| {
        plan.marker("BUS-001").is_some_and(|marker| marker.badge == MarkerBadge::Stale)
    })
    .await;
    assert!(!plan.marker("BUS-001").unwrap().is_live());
    assert_eq!(session.stats().reporting, 0);
}

// Clearing drops trails but the buses stay on the map.
#[tokio::test]
async fn clear_history_keeps_markers() {
    let http = MockHttp::default();
    http.respond(200, &positions());
    let session = polling_session(&http);

    session.start().await.expect("should start");
    next_plan(&session, |plan| plan.markers.len() == 2).await;
    session.stop();

    session.clear_history(None);
    let entity = session.history().entity("BUS-001").expect("should still be tracked");
    assert!(entity.history().is_empty());
    assert!(entity.latest().is_some());
    assert_eq!(session.current_plan().markers.len(), 2);
}

#[tokio::test]
async fn directory_without_positions_uses_placeholders() {
    let session = polling_session(&MockHttp::default());
    session.set_directory(FleetDirectory {
        buses: vec![
            Bus { id: "a".to_string(), bus_number: "BUS-101".to_string(), ..Bus::default() },
            Bus { id: "b".to_string(), bus_number: "BUS-102".to_string(), ..Bus::default() },
        ],
        terminals: vec![],
    });

    let plan = session.current_plan();
    assert_eq!(plan.markers.len(), 2);
    assert!(plan.markers.iter().all(|marker| marker.badge == MarkerBadge::Placeholder));
    assert_eq!(plan.viewport, Viewport::Unchanged);
}

#[tokio::test]
async fn describe_falls_back_to_coordinates() {
    let http = MockHttp::default();
    http.respond(200, &positions());
    let session = polling_session(&http);

    session.start().await.expect("should start");
    next_plan(&session, |plan| plan.markers.len() == 2).await;
    session.stop();

    assert_eq!(session.describe("BUS-001").await.as_deref(), Some("14.600000, 121.000000"));
    assert_eq!(session.describe("BUS-404").await, None);
}

#[tokio::test]
async fn own_position_is_drawn() {
    let session = polling_session(&MockHttp::default());
    let source = MockPositionSource::default();
    let fixes = source.handle();

    let tracker = session.track_self(source, DeviceProfile::default());
    tracker.start();
    assert_eq!(tracker.status(), TrackingStatus::Tracking);

    fixes.send(Ok(LocationSample::new(14.55, 121.02, Utc::now()))).expect("tracker listening");
    let plan = next_plan(&session, |plan| plan.marker(SELF_ENTITY).is_some()).await;
    tracker.stop();

    let own = plan.marker(SELF_ENTITY).expect("own marker");
    assert!(own.is_self);
    assert_eq!(plan.viewport, Viewport::Center { point: own.point, zoom: 15 });
    assert_eq!(session.stats().reporting, 0);
}

#[tokio::test]
async fn push_session_starts_idle() {
    let config = Config { mode: FeedMode::Push, ..Config::default() };
    let session = Session::from_config(&config).expect("should build session");

    let status = session.connection_status().expect("push sessions report status");
    assert_eq!(status.state, ConnectionState::Idle);
    assert!(session.manager().is_some());

    let polling = Session::from_config(&Config { mode: FeedMode::Poll, ..config })
        .expect("should build session");
    assert!(polling.connection_status().is_none());
}
