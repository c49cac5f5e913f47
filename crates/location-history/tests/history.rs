#![allow(missing_docs)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use location_history::{DEFAULT_CAPACITY, LocationHistory, SharedHistory};
use pretty_assertions::assert_eq;
use realtime::LocationSample;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

#[allow(clippy::cast_precision_loss)]
fn sample(n: i64) -> LocationSample {
    LocationSample::new(14.0 + n as f64 / 1000.0, 121.0, base() + Duration::seconds(n))
}

// Should retain exactly the most recent samples, in append order.
#[test]
fn evicts_oldest_first() {
    let mut store = LocationHistory::new();
    for n in 0..120 {
        store.record("BUS-001", sample(n));
    }

    let entity = store.get("BUS-001").expect("should exist");
    assert_eq!(entity.history().len(), DEFAULT_CAPACITY);

    let retained: Vec<_> = entity.history().iter().cloned().collect();
    let expected: Vec<_> = (70..120).map(sample).collect();
    assert_eq!(retained, expected);
}

// Should never exceed capacity regardless of how many entities interleave.
#[test]
fn bound_holds_per_entity() {
    let mut store = LocationHistory::with_capacity(5);
    for n in 0..40 {
        let id = if n % 3 == 0 { "BUS-A" } else { "BUS-B" };
        store.record(id, sample(n));
        assert!(store.get(id).unwrap().history().len() <= 5);
    }

    let a: Vec<_> = store.get("BUS-A").unwrap().history().iter().cloned().collect();
    let expected: Vec<_> = [27, 30, 33, 36, 39].into_iter().map(sample).collect();
    assert_eq!(a, expected);
}

// Latest follows the last call to record, even after eviction.
#[test]
fn latest_is_last_recorded() {
    let mut store = LocationHistory::with_capacity(3);
    for n in 0..10 {
        store.record("BUS-001", sample(n));
        assert_eq!(store.get("BUS-001").unwrap().latest(), Some(&sample(n)));
    }
}

// Append order wins over timestamp order.
#[test]
fn out_of_order_samples_keep_arrival_order() {
    let mut store = LocationHistory::new();
    store.record("BUS-001", sample(5));
    store.record("BUS-001", sample(2));

    let entity = store.get("BUS-001").unwrap();
    assert_eq!(entity.history()[0], sample(5));
    assert_eq!(entity.history()[1], sample(2));
    assert_eq!(entity.latest(), Some(&sample(2)));
}

// Snapshots don't observe writes made after they were taken.
#[test]
fn snapshot_is_isolated() {
    let shared = SharedHistory::default();
    shared.record("BUS-001", sample(1));

    let snapshot = shared.snapshot();
    shared.record("BUS-001", sample(2));
    shared.record("BUS-002", sample(3));

    assert_eq!(snapshot.len(), 1);
    let entity = snapshot.get("BUS-001").unwrap();
    assert_eq!(entity.history().len(), 1);
    assert_eq!(entity.latest(), Some(&sample(1)));

    // restartable
    assert_eq!(snapshot.iter().count(), 1);
    assert_eq!(snapshot.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec!["BUS-001"]);

    let fresh = shared.snapshot();
    assert_eq!(fresh.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec!["BUS-001", "BUS-002"]);
    assert_eq!(fresh.get("BUS-001").unwrap().history().len(), 2);
}

#[test]
fn shared_clear_and_latest() {
    let shared = SharedHistory::with_capacity(10);
    shared.record("BUS-001", sample(1));
    shared.clear(None);

    assert_eq!(shared.latest("BUS-001"), Some(sample(1)));
    assert!(shared.entity("BUS-001").unwrap().history().is_empty());
    assert!(shared.entity("BUS-404").is_none());
    assert_eq!(shared.capacity(), 10);
}
