//! # Self Tracker
//!
//! Follows the operator's own device. Fixes are recorded under
//! [`SELF_ENTITY`] and, when the device is assigned to a bus, broadcast to
//! the push server as location updates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use location_history::SharedHistory;
use realtime::{BusStatus, LocationSample, PositionSource, SELF_ENTITY};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::feed::FeedUpdate;
use crate::listeners::{Listeners, Subscription};
use crate::manager::ConnectionManager;
use crate::protocol::{LocationUpdate, OutboundMessage};
use crate::transport::Transport;

/// Tracking lifecycle as seen by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TrackingStatus {
    #[default]
    Idle,
    Tracking,
    Stopped,

    /// The position source failed; tracking will not resume on its own.
    Unavailable(String),
}

/// Details broadcast with every fix from this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProfile {
    /// Bus this device reports for. Fixes are only broadcast when set.
    pub bus_number: Option<String>,
    pub route: Option<String>,
    pub employee_email: Option<String>,
    pub client_id: String,
    pub total_seats: Option<u32>,
    pub available_seats: Option<u32>,
    pub passengers: Option<u32>,
    pub status: Option<BusStatus>,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            bus_number: None,
            route: None,
            employee_email: None,
            client_id: Uuid::new_v4().to_string(),
            total_seats: None,
            available_seats: None,
            passengers: None,
            status: None,
        }
    }
}

impl DeviceProfile {
    fn update_for(&self, sample: &LocationSample) -> Option<LocationUpdate> {
        let bus_number = self.bus_number.clone().filter(|number| !number.trim().is_empty())?;
        Some(LocationUpdate {
            lat: sample.lat,
            lng: sample.lng,
            accuracy: sample.accuracy,
            timestamp: sample.timestamp,
            bus_number,
            route: self.route.clone(),
            total_seats: self.total_seats,
            available_seats: self.available_seats,
            status: self.status,
            passengers: self.passengers,
            employee_email: self.employee_email.clone(),
            client_id: Some(self.client_id.clone()),
        })
    }
}

/// Watches a [`PositionSource`] while started. At most one watcher runs at a
/// time.
pub struct SelfTracker<S: PositionSource + 'static, T: Transport> {
    inner: Arc<Tracker<S, T>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct Tracker<S, T: Transport> {
    source: S,
    manager: Option<ConnectionManager<T>>,
    history: SharedHistory,
    profile: DeviceProfile,
    status: Mutex<TrackingStatus>,
    statuses: Listeners<TrackingStatus>,
    fixes: Listeners<FeedUpdate>,
}

impl<S: PositionSource + 'static, T: Transport> SelfTracker<S, T> {
    /// Fixes are broadcast through `manager` when one is given.
    pub fn new(
        source: S, history: SharedHistory, profile: DeviceProfile,
        manager: Option<ConnectionManager<T>>,
    ) -> Self {
        Self {
            inner: Arc::new(Tracker {
                source,
                manager,
                history,
                profile,
                status: Mutex::new(TrackingStatus::Idle),
                statuses: Listeners::default(),
                fixes: Listeners::default(),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start watching, replacing any watcher already running.
    pub fn start(&self) {
        if let Some(previous) = self.task().take() {
            previous.abort();
            debug!("replacing running position watcher");
        }
        self.inner.set_status(TrackingStatus::Tracking);

        let mut task = self.task();
        if let Some(raced) = task.take() {
            raced.abort();
        }
        *task = Some(tokio::spawn(Tracker::run(Arc::clone(&self.inner))));
    }

    /// Stop watching. Idempotent.
    pub fn stop(&self) {
        let Some(task) = self.task().take() else {
            return;
        };
        task.abort();
        if self.status() == TrackingStatus::Tracking {
            self.inner.set_status(TrackingStatus::Stopped);
        }
    }

    #[must_use]
    pub fn status(&self) -> TrackingStatus {
        self.inner.lock_status().clone()
    }

    #[must_use]
    pub fn profile(&self) -> &DeviceProfile {
        &self.inner.profile
    }

    pub fn on_status_change(
        &self, handler: impl Fn(&TrackingStatus) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.statuses.subscribe(handler)
    }

    /// Subscribe to fixes after they are recorded.
    pub fn on_fix(&self, handler: impl Fn(&FeedUpdate) + Send + Sync + 'static) -> Subscription {
        self.inner.fixes.subscribe(handler)
    }

    fn task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: PositionSource + 'static, T: Transport> Drop for SelfTracker<S, T> {
    fn drop(&mut self) {
        if let Some(task) = self.task().take() {
            task.abort();
        }
    }
}

impl<S: PositionSource + 'static, T: Transport> Tracker<S, T> {
    async fn run(tracker: Arc<Self>) {
        info!("tracking own position");
        loop {
            let sample = match tracker.source.next_fix().await {
                Ok(sample) => sample,
                Err(err) => {
                    warn!(error = %err, "position source unavailable; tracking stopped");
                    tracker.set_status(TrackingStatus::Unavailable(err.to_string()));
                    return;
                }
            };

            tracker.history.record(SELF_ENTITY, sample.clone());

            if let Some(manager) = &tracker.manager
                && let Some(update) = tracker.profile.update_for(&sample)
            {
                manager.send(&OutboundMessage::LocationUpdate(Box::new(update))).await;
            }

            tracker.fixes.notify(&FeedUpdate {
                entity_id: SELF_ENTITY.to_string(),
                sample,
                metadata: None,
            });
        }
    }

    fn set_status(&self, status: TrackingStatus) {
        {
            let mut current = self.lock_status();
            if *current == status {
                return;
            }
            current.clone_from(&status);
        }
        self.statuses.notify(&status);
    }

    fn lock_status(&self) -> MutexGuard<'_, TrackingStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
