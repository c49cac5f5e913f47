//! # Session
//!
//! Explicitly constructed owner of one tracking session: the history store,
//! the active feed, the map view and the providers they depend on. Every
//! feed update, connection status change, directory change or history clear
//! recomputes the render plan and publishes it on a watch channel. A ticker
//! also recomputes it while the feed is quiet so live markers age into stale
//! ones.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::Utc;
use fleet_map::{
    FleetDirectory, FleetStats, MapConfig, MapInput, RenderPlan, describe_location, fleet_stats,
    synchronize,
};
use location_feed::{
    ConnectionManager, ConnectionStatus, DeviceProfile, FeedUpdate, LocationFeed, PollFeed,
    PushFeed, SelfTracker, Subscription,
};
use location_history::SharedHistory;
use realtime::{GeoPoint, PositionSource, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::config::{Config, FeedMode};
use crate::provider::Provider;
use crate::socket::SocketTransport;

const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

pub struct Session {
    feed: Box<dyn LocationFeed>,
    manager: Option<ConnectionManager<SocketTransport>>,
    provider: Provider,
    view: Arc<View>,

    // feed updates, connection status and self-tracker fixes
    subscriptions: Mutex<Vec<Subscription>>,
    ticker: Option<JoinHandle<()>>,
}

struct View {
    history: SharedHistory,
    map: MapConfig,
    state: Mutex<ViewState>,
    plan: watch::Sender<RenderPlan>,
}

struct ViewState {
    directory: FleetDirectory,
    center: GeoPoint,
}

impl Session {
    /// Build a session with the feed selected by `config.mode`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP provider cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Provider::new(config.geocoder_url.clone())?;
        let history = SharedHistory::with_capacity(config.history_capacity);

        let (feed, manager): (Box<dyn LocationFeed>, _) = match config.mode {
            FeedMode::Push => {
                let transport = SocketTransport::new(&config.feed_url);
                let manager = ConnectionManager::new(transport, &config.feed);
                let feed = PushFeed::new(manager.clone(), &config.identity, history.clone());
                (Box::new(feed), Some(manager))
            }
            FeedMode::Poll => {
                let feed = PollFeed::new(
                    provider.clone(),
                    &config.poll_url,
                    config.feed.poll_interval,
                    history.clone(),
                );
                (Box::new(feed), None)
            }
        };

        Ok(Self::with_feed(config, history, feed, manager, provider))
    }

    /// Assemble a session from prepared parts. `history` must be the store
    /// `feed` records into.
    #[must_use]
    pub fn with_feed(
        config: &Config, history: SharedHistory, feed: Box<dyn LocationFeed>,
        manager: Option<ConnectionManager<SocketTransport>>, provider: Provider,
    ) -> Self {
        let (plan, _) = watch::channel(RenderPlan::default());
        let view = Arc::new(View {
            history,
            map: config.map.clone(),
            state: Mutex::new(ViewState {
                directory: FleetDirectory::default(),
                center: config.map.center,
            }),
            plan,
        });

        let mut subscriptions = Vec::new();
        {
            let view = Arc::clone(&view);
            subscriptions.push(feed.subscribe(Box::new(move |_: &FeedUpdate| view.refresh())));
        }
        if let Some(manager) = &manager {
            let view = Arc::clone(&view);
            subscriptions.push(manager.on_status_change(move |_| view.refresh()));
        }
        view.refresh();
        let ticker = View::spawn_ticker(&view);

        Self {
            feed,
            manager,
            provider,
            view,
            subscriptions: Mutex::new(subscriptions),
            ticker,
        }
    }

    /// Start the feed.
    ///
    /// # Errors
    ///
    /// Returns the feed's error when it cannot start, e.g. the first push
    /// connection attempt failed (reconnects continue in the background).
    pub async fn start(&self) -> Result<()> {
        self.feed.start().await
    }

    pub fn stop(&self) {
        self.feed.stop();
    }

    /// Render plans, starting with the current one.
    #[must_use]
    pub fn plan(&self) -> watch::Receiver<RenderPlan> {
        self.view.plan.subscribe()
    }

    #[must_use]
    pub fn current_plan(&self) -> RenderPlan {
        self.view.plan.borrow().clone()
    }

    /// Replace the buses and terminals known to the backend.
    pub fn set_directory(&self, directory: FleetDirectory) {
        self.view.state().directory = directory;
        self.view.refresh();
    }

    pub fn set_center(&self, center: GeoPoint) {
        self.view.state().center = center;
        self.view.refresh();
    }

    /// Clear history for one entity, or all when `entity_id` is `None`.
    /// Latest positions are kept.
    pub fn clear_history(&self, entity_id: Option<&str>) {
        self.view.history.clear(entity_id);
        self.view.refresh();
    }

    #[must_use]
    pub fn stats(&self) -> FleetStats {
        fleet_stats(&self.view.history.snapshot(), Utc::now(), self.view.map.stale_after)
    }

    /// Address of an entity's latest position, falling back to its
    /// coordinates.
    pub async fn describe(&self, entity_id: &str) -> Option<String> {
        let latest = self.view.history.latest(entity_id)?;
        Some(describe_location(&self.provider, latest.point()).await)
    }

    #[must_use]
    pub fn history(&self) -> &SharedHistory {
        &self.view.history
    }

    /// Push connection status; `None` when polling.
    #[must_use]
    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        self.manager.as_ref().map(ConnectionManager::status)
    }

    #[must_use]
    pub const fn manager(&self) -> Option<&ConnectionManager<SocketTransport>> {
        self.manager.as_ref()
    }

    /// Track this device. Fixes are recorded into the session history and,
    /// in push mode, broadcast when `profile` names a bus.
    pub fn track_self<S: PositionSource + 'static>(
        &self, source: S, profile: DeviceProfile,
    ) -> SelfTracker<S, SocketTransport> {
        let tracker =
            SelfTracker::new(source, self.view.history.clone(), profile, self.manager.clone());

        let view = Arc::clone(&self.view);
        let fixes = tracker.on_fix(move |_| view.refresh());
        self.subscriptions().push(fixes);
        tracker
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions());
        for subscription in subscriptions {
            subscription.unsubscribe();
        }
        self.feed.stop();
    }
}

impl View {
    fn refresh(&self) {
        let entities = self.history.snapshot();
        let plan = {
            let state = self.state();
            let input = MapInput {
                directory: &state.directory,
                entities: &entities,
                center: state.center,
                now: Utc::now(),
            };
            synchronize(&input, &self.map)
        };
        self.plan.send_replace(plan);
    }

    // Recompute on a timer so badges follow the clock, not just the feed.
    // Holds the view weakly and ends once the session is gone.
    fn spawn_ticker(view: &Arc<Self>) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no runtime available; render plan refreshes on updates only");
            return None;
        };

        let period = view.map.stale_after.to_std().map_or(MAX_REFRESH_INTERVAL, |stale_after| {
            (stale_after / 10).clamp(Duration::from_millis(100), MAX_REFRESH_INTERVAL)
        });
        let view: Weak<Self> = Arc::downgrade(view);

        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(view) = view.upgrade() else {
                    return;
                };
                view.refresh();
            }
        }))
    }

    fn state(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
