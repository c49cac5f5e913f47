use async_trait::async_trait;
use location_history::{SharedHistory, Snapshot};
use realtime::Result;
use tracing::warn;

use crate::feed::{FeedUpdate, LocationFeed};
use crate::listeners::{Listeners, Subscription};
use crate::manager::ConnectionManager;
use crate::protocol::{InboundMessage, LocationUpdate};
use crate::transport::Transport;

/// Feed backed by the push server. Every pushed location update is recorded
/// under its bus number before subscribers are told about it.
pub struct PushFeed<T: Transport> {
    manager: ConnectionManager<T>,
    identity: String,
    history: SharedHistory,
    updates: Listeners<FeedUpdate>,
    events: Option<Subscription>,
}

impl<T: Transport> PushFeed<T> {
    pub fn new(
        manager: ConnectionManager<T>, identity: impl Into<String>, history: SharedHistory,
    ) -> Self {
        let updates = Listeners::default();

        let events = {
            let history = history.clone();
            let updates = updates.clone();
            manager.on_event(move |message| {
                if let InboundMessage::LocationUpdate(update) = message
                    && let Some(recorded) = record(&history, update)
                {
                    updates.notify(&recorded);
                }
            })
        };

        Self { manager, identity: identity.into(), history, updates, events: Some(events) }
    }

    #[must_use]
    pub const fn manager(&self) -> &ConnectionManager<T> {
        &self.manager
    }
}

impl<T: Transport> Drop for PushFeed<T> {
    fn drop(&mut self) {
        if let Some(events) = self.events.take() {
            events.unsubscribe();
        }
    }
}

#[async_trait]
impl<T: Transport> LocationFeed for PushFeed<T> {
    async fn start(&self) -> Result<()> {
        self.manager.connect(&self.identity).await
    }

    fn stop(&self) {
        self.manager.disconnect();
    }

    fn subscribe(&self, handler: Box<dyn Fn(&FeedUpdate) + Send + Sync>) -> Subscription {
        self.updates.subscribe(handler)
    }

    fn current_snapshot(&self) -> Snapshot {
        self.history.snapshot()
    }
}

fn record(history: &SharedHistory, update: &LocationUpdate) -> Option<FeedUpdate> {
    if update.bus_number.trim().is_empty() {
        warn!("dropping location update without a bus number");
        return None;
    }

    let sample = update.sample();
    let metadata = update.metadata();
    history.record(&update.bus_number, sample.clone());
    history.set_metadata(&update.bus_number, metadata.clone());

    Some(FeedUpdate { entity_id: update.bus_number.clone(), sample, metadata: Some(metadata) })
}
