use async_trait::async_trait;
use location_history::Snapshot;
use realtime::{EntityMetadata, LocationSample, Result};

use crate::listeners::Subscription;

/// A sample delivered by a feed, after it has been recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    pub entity_id: String,
    pub sample: LocationSample,

    /// Present when the source supplied display attributes with the sample.
    pub metadata: Option<EntityMetadata>,
}

/// The `LocationFeed` trait is the common contract of the push and poll
/// feeds.
#[async_trait]
pub trait LocationFeed: Send + Sync {
    /// Begin delivering samples.
    ///
    /// # Errors
    ///
    /// Returns an error when the feed cannot be started.
    async fn start(&self) -> Result<()>;

    /// Stop delivering samples. Recorded history is kept.
    fn stop(&self);

    /// Register a handler for every recorded sample.
    fn subscribe(&self, handler: Box<dyn Fn(&FeedUpdate) + Send + Sync>) -> Subscription;

    /// Point-in-time view of everything the feed has recorded.
    fn current_snapshot(&self) -> Snapshot;
}
