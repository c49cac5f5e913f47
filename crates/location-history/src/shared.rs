use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use realtime::{EntityMetadata, LocationSample};

use crate::snapshot::Snapshot;
use crate::store::{LocationHistory, TrackedEntity};

/// Session-owned handle to a [`LocationHistory`] shared between feeds and
/// presentation code.
///
/// Locks are held only for the duration of a single call, never across an
/// `.await`.
#[derive(Debug, Clone, Default)]
pub struct SharedHistory {
    inner: Arc<RwLock<LocationHistory>>,
}

impl SharedHistory {
    #[must_use]
    pub fn new(history: LocationHistory) -> Self {
        Self { inner: Arc::new(RwLock::new(history)) }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(LocationHistory::with_capacity(capacity))
    }

    pub fn record(&self, entity_id: &str, sample: LocationSample) {
        tracing::trace!(entity_id = %entity_id, lat = sample.lat, lng = sample.lng, "recording sample");
        self.write().record(entity_id, sample);
    }

    pub fn set_metadata(&self, entity_id: &str, metadata: EntityMetadata) -> bool {
        self.write().set_metadata(entity_id, metadata)
    }

    /// Owned copy of a single entity.
    #[must_use]
    pub fn entity(&self, entity_id: &str) -> Option<TrackedEntity> {
        self.read().get(entity_id).cloned()
    }

    #[must_use]
    pub fn latest(&self, entity_id: &str) -> Option<LocationSample> {
        self.read().get(entity_id).and_then(|entity| entity.latest().cloned())
    }

    pub fn clear(&self, entity_id: Option<&str>) {
        self.write().clear(entity_id);
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.read().all()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.read().capacity()
    }

    fn read(&self) -> RwLockReadGuard<'_, LocationHistory> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LocationHistory> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
