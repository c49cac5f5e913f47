use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use realtime::{EntityMetadata, LocationSample};

use crate::snapshot::Snapshot;

/// Number of samples retained per entity unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 50;

/// A bus, or the operator's own device, and its recent positions.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    entity_id: String,
    latest: Option<LocationSample>,
    history: VecDeque<LocationSample>,
    metadata: EntityMetadata,
}

impl TrackedEntity {
    fn new(entity_id: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            latest: None,
            history: VecDeque::new(),
            metadata: EntityMetadata::default(),
        }
    }

    #[must_use]
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    /// The last sample recorded, retained even when history is cleared.
    #[must_use]
    pub const fn latest(&self) -> Option<&LocationSample> {
        self.latest.as_ref()
    }

    /// Recorded samples, oldest first.
    #[must_use]
    pub const fn history(&self) -> &VecDeque<LocationSample> {
        &self.history
    }

    #[must_use]
    pub const fn metadata(&self) -> &EntityMetadata {
        &self.metadata
    }

    fn push(&mut self, sample: LocationSample, capacity: usize) {
        self.latest = Some(sample.clone());
        self.history.push_back(sample);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}

/// Mapping of entity id to tracked entity.
///
/// Entities are held behind `Arc` so that [`LocationHistory::all`] can hand
/// out snapshots without copying histories; writers clone an entity only when
/// a snapshot still shares it.
#[derive(Debug, Clone)]
pub struct LocationHistory {
    capacity: usize,
    entities: BTreeMap<String, Arc<TrackedEntity>>,
}

impl Default for LocationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationHistory {
    /// Create a store retaining [`DEFAULT_CAPACITY`] samples per entity.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store retaining `capacity` samples per entity. A capacity of
    /// zero is raised to one so that `latest` and history never disagree on
    /// whether anything was seen.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        let capacity = if capacity == 0 { 1 } else { capacity };
        Self { capacity, entities: BTreeMap::new() }
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `sample` to the entity's history, evicting the oldest samples
    /// beyond capacity, and make it the entity's latest. Unknown entities are
    /// created.
    pub fn record(&mut self, entity_id: &str, sample: LocationSample) {
        let entry = self
            .entities
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(TrackedEntity::new(entity_id)));
        Arc::make_mut(entry).push(sample, self.capacity);
    }

    /// Replace the display attributes of a known entity. Returns `false` when
    /// the entity has never been observed.
    pub fn set_metadata(&mut self, entity_id: &str, metadata: EntityMetadata) -> bool {
        let Some(entry) = self.entities.get_mut(entity_id) else {
            return false;
        };
        Arc::make_mut(entry).metadata = metadata;
        true
    }

    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&TrackedEntity> {
        self.entities.get(entity_id).map(AsRef::as_ref)
    }

    /// Clear one entity's history, or every entity's when `entity_id` is
    /// `None`. `latest` is kept.
    pub fn clear(&mut self, entity_id: Option<&str>) {
        match entity_id {
            Some(id) => {
                if let Some(entry) = self.entities.get_mut(id) {
                    Arc::make_mut(entry).history.clear();
                }
            }
            None => {
                for entry in self.entities.values_mut() {
                    Arc::make_mut(entry).history.clear();
                }
            }
        }
    }

    /// Snapshot of every tracked entity. Later writes are not visible through
    /// the snapshot.
    #[must_use]
    pub fn all(&self) -> Snapshot {
        Snapshot::new(self.entities.values().map(Arc::clone).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
