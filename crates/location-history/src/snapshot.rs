use std::sync::Arc;

use crate::store::TrackedEntity;

/// Point-in-time copy of the tracked entities, ordered by entity id.
///
/// Cloning is cheap and every call to [`Snapshot::iter`] starts again from the
/// first entity.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entities: Arc<[Arc<TrackedEntity>]>,
}

impl Snapshot {
    pub(crate) fn new(entities: Vec<Arc<TrackedEntity>>) -> Self {
        Self { entities: entities.into() }
    }

    /// `(entity_id, entity)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackedEntity)> {
        self.entities.iter().map(|entity| (entity.entity_id(), entity.as_ref()))
    }

    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&TrackedEntity> {
        self.entities
            .binary_search_by(|entity| entity.entity_id().cmp(entity_id))
            .ok()
            .map(|idx| self.entities[idx].as_ref())
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
