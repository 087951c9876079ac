//! Assignment store with per-side relation indices.
//!
//! Each side (event, resource) has a [`RelationIndex`] plus a raw-id cache
//! of unresolved assignments. The cache is filled at ingestion and when a
//! link reverts, so a record that joins later finds its assignments without
//! scanning the null bucket.

use std::collections::{BTreeSet, HashMap};

use crate::error::SchedulingResult;
use crate::models::{Assignment, EntityKey, LinkTarget, RecordId, Reference};

use super::{Origin, RecordStore, RelationIndex, StoreChanges};

#[derive(Debug, Clone, Default)]
struct Side {
    index: RelationIndex,
    pending: HashMap<RecordId, BTreeSet<EntityKey>>,
}

fn slot(target: LinkTarget) -> usize {
    match target {
        LinkTarget::Event => 0,
        LinkTarget::Resource => 1,
    }
}

/// Store of assignments and their link indices.
#[derive(Debug, Clone, Default)]
pub struct AssignmentStore {
    records: RecordStore<Assignment>,
    sides: [Side; 2],
    joined: Vec<(LinkTarget, EntityKey)>,
}

impl AssignmentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment. Its links are resolved by the caller.
    pub fn add(&mut self, assignment: Assignment, origin: Origin) -> SchedulingResult<EntityKey> {
        let key = self.records.insert(assignment, origin)?;
        for target in LinkTarget::ALL {
            if let Some(Reference::Unresolved(raw)) =
                self.records.get_by_key(key).map(|a| a.reference(target))
            {
                let side = &mut self.sides[slot(target)];
                side.pending.entry(raw.clone()).or_default().insert(key);
            }
            self.invalidate(target);
        }
        Ok(key)
    }

    /// Removes an assignment by id.
    pub fn remove(&mut self, id: &RecordId) -> SchedulingResult<Assignment> {
        let (key, assignment) = self.records.remove(id)?;
        for target in LinkTarget::ALL {
            self.uncache_pending(target, assignment.reference(target).id(), key);
            self.invalidate(target);
        }
        Ok(assignment)
    }

    /// Assignment by id.
    pub fn get(&self, id: &RecordId) -> Option<&Assignment> {
        self.records.get(id)
    }

    /// Assignment by key.
    pub fn get_by_key(&self, key: EntityKey) -> Option<&Assignment> {
        self.records.get_by_key(key)
    }

    pub(crate) fn get_by_key_mut(&mut self, key: EntityKey) -> Option<&mut Assignment> {
        self.records.get_by_key_mut(key)
    }

    /// Key of an assignment.
    pub fn key_of(&self, id: &RecordId) -> Option<EntityKey> {
        self.records.key_of(id)
    }

    /// Whether an assignment with this id exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains(id)
    }

    /// Assignments in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Assignment)> {
        self.records.iter()
    }

    /// Number of assignments.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index of one side, possibly stale.
    pub fn index(&self, target: LinkTarget) -> &RelationIndex {
        &self.sides[slot(target)].index
    }

    /// Rebuilds stale indices. Returns `true` if anything was rebuilt.
    pub fn update_indices(&mut self) -> bool {
        let mut rebuilt = false;
        for target in LinkTarget::ALL {
            let side = &mut self.sides[slot(target)];
            if side.index.is_dirty() {
                side.index
                    .rebuild(self.records.iter().map(|(key, a)| (key, a.reference(target))));
                rebuilt = true;
            }
        }
        rebuilt
    }

    /// Assignments resolved to `id` on one side, or the unresolved ones for
    /// `None`. Rebuilds the index first when stale.
    pub fn assignments_for(&mut self, target: LinkTarget, id: Option<&RecordId>) -> Vec<&Assignment> {
        self.update_indices();
        self.sides[slot(target)]
            .index
            .lookup(id)
            .into_iter()
            .filter_map(|key| self.records.get_by_key(key))
            .collect()
    }

    /// Assignments still waiting for `raw` on one side.
    pub fn pending_for_raw(&self, target: LinkTarget, raw: &RecordId) -> usize {
        self.sides[slot(target)]
            .pending
            .get(raw)
            .map_or(0, BTreeSet::len)
    }

    /// Persistence sync sets.
    pub fn changes(&self) -> StoreChanges {
        self.records.changes()
    }

    /// Clears the persistence sync sets.
    pub fn accept_changes(&mut self) {
        self.records.accept_changes();
    }

    pub(crate) fn mark_modified(&mut self, key: EntityKey) {
        self.records.mark_modified(key);
    }

    pub(crate) fn invalidate(&mut self, target: LinkTarget) {
        self.sides[slot(target)].index.invalidate();
    }

    /// Queues a record that joined its store for the next resolution pass.
    pub(crate) fn note_joined(&mut self, target: LinkTarget, key: EntityKey) {
        self.joined.push((target, key));
    }

    pub(crate) fn has_joined(&self) -> bool {
        !self.joined.is_empty()
    }

    pub(crate) fn take_joined(&mut self) -> Vec<(LinkTarget, EntityKey)> {
        std::mem::take(&mut self.joined)
    }

    pub(crate) fn take_pending(&mut self, target: LinkTarget, raw: &RecordId) -> BTreeSet<EntityKey> {
        self.sides[slot(target)]
            .pending
            .remove(raw)
            .unwrap_or_default()
    }

    pub(crate) fn cache_pending(&mut self, target: LinkTarget, raw: RecordId, key: EntityKey) {
        self.sides[slot(target)]
            .pending
            .entry(raw)
            .or_default()
            .insert(key);
    }

    pub(crate) fn uncache_pending(&mut self, target: LinkTarget, raw: &RecordId, key: EntityKey) {
        let pending = &mut self.sides[slot(target)].pending;
        if let Some(keys) = pending.get_mut(raw) {
            keys.remove(&key);
            if keys.is_empty() {
                pending.remove(raw);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AssignmentStore {
        let mut store = AssignmentStore::new();
        store.add(Assignment::new("a1", 42, "r1"), Origin::Loaded).unwrap();
        store.add(Assignment::new("a2", 42, "r2"), Origin::Loaded).unwrap();
        store.add(Assignment::new("a3", 7, "r1"), Origin::Loaded).unwrap();
        store
    }

    #[test]
    fn test_add_fills_raw_id_cache() {
        let store = store();
        assert_eq!(store.pending_for_raw(LinkTarget::Event, &RecordId::from(42)), 2);
        assert_eq!(store.pending_for_raw(LinkTarget::Resource, &RecordId::from("r1")), 2);
        assert!(store.index(LinkTarget::Event).is_dirty());
    }

    #[test]
    fn test_lookup_rebuilds_lazily() {
        let mut store = store();
        let unresolved = store.assignments_for(LinkTarget::Event, None);
        assert_eq!(unresolved.len(), 3);
        assert!(!store.index(LinkTarget::Event).is_dirty());
        assert!(!store.update_indices());
    }

    #[test]
    fn test_remove_drops_cache_entries() {
        let mut store = store();
        store.remove(&RecordId::from("a1")).unwrap();
        assert_eq!(store.pending_for_raw(LinkTarget::Event, &RecordId::from(42)), 1);
        assert_eq!(store.assignments_for(LinkTarget::Resource, None).len(), 2);
        assert!(store.remove(&RecordId::from("a1")).is_err());
    }
}
