//! Keyed record storage with persistence change tracking.
//!
//! # Change Tracking
//! Each store keeps `added` / `removed` / `modified` sets for building a
//! sync payload. A structural change lands in exactly one set:
//! - removing a record that was added since the last sync erases it
//!   entirely (it never reached the backend);
//! - modifying an added record keeps it in `added`;
//! - removing a modified record moves it from `modified` to `removed`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{SchedulingError, SchedulingResult};
use crate::models::{Assignment, Calendar, EntityKey, Event, RecordId, Resource, StoreKind};

/// A record that can live in a [`RecordStore`].
pub trait Record {
    /// Store this record type belongs to.
    const KIND: StoreKind;

    /// Current id.
    fn id(&self) -> &RecordId;

    /// Replaces the id (store re-keying only).
    fn set_id(&mut self, id: RecordId);
}

macro_rules! impl_record {
    ($ty:ty, $kind:expr) => {
        impl Record for $ty {
            const KIND: StoreKind = $kind;

            fn id(&self) -> &RecordId {
                <$ty>::id(self)
            }

            fn set_id(&mut self, id: RecordId) {
                <$ty>::set_id(self, id)
            }
        }
    };
}

impl_record!(Event, StoreKind::Event);
impl_record!(Resource, StoreKind::Resource);
impl_record!(Assignment, StoreKind::Assignment);
impl_record!(Calendar, StoreKind::Calendar);

/// How a record entered its store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Loaded from the backend; not part of the next sync payload.
    Loaded,
    /// Created locally; reported as `added`.
    Added,
}

/// Record ids to sync, per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreChanges {
    pub added: Vec<RecordId>,
    pub removed: Vec<RecordId>,
    pub modified: Vec<RecordId>,
}

impl StoreChanges {
    /// Whether there is nothing to sync.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct ChangeTracker {
    added: BTreeSet<EntityKey>,
    modified: BTreeSet<EntityKey>,
    removed: BTreeMap<EntityKey, RecordId>,
}

impl ChangeTracker {
    fn on_added(&mut self, key: EntityKey) {
        self.added.insert(key);
    }

    fn on_modified(&mut self, key: EntityKey) {
        if !self.added.contains(&key) {
            self.modified.insert(key);
        }
    }

    fn on_removed(&mut self, key: EntityKey, id: RecordId) {
        if self.added.remove(&key) {
            return;
        }
        self.modified.remove(&key);
        self.removed.insert(key, id);
    }
}

/// Records of one kind, addressable by id and by stable key.
#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    records: BTreeMap<EntityKey, T>,
    ids: HashMap<RecordId, EntityKey>,
    next_key: u64,
    tracker: ChangeTracker,
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            ids: HashMap::new(),
            next_key: 0,
            tracker: ChangeTracker::default(),
        }
    }
}

impl<T: Record> RecordStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record and returns its key.
    ///
    /// # Errors
    /// `DuplicateId` if the id is taken.
    pub fn insert(&mut self, record: T, origin: Origin) -> SchedulingResult<EntityKey> {
        if self.ids.contains_key(record.id()) {
            return Err(SchedulingError::DuplicateId {
                store: T::KIND,
                id: record.id().clone(),
            });
        }
        let key = EntityKey(self.next_key);
        self.next_key += 1;
        self.ids.insert(record.id().clone(), key);
        self.records.insert(key, record);
        if origin == Origin::Added {
            self.tracker.on_added(key);
        }
        Ok(key)
    }

    /// Removes a record by id.
    pub fn remove(&mut self, id: &RecordId) -> SchedulingResult<(EntityKey, T)> {
        let key = self
            .ids
            .remove(id)
            .ok_or_else(|| SchedulingError::unknown(T::KIND, id))?;
        let record = self
            .records
            .remove(&key)
            .ok_or_else(|| SchedulingError::unknown(T::KIND, id))?;
        self.tracker.on_removed(key, id.clone());
        Ok((key, record))
    }

    /// Changes a record's id. Returns the (unchanged) key.
    pub fn rekey(&mut self, old: &RecordId, new: RecordId) -> SchedulingResult<EntityKey> {
        if old == &new {
            return self
                .key_of(old)
                .ok_or_else(|| SchedulingError::unknown(T::KIND, old));
        }
        if self.ids.contains_key(&new) {
            return Err(SchedulingError::DuplicateId {
                store: T::KIND,
                id: new,
            });
        }
        let key = self
            .ids
            .remove(old)
            .ok_or_else(|| SchedulingError::unknown(T::KIND, old))?;
        if let Some(record) = self.records.get_mut(&key) {
            record.set_id(new.clone());
        }
        self.ids.insert(new, key);
        self.tracker.on_modified(key);
        Ok(key)
    }

    /// Flags a record as modified for the next sync.
    pub fn mark_modified(&mut self, key: EntityKey) {
        if self.records.contains_key(&key) {
            self.tracker.on_modified(key);
        }
    }

    /// Record by id.
    pub fn get(&self, id: &RecordId) -> Option<&T> {
        self.key_of(id).and_then(|key| self.records.get(&key))
    }

    /// Mutable record by id.
    pub fn get_mut(&mut self, id: &RecordId) -> Option<&mut T> {
        let key = self.key_of(id)?;
        self.records.get_mut(&key)
    }

    /// Record by key.
    pub fn get_by_key(&self, key: EntityKey) -> Option<&T> {
        self.records.get(&key)
    }

    /// Mutable record by key.
    pub fn get_by_key_mut(&mut self, key: EntityKey) -> Option<&mut T> {
        self.records.get_mut(&key)
    }

    /// Key of the record with this id.
    pub fn key_of(&self, id: &RecordId) -> Option<EntityKey> {
        self.ids.get(id).copied()
    }

    /// Whether a record with this id exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.ids.contains_key(id)
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &T)> {
        self.records.iter().map(|(key, record)| (*key, record))
    }

    /// Records in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.records.values()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Pending sync sets.
    pub fn changes(&self) -> StoreChanges {
        let ids = |keys: &BTreeSet<EntityKey>| {
            keys.iter()
                .filter_map(|key| self.records.get(key).map(|r| r.id().clone()))
                .collect()
        };
        StoreChanges {
            added: ids(&self.tracker.added),
            removed: self.tracker.removed.values().cloned().collect(),
            modified: ids(&self.tracker.modified),
        }
    }

    /// Clears the sync sets after a successful sync.
    pub fn accept_changes(&mut self) {
        self.tracker = ChangeTracker::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[i64]) -> RecordStore<Resource> {
        let mut store = RecordStore::new();
        for &id in ids {
            store.insert(Resource::new(id), Origin::Loaded).unwrap();
        }
        store
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut store = store_with(&[1, 2]);
        assert_eq!(store.len(), 2);
        let key = store.key_of(&RecordId::from(2)).unwrap();
        assert_eq!(store.get_by_key(key).unwrap().id(), &RecordId::from(2));

        let err = store.insert(Resource::new(1), Origin::Added).unwrap_err();
        assert!(matches!(err, SchedulingError::DuplicateId { store: StoreKind::Resource, .. }));
    }

    #[test]
    fn test_keys_are_not_reused() {
        let mut store = store_with(&[1]);
        let (old_key, _) = store.remove(&RecordId::from(1)).unwrap();
        let new_key = store.insert(Resource::new(1), Origin::Added).unwrap();
        assert_ne!(old_key, new_key);
    }

    #[test]
    fn test_rekey() {
        let mut store = store_with(&[1, 2]);
        let key = store.key_of(&RecordId::from(1)).unwrap();
        assert_eq!(store.rekey(&RecordId::from(1), RecordId::from(10)).unwrap(), key);
        assert!(store.get(&RecordId::from(1)).is_none());
        assert_eq!(store.get(&RecordId::from(10)).unwrap().id(), &RecordId::from(10));

        assert!(store.rekey(&RecordId::from(10), RecordId::from(2)).is_err());
        assert!(store.rekey(&RecordId::from(99), RecordId::from(100)).is_err());
    }

    #[test]
    fn test_change_sets_are_exclusive() {
        let mut store = store_with(&[1, 2]);
        let loaded = store.key_of(&RecordId::from(1)).unwrap();

        let added = store.insert(Resource::new(3), Origin::Added).unwrap();
        store.mark_modified(added);
        store.mark_modified(loaded);
        store.mark_modified(loaded);

        let changes = store.changes();
        assert_eq!(changes.added, vec![RecordId::from(3)]);
        assert_eq!(changes.modified, vec![RecordId::from(1)]);
        assert!(changes.removed.is_empty());

        store.remove(&RecordId::from(1)).unwrap();
        store.remove(&RecordId::from(3)).unwrap();
        let changes = store.changes();
        assert!(changes.added.is_empty());
        assert!(changes.modified.is_empty());
        assert_eq!(changes.removed, vec![RecordId::from(1)]);

        store.accept_changes();
        assert!(store.changes().is_empty());
    }
}
