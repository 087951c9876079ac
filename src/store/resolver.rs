//! Lazy resolution of assignment links.
//!
//! Three entry points:
//! - [`AssignmentResolver::resolve_joined`]: records that joined one at a
//!   time, matched through the raw-id cache;
//! - [`AssignmentResolver::resolve_unresolved`]: bulk sweep of the null
//!   bucket after a store load;
//! - [`AssignmentResolver::resolve_assignment`]: a newly added assignment
//!   whose targets may already exist.
//!
//! Linking only invalidates the indices; they are rebuilt on the next
//! lookup or [`AssignmentStore::update_indices`].

use tracing::trace;

use crate::engine::RelationChange;
use crate::models::{EntityKey, Link, LinkTarget, RecordId, Reference};

use super::AssignmentStore;

/// Link/unlink operations over an [`AssignmentStore`].
pub struct AssignmentResolver<'a> {
    store: &'a mut AssignmentStore,
}

impl<'a> AssignmentResolver<'a> {
    /// Borrows the store for one resolution pass.
    pub fn new(store: &'a mut AssignmentStore) -> Self {
        Self { store }
    }

    /// Links assignments waiting on records queued by
    /// [`AssignmentStore::note_joined`]. `current_id` maps a joined record's
    /// key to its present id, or `None` if it left again.
    pub fn resolve_joined<F>(&mut self, current_id: F) -> Vec<RelationChange>
    where
        F: Fn(LinkTarget, EntityKey) -> Option<RecordId>,
    {
        let mut changes = Vec::new();
        for (target, key) in self.store.take_joined() {
            let Some(id) = current_id(target, key) else {
                continue;
            };
            for assignment in self.store.take_pending(target, &id) {
                let link = Link {
                    key,
                    id: id.clone(),
                };
                self.link(target, assignment, link, &mut changes);
            }
        }
        changes
    }

    /// Sweeps the null bucket of both sides, linking every assignment whose
    /// raw id `lookup` can find.
    pub fn resolve_unresolved<F>(&mut self, lookup: F) -> Vec<RelationChange>
    where
        F: Fn(LinkTarget, &RecordId) -> Option<EntityKey>,
    {
        self.store.update_indices();
        let mut changes = Vec::new();
        for target in LinkTarget::ALL {
            for assignment in self.store.index(target).lookup(None) {
                let Some(raw) = self.raw_id(target, assignment) else {
                    continue;
                };
                let Some(key) = lookup(target, &raw) else {
                    continue;
                };
                self.store.uncache_pending(target, &raw, assignment);
                self.link(target, assignment, Link { key, id: raw }, &mut changes);
            }
        }
        changes
    }

    /// Resolves both sides of one assignment.
    pub fn resolve_assignment<F>(&mut self, assignment: EntityKey, lookup: F) -> Vec<RelationChange>
    where
        F: Fn(LinkTarget, &RecordId) -> Option<EntityKey>,
    {
        let mut changes = Vec::new();
        for target in LinkTarget::ALL {
            let Some(raw) = self.raw_id(target, assignment) else {
                continue;
            };
            if let Some(key) = lookup(target, &raw) {
                self.store.uncache_pending(target, &raw, assignment);
                self.link(target, assignment, Link { key, id: raw }, &mut changes);
            }
        }
        changes
    }

    /// Reverts every assignment linked to a removed record to its raw id.
    pub fn detach(&mut self, target: LinkTarget, key: EntityKey, id: &RecordId) -> Vec<RelationChange> {
        self.store.update_indices();
        let mut changes = Vec::new();
        for assignment in self.store.index(target).lookup(Some(id)) {
            let Some(record) = self.store.get_by_key_mut(assignment) else {
                continue;
            };
            if record.reference(target).key() != Some(key) || !record.unlink(target, None) {
                continue;
            }
            let raw = record.reference(target).id().clone();
            changes.push(RelationChange::new(record.id().clone(), target, false));
            self.store.cache_pending(target, raw, assignment);
        }
        if !changes.is_empty() {
            self.store.invalidate(target);
            trace!(?target, %id, unlinked = changes.len(), "detached assignments");
        }
        changes
    }

    /// Rewrites live links after a record's id changed. Returns the number of
    /// assignments updated.
    pub fn retarget(
        &mut self,
        target: LinkTarget,
        key: EntityKey,
        old_id: &RecordId,
        new_id: &RecordId,
    ) -> usize {
        self.store.update_indices();
        let mut updated = 0;
        for assignment in self.store.index(target).lookup(Some(old_id)) {
            let retargeted = self
                .store
                .get_by_key_mut(assignment)
                .is_some_and(|record| record.retarget(target, key, new_id));
            if retargeted {
                self.store.mark_modified(assignment);
                updated += 1;
            }
        }
        if updated > 0 {
            self.store.invalidate(target);
        }
        updated
    }

    fn raw_id(&self, target: LinkTarget, assignment: EntityKey) -> Option<RecordId> {
        match self.store.get_by_key(assignment)?.reference(target) {
            Reference::Unresolved(raw) => Some(raw.clone()),
            Reference::Resolved(_) => None,
        }
    }

    fn link(
        &mut self,
        target: LinkTarget,
        assignment: EntityKey,
        link: Link,
        changes: &mut Vec<RelationChange>,
    ) {
        let Some(record) = self.store.get_by_key_mut(assignment) else {
            return;
        };
        let waiting = matches!(record.reference(target), Reference::Unresolved(raw) if *raw == link.id);
        if !waiting || !record.link(target, link) {
            return;
        }
        changes.push(RelationChange::new(record.id().clone(), target, true));
        self.store.invalidate(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Assignment;
    use crate::store::Origin;

    fn store() -> AssignmentStore {
        let mut store = AssignmentStore::new();
        for (id, event) in [("a1", 42), ("a2", 42), ("a3", 42), ("a4", 7)] {
            store.add(Assignment::new(id, event, "r1"), Origin::Loaded).unwrap();
        }
        store
    }

    fn event_42(target: LinkTarget, id: &RecordId) -> Option<EntityKey> {
        (target == LinkTarget::Event && *id == RecordId::from(42)).then_some(EntityKey(100))
    }

    #[test]
    fn test_resolve_joined_uses_cache() {
        let mut store = store();
        store.note_joined(LinkTarget::Event, EntityKey(100));

        let changes = AssignmentResolver::new(&mut store)
            .resolve_joined(|_, key| (key == EntityKey(100)).then(|| RecordId::from(42)));

        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.resolved && c.target == LinkTarget::Event));
        assert_eq!(store.pending_for_raw(LinkTarget::Event, &RecordId::from(42)), 0);
        assert_eq!(
            store.assignments_for(LinkTarget::Event, Some(&RecordId::from(42))).len(),
            3
        );
        assert!(!store.has_joined());
    }

    #[test]
    fn test_resolve_joined_skips_departed_records() {
        let mut store = store();
        store.note_joined(LinkTarget::Event, EntityKey(100));
        let changes = AssignmentResolver::new(&mut store).resolve_joined(|_, _| None);
        assert!(changes.is_empty());
        assert_eq!(store.pending_for_raw(LinkTarget::Event, &RecordId::from(42)), 3);
    }

    #[test]
    fn test_sweep_and_detach() {
        let mut store = store();
        let changes = AssignmentResolver::new(&mut store).resolve_unresolved(event_42);
        assert_eq!(changes.len(), 3);

        let changes =
            AssignmentResolver::new(&mut store).detach(LinkTarget::Event, EntityKey(100), &RecordId::from(42));
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| !c.resolved));

        assert!(store
            .assignments_for(LinkTarget::Event, Some(&RecordId::from(42)))
            .is_empty());
        let unresolved = store.assignments_for(LinkTarget::Event, None);
        assert_eq!(unresolved.len(), 4);
        assert!(unresolved
            .iter()
            .filter(|a| a.event_id() == &RecordId::from(42))
            .all(|a| !a.event().is_resolved()));
        assert_eq!(store.pending_for_raw(LinkTarget::Event, &RecordId::from(42)), 3);
    }

    #[test]
    fn test_detach_ignores_other_keys() {
        let mut store = store();
        AssignmentResolver::new(&mut store).resolve_unresolved(event_42);
        let changes =
            AssignmentResolver::new(&mut store).detach(LinkTarget::Event, EntityKey(5), &RecordId::from(42));
        assert!(changes.is_empty());
    }

    #[test]
    fn test_resolve_single_assignment_and_retarget() {
        let mut store = store();
        let key = store.key_of(&RecordId::from("a1")).unwrap();
        let changes = AssignmentResolver::new(&mut store).resolve_assignment(key, event_42);
        assert_eq!(changes, vec![RelationChange::new(RecordId::from("a1"), LinkTarget::Event, true)]);

        let updated = AssignmentResolver::new(&mut store).retarget(
            LinkTarget::Event,
            EntityKey(100),
            &RecordId::from(42),
            &RecordId::from(43),
        );
        assert_eq!(updated, 1);
        let a1 = store.get(&RecordId::from("a1")).unwrap();
        assert_eq!(a1.event_id(), &RecordId::from(43));
        assert!(a1.event().is_resolved());
    }
}
