//! Secondary index from a foreign-key value to the assignments holding it.
//!
//! Resolved references are bucketed by target id. Unresolved references all
//! live in one explicit null bucket so "what is still unresolved" costs
//! O(unresolved), not O(assignments).
//!
//! The index is rebuilt lazily: link changes only [`invalidate`] it, and
//! the owning store rebuilds once before the next lookup.
//!
//! [`invalidate`]: RelationIndex::invalidate

use std::collections::{BTreeSet, HashMap};

use crate::models::{EntityKey, RecordId, Reference};

/// Non-unique multi-map `target id | null → assignment keys`.
#[derive(Debug, Clone, Default)]
pub struct RelationIndex {
    resolved: HashMap<RecordId, BTreeSet<EntityKey>>,
    unresolved: BTreeSet<EntityKey>,
    dirty: bool,
}

impl RelationIndex {
    /// Creates an empty, clean index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an assignment under its reference's bucket.
    pub fn insert(&mut self, assignment: EntityKey, reference: &Reference) {
        match reference {
            Reference::Resolved(link) => {
                self.resolved
                    .entry(link.id.clone())
                    .or_default()
                    .insert(assignment);
            }
            Reference::Unresolved(_) => {
                self.unresolved.insert(assignment);
            }
        }
    }

    /// Removes an assignment from its reference's bucket.
    pub fn remove(&mut self, assignment: EntityKey, reference: &Reference) {
        match reference {
            Reference::Resolved(link) => {
                if let Some(bucket) = self.resolved.get_mut(&link.id) {
                    bucket.remove(&assignment);
                    if bucket.is_empty() {
                        self.resolved.remove(&link.id);
                    }
                }
            }
            Reference::Unresolved(_) => {
                self.unresolved.remove(&assignment);
            }
        }
    }

    /// Assignments resolved to `value`, or the unresolved ones for `None`.
    ///
    /// Reflects the last rebuild; check [`RelationIndex::is_dirty`] first.
    pub fn lookup(&self, value: Option<&RecordId>) -> Vec<EntityKey> {
        match value {
            Some(id) => self
                .resolved
                .get(id)
                .map(|bucket| bucket.iter().copied().collect())
                .unwrap_or_default(),
            None => self.unresolved.iter().copied().collect(),
        }
    }

    /// Number of assignments in the null bucket.
    pub fn unresolved_len(&self) -> usize {
        self.unresolved.len()
    }

    /// Rebuilds every bucket from scratch and clears the dirty flag.
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (EntityKey, &'a Reference)>,
    {
        self.resolved.clear();
        self.unresolved.clear();
        for (assignment, reference) in entries {
            self.insert(assignment, reference);
        }
        self.dirty = false;
    }

    /// Marks the index stale without rebuilding it.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Whether a rebuild is due.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Link;

    fn resolved(key: u64, id: i64) -> Reference {
        Reference::Resolved(Link {
            key: EntityKey(key),
            id: RecordId::from(id),
        })
    }

    #[test]
    fn test_buckets() {
        let mut index = RelationIndex::new();
        index.insert(EntityKey(1), &resolved(10, 42));
        index.insert(EntityKey(2), &resolved(10, 42));
        index.insert(EntityKey(3), &Reference::Unresolved(RecordId::from(7)));

        assert_eq!(
            index.lookup(Some(&RecordId::from(42))),
            vec![EntityKey(1), EntityKey(2)]
        );
        assert_eq!(index.lookup(None), vec![EntityKey(3)]);
        assert!(index.lookup(Some(&RecordId::from(7))).is_empty());

        index.remove(EntityKey(1), &resolved(10, 42));
        index.remove(EntityKey(2), &resolved(10, 42));
        assert!(index.lookup(Some(&RecordId::from(42))).is_empty());
    }

    #[test]
    fn test_invalidate_then_rebuild() {
        let mut index = RelationIndex::new();
        let stale = resolved(10, 42);
        index.insert(EntityKey(1), &stale);
        index.invalidate();
        assert!(index.is_dirty());

        let fresh = Reference::Unresolved(RecordId::from(42));
        index.rebuild([(EntityKey(1), &fresh)]);

        assert!(!index.is_dirty());
        assert!(index.lookup(Some(&RecordId::from(42))).is_empty());
        assert_eq!(index.lookup(None), vec![EntityKey(1)]);
        assert_eq!(index.unresolved_len(), 1);
    }
}
