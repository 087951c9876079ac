//! Assignment model.
//!
//! An assignment links one event to one resource. Both links start as raw
//! ids ([`Reference::Unresolved`]) and become live references once the
//! target record joins its store. Removing the target reverts the link to
//! its raw id; the assignment itself survives.

use serde::{Deserialize, Serialize};

use super::{AssignmentData, EntityKey, RecordId, StoreKind};

/// Which side of an assignment a link points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTarget {
    Event,
    Resource,
}

impl LinkTarget {
    /// Both sides.
    pub const ALL: [LinkTarget; 2] = [LinkTarget::Event, LinkTarget::Resource];

    /// Store holding the target records.
    pub fn store(self) -> StoreKind {
        match self {
            LinkTarget::Event => StoreKind::Event,
            LinkTarget::Resource => StoreKind::Resource,
        }
    }
}

/// A live, non-owning link to a record in another store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    /// Target's stable key.
    pub key: EntityKey,
    /// Target's current id, kept in sync on id changes.
    pub id: RecordId,
}

/// A foreign-key reference that may not be materialized yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Resolved(Link),
    Unresolved(RecordId),
}

impl Reference {
    /// Whether the target record is linked.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Reference::Resolved(_))
    }

    /// Target key when resolved.
    pub fn key(&self) -> Option<EntityKey> {
        match self {
            Reference::Resolved(link) => Some(link.key),
            Reference::Unresolved(_) => None,
        }
    }

    /// Target id, resolved or raw.
    pub fn id(&self) -> &RecordId {
        match self {
            Reference::Resolved(link) => &link.id,
            Reference::Unresolved(raw) => raw,
        }
    }
}

/// An event-to-resource assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    id: RecordId,
    event: Reference,
    resource: Reference,
    raw_event_id: RecordId,
    raw_resource_id: RecordId,
    /// Allocation in percent (100 = full time).
    pub units: f64,
}

impl Assignment {
    /// Creates an unresolved assignment.
    pub fn new(
        id: impl Into<RecordId>,
        event_id: impl Into<RecordId>,
        resource_id: impl Into<RecordId>,
    ) -> Self {
        let event_id = event_id.into();
        let resource_id = resource_id.into();
        Self {
            id: id.into(),
            event: Reference::Unresolved(event_id.clone()),
            resource: Reference::Unresolved(resource_id.clone()),
            raw_event_id: event_id,
            raw_resource_id: resource_id,
            units: 100.0,
        }
    }

    /// Builds an assignment from load data.
    pub fn from_data(data: AssignmentData) -> Self {
        Self::new(data.id, data.event_id, data.resource_id).with_units(data.units)
    }

    /// Sets the allocation.
    pub fn with_units(mut self, units: f64) -> Self {
        self.units = units;
        self
    }

    /// Record id.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// Event reference.
    pub fn event(&self) -> &Reference {
        &self.event
    }

    /// Resource reference.
    pub fn resource(&self) -> &Reference {
        &self.resource
    }

    /// Reference on one side.
    pub fn reference(&self, target: LinkTarget) -> &Reference {
        match target {
            LinkTarget::Event => &self.event,
            LinkTarget::Resource => &self.resource,
        }
    }

    /// Current event id (live or raw).
    pub fn event_id(&self) -> &RecordId {
        self.event.id()
    }

    /// Current resource id (live or raw).
    pub fn resource_id(&self) -> &RecordId {
        self.resource.id()
    }

    /// Whether both sides are linked.
    pub fn is_resolved(&self) -> bool {
        self.event.is_resolved() && self.resource.is_resolved()
    }

    /// Raw id from the ingested data.
    pub fn raw_id(&self, target: LinkTarget) -> &RecordId {
        match target {
            LinkTarget::Event => &self.raw_event_id,
            LinkTarget::Resource => &self.raw_resource_id,
        }
    }

    pub(crate) fn reference_mut(&mut self, target: LinkTarget) -> &mut Reference {
        match target {
            LinkTarget::Event => &mut self.event,
            LinkTarget::Resource => &mut self.resource,
        }
    }

    /// Links one side. Returns `false` if it already pointed at `link`.
    pub(crate) fn link(&mut self, target: LinkTarget, link: Link) -> bool {
        let slot = self.reference_mut(target);
        if matches!(slot, Reference::Resolved(current) if *current == link) {
            return false;
        }
        *slot = Reference::Resolved(link);
        true
    }

    /// Reverts one side to a raw id: `stale_id` when the caller knows the
    /// removed record's id, otherwise the id the link carried. Returns
    /// `false` if already unresolved.
    pub(crate) fn unlink(&mut self, target: LinkTarget, stale_id: Option<RecordId>) -> bool {
        let slot = self.reference_mut(target);
        let Reference::Resolved(link) = slot else {
            return false;
        };
        let raw = stale_id.unwrap_or_else(|| link.id.clone());
        *slot = Reference::Unresolved(raw);
        true
    }

    /// Rewrites the id carried by a live link after the target was re-keyed.
    pub(crate) fn retarget(&mut self, target: LinkTarget, key: EntityKey, id: &RecordId) -> bool {
        match self.reference_mut(target) {
            Reference::Resolved(link) if link.key == key && link.id != *id => {
                link.id = id.clone();
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(key: u64, id: i64) -> Link {
        Link {
            key: EntityKey(key),
            id: RecordId::from(id),
        }
    }

    #[test]
    fn test_new_assignment_is_unresolved() {
        let a = Assignment::new("A1", 42, "R1");
        assert!(!a.is_resolved());
        assert_eq!(a.event(), &Reference::Unresolved(RecordId::from(42)));
        assert_eq!(a.event_id(), &RecordId::from(42));
        assert_eq!(a.resource_id(), &RecordId::from("R1"));
        assert!((a.units - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_link_and_unlink() {
        let mut a = Assignment::new("A1", 42, "R1");
        assert!(a.link(LinkTarget::Event, link(1, 42)));
        assert!(!a.link(LinkTarget::Event, link(1, 42)));
        assert_eq!(a.event().key(), Some(EntityKey(1)));
        assert!(!a.is_resolved());

        assert!(a.unlink(LinkTarget::Event, Some(RecordId::from(43))));
        assert_eq!(a.event(), &Reference::Unresolved(RecordId::from(43)));
        assert!(!a.unlink(LinkTarget::Event, None));
    }

    #[test]
    fn test_unlink_prefers_live_id_over_raw() {
        let mut a = Assignment::new("A1", 42, "R1");
        a.link(LinkTarget::Event, link(1, 99));
        a.unlink(LinkTarget::Event, None);
        assert_eq!(a.event_id(), &RecordId::from(99));
        assert_eq!(a.raw_id(LinkTarget::Event), &RecordId::from(42));
    }

    #[test]
    fn test_link_target_store() {
        assert_eq!(LinkTarget::Event.store(), StoreKind::Event);
        assert_eq!(LinkTarget::Resource.store(), StoreKind::Resource);
    }
}
