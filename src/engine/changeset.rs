//! Commit results published to observers.

use serde::{Deserialize, Serialize};

use crate::error::RangeError;
use crate::models::{LinkTarget, RecordId};
use crate::time::{DurationUnit, Timestamp};

use super::ChangedFields;

/// Commit pipeline state.
///
/// `Idle → Dirty → Reconciling → Resolving → Committed → Idle`. A commit
/// runs the last three under one exclusive borrow, so from the outside a
/// project is only ever observed as `Idle` or `Dirty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitPhase {
    Idle,
    Dirty,
    Reconciling,
    Resolving,
    Committed,
}

/// Net change of one event in a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityChange {
    pub entity_id: RecordId,
    pub changed_fields: ChangedFields,
    /// Whether the duration unit changed.
    pub duration_unit_changed: bool,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub duration: Option<f64>,
    pub duration_unit: DurationUnit,
}

/// A link that resolved or reverted to its raw id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationChange {
    pub assignment_id: RecordId,
    pub target: LinkTarget,
    pub resolved: bool,
}

impl RelationChange {
    /// Creates a relation change.
    pub fn new(assignment_id: RecordId, target: LinkTarget, resolved: bool) -> Self {
        Self {
            assignment_id,
            target,
            resolved,
        }
    }
}

/// Everything one commit changed, in a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Commit sequence number.
    pub generation: u64,
    /// Whether this was the project's first commit.
    pub initial: bool,
    pub entities: Vec<EntityChange>,
    pub relations: Vec<RelationChange>,
}

impl ChangeSet {
    /// Whether the change-set carries nothing.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Change of one event, if it changed.
    pub fn entity(&self, id: &RecordId) -> Option<&EntityChange> {
        self.entities.iter().find(|change| &change.entity_id == id)
    }
}

/// An event whose proposals could not be committed.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedEdit {
    pub entity_id: RecordId,
    pub error: RangeError,
}

/// Result of [`Project::commit`](super::Project::commit).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitOutcome {
    /// Published change-set; `None` when nothing changed.
    pub change_set: Option<ChangeSet>,
    /// Events left dirty by a range error.
    pub rejected: Vec<RejectedEdit>,
}

impl CommitOutcome {
    /// Whether the commit changed nothing and rejected nothing.
    pub fn is_noop(&self) -> bool {
        self.change_set.is_none() && self.rejected.is_empty()
    }
}

/// Appends relation changes, keeping only the latest state per link.
pub(crate) fn merge_relations(pending: &mut Vec<RelationChange>, changes: Vec<RelationChange>) {
    for change in changes {
        pending.retain(|p| p.assignment_id != change.assignment_id || p.target != change.target);
        pending.push(change);
    }
}
