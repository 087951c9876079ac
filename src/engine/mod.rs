//! Reconciliation and the commit pipeline.
//!
//! # Components
//!
//! - [`reconcile()`]: pure start/end/duration decision table
//! - [`TransactionContext`] / [`ProjectAttachment`]: capabilities threaded
//!   through reconciliation instead of ambient flags
//! - [`Project`]: stores plus the `reconcile → resolve → publish` pipeline
//! - [`SharedProject`]: async handle with serialized commits and a
//!   change-set broadcast

mod changeset;
mod context;
mod project;
mod reconcile;
mod shared;

pub use changeset::{
    ChangeSet, CommitOutcome, CommitPhase, EntityChange, RejectedEdit, RelationChange,
};
pub use context::{DateReconciling, FieldDelta, ProjectAttachment, TransactionContext};
pub use project::Project;
pub use reconcile::{
    reconcile, CalculatedField, ChangedFields, ProposedTriple, ReconcileInput, Reconciled,
    ScheduleTriple,
};
pub use shared::SharedProject;
