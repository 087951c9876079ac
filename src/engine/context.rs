//! Capabilities threaded through reconciliation.

use std::sync::Arc;

use crate::config::DEFAULT_MAX_CALENDAR_RANGE_MS;
use crate::error::RangeError;
use crate::time::{DateArithmetic, PlainArithmetic};

use super::reconcile::ChangedFields;

/// Per-commit state handed to every reconciling entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionContext {
    generation: u64,
    is_initial_commit: bool,
    max_calendar_range_ms: i64,
}

impl TransactionContext {
    /// Creates the context of commit number `generation`.
    pub fn new(generation: u64, is_initial_commit: bool, max_calendar_range_ms: i64) -> Self {
        Self {
            generation,
            is_initial_commit,
            max_calendar_range_ms,
        }
    }

    /// Commit sequence number, starting at 1.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this is the project's first commit.
    pub fn is_initial_commit(&self) -> bool {
        self.is_initial_commit
    }

    /// Largest permitted `end - start` span (ms).
    pub fn max_calendar_range_ms(&self) -> i64 {
        self.max_calendar_range_ms
    }
}

/// What an entity receives when it joins a project: the arithmetic it
/// reconciles with and the range bound for previews.
#[derive(Debug, Clone)]
pub struct ProjectAttachment {
    arithmetic: Arc<dyn DateArithmetic>,
    max_calendar_range_ms: i64,
}

impl ProjectAttachment {
    /// Creates an attachment.
    pub fn new(arithmetic: Arc<dyn DateArithmetic>, max_calendar_range_ms: i64) -> Self {
        Self {
            arithmetic,
            max_calendar_range_ms,
        }
    }

    /// Arithmetic used for this entity.
    pub fn arithmetic(&self) -> &dyn DateArithmetic {
        self.arithmetic.as_ref()
    }

    /// Range bound used for previews.
    pub fn max_calendar_range_ms(&self) -> i64 {
        self.max_calendar_range_ms
    }
}

impl Default for ProjectAttachment {
    /// Plain arithmetic and the default range, for entities outside a project.
    fn default() -> Self {
        Self::new(Arc::new(PlainArithmetic), DEFAULT_MAX_CALENDAR_RANGE_MS)
    }
}

/// Net effect of one committed reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldDelta {
    pub fields: ChangedFields,
    pub duration_unit: bool,
    /// Set when the pass normalized the values the entity joined with.
    pub initial: bool,
}

impl FieldDelta {
    /// Whether no field changed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.duration_unit
    }
}

/// An entity whose start/end/duration are kept consistent at commit.
pub trait DateReconciling {
    /// Whether proposals are staged.
    fn is_dirty(&self) -> bool;

    /// Reconciles staged proposals and commits the result.
    ///
    /// Returns the committed delta (`None` when nothing changed). On error
    /// the proposals stay staged and the entity stays dirty.
    fn reconcile(&mut self, ctx: &TransactionContext) -> Result<Option<FieldDelta>, RangeError>;
}
