//! Two-slot field values and the per-entity transaction buffer.
//!
//! A [`Field`] holds the committed value and, while a transaction is open,
//! a proposed value. Readers use [`Field::effective`]. The
//! [`FieldTransaction`] carries what the slots can't: the policy flags
//! supplied with the proposals and the derived values computed from them.

use crate::engine::Reconciled;
use crate::error::RangeError;

/// Committed value plus an optional proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    committed: T,
    proposed: Option<T>,
}

impl<T: Clone + PartialEq> Field<T> {
    /// Creates a field with a committed value and no proposal.
    pub fn new(committed: T) -> Self {
        Self {
            committed,
            proposed: None,
        }
    }

    /// Last committed value.
    pub fn committed(&self) -> &T {
        &self.committed
    }

    /// Pending proposal, if any.
    pub fn proposed(&self) -> Option<&T> {
        self.proposed.as_ref()
    }

    /// Proposed value if present, otherwise the committed one.
    pub fn effective(&self) -> &T {
        self.proposed.as_ref().unwrap_or(&self.committed)
    }

    /// Stages a value. Overwrites any previous proposal.
    pub fn propose(&mut self, value: T) {
        self.proposed = Some(value);
    }

    /// Whether a proposal is staged (even one equal to the committed value).
    pub fn is_proposed(&self) -> bool {
        self.proposed.is_some()
    }

    /// Whether the staged proposal differs from the committed value.
    pub fn is_changed(&self) -> bool {
        matches!(&self.proposed, Some(value) if *value != self.committed)
    }

    /// Writes `value` as committed and drops the proposal.
    ///
    /// Returns `true` if the committed value changed.
    pub fn commit(&mut self, value: T) -> bool {
        self.proposed = None;
        if self.committed == value {
            return false;
        }
        self.committed = value;
        true
    }

    /// Moves the committed value into the proposal slot, leaving `empty`
    /// committed. Used when a record joins a project so its initial values
    /// go through the same normalization as a live edit.
    pub(crate) fn restage(&mut self, empty: T) {
        let value = std::mem::replace(&mut self.committed, empty);
        if value != self.committed {
            self.proposed = Some(value);
        }
    }

    /// Drops the proposal.
    pub fn discard(&mut self) {
        self.proposed = None;
    }
}

impl<T: Default + Clone + PartialEq> Default for Field<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Policy flags and derived values for one entity's open batch.
///
/// Multiple proposals coalesce: the last supplied policy flag wins.
#[derive(Debug, Clone, Default)]
pub struct FieldTransaction {
    keep_duration: Option<bool>,
    keep_start: Option<bool>,
    preview: Option<Result<Reconciled, RangeError>>,
}

impl FieldTransaction {
    /// Records the `keep_duration` flag of a start/end proposal.
    pub fn set_keep_duration(&mut self, keep: bool) {
        self.keep_duration = Some(keep);
    }

    /// Records the `keep_start` flag of a duration proposal.
    pub fn set_keep_start(&mut self, keep: bool) {
        self.keep_start = Some(keep);
    }

    /// Last supplied `keep_duration`, defaulting to `true`.
    pub fn keep_duration(&self) -> bool {
        self.keep_duration.unwrap_or(true)
    }

    /// Last supplied `keep_start`, defaulting to `true`.
    pub fn keep_start(&self) -> bool {
        self.keep_start.unwrap_or(true)
    }

    /// Derived values computed from the current proposals.
    pub fn preview(&self) -> Option<&Result<Reconciled, RangeError>> {
        self.preview.as_ref()
    }

    pub(crate) fn set_preview(&mut self, preview: Option<Result<Reconciled, RangeError>>) {
        self.preview = preview;
    }

    /// Clears flags and derived values.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_slots() {
        let mut field = Field::new(1);
        assert_eq!(*field.effective(), 1);
        assert!(!field.is_proposed());

        field.propose(1);
        assert!(field.is_proposed());
        assert!(!field.is_changed());

        field.propose(2);
        assert_eq!(*field.effective(), 2);
        assert_eq!(*field.committed(), 1);
        assert!(field.is_changed());

        assert!(field.commit(2));
        assert_eq!(field.proposed(), None);
        assert!(!field.commit(2));
    }

    #[test]
    fn test_field_restage() {
        let mut field = Field::new(Some(5));
        field.restage(None);
        assert_eq!(*field.committed(), None);
        assert_eq!(field.proposed(), Some(&Some(5)));

        let mut empty: Field<Option<i32>> = Field::default();
        empty.restage(None);
        assert!(!empty.is_proposed());
    }

    #[test]
    fn test_field_discard() {
        let mut field = Field::new("a");
        field.propose("b");
        field.discard();
        assert_eq!(*field.effective(), "a");
    }

    #[test]
    fn test_transaction_last_flag_wins() {
        let mut tx = FieldTransaction::default();
        assert!(tx.keep_duration());
        tx.set_keep_duration(false);
        tx.set_keep_duration(true);
        assert!(tx.keep_duration());
        tx.set_keep_start(false);
        assert!(!tx.keep_start());

        tx.clear();
        assert!(tx.keep_start());
        assert!(tx.preview().is_none());
    }
}
