//! Engine error types.
//!
//! Reconciliation edge cases (start after end, null propagation) are
//! policy outcomes, not errors. Only malformed input and spans beyond the
//! project's calendar range surface here. An assignment whose event or
//! resource has not loaded yet is a soft state (`None` on lookup).

use thiserror::Error;

use crate::models::{RecordId, StoreKind};
use crate::validation::ValidationError;

/// Result alias used across the crate.
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// A date range that would exceed the project's permitted calendar range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("date range of {span_ms} ms exceeds the permitted calendar range of {max_ms} ms")]
pub struct RangeError {
    /// Span that was requested (ms, saturated to `i64`).
    pub span_ms: i64,
    /// Configured maximum (ms).
    pub max_ms: i64,
}

impl RangeError {
    /// Creates a range error for a requested span.
    pub fn new(span_ms: i64, max_ms: i64) -> Self {
        Self { span_ms, max_ms }
    }
}

/// Errors returned by project and store operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulingError {
    /// Malformed input rejected at the proposal boundary.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Loaded data failed one or more integrity checks.
    #[error("project data rejected with {} validation error(s)", .0.len())]
    InvalidData(Vec<ValidationError>),
    /// Resulting span exceeds the calendar range.
    #[error(transparent)]
    Range(#[from] RangeError),
    /// No record with this id in the store.
    #[error("{store} record '{id}' does not exist")]
    UnknownRecord { store: StoreKind, id: RecordId },
    /// A record with this id is already in the store.
    #[error("{store} record '{id}' already exists")]
    DuplicateId { store: StoreKind, id: RecordId },
}

impl SchedulingError {
    pub(crate) fn unknown(store: StoreKind, id: &RecordId) -> Self {
        Self::UnknownRecord {
            store,
            id: id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_error_messages() {
        let err = SchedulingError::from(RangeError::new(10, 5));
        assert_eq!(
            err.to_string(),
            "date range of 10 ms exceeds the permitted calendar range of 5 ms"
        );

        let err = SchedulingError::unknown(StoreKind::Event, &RecordId::from(42));
        assert_eq!(err.to_string(), "event record '42' does not exist");

        let err = SchedulingError::InvalidData(vec![ValidationError::new(
            ValidationErrorKind::DuplicateId,
            "Duplicate event ID: 1",
        )]);
        assert!(err.to_string().contains("1 validation error"));
    }
}
