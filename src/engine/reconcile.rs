//! Start/end/duration reconciliation.
//!
//! Given the fields changed in one transaction and the current-or-proposed
//! value of each, decides which single field is derived from the other two
//! and computes it.
//!
//! # Decision Table
//!
//! | Changed | Policy | Action |
//! |---------|--------|--------|
//! | start | keep duration, or no end | calculate end |
//! | start | start > end | end := start, duration := 0 |
//! | start | start ≤ end | calculate duration |
//! | start := null | | end := null |
//! | end | keep duration, or no start | calculate start |
//! | end | end < start | start := end, duration := 0 |
//! | end | end ≥ start | calculate duration |
//! | end := null | | start := null |
//! | duration | keep start, or no end | calculate end (negative clamped to 0 when keeping start) |
//! | duration | otherwise | calculate start |
//! | duration := null | | end := null |
//! | start + end | both null | duration := null |
//! | start + end | otherwise | calculate duration |
//! | start + duration | | calculate end |
//! | end + duration | | calculate start |
//! | all three | | duration if null, else start if null, else end |
//!
//! A "keep" policy only applies while the kept field has a value: keeping a
//! missing duration would null the opposite date.
//!
//! # Arithmetic
//! end := start + duration, start := end − duration, duration :=
//! hour-diff(start, end), all through the entity's [`DateArithmetic`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::RangeError;
use crate::time::{DateArithmetic, DurationUnit, Timestamp, MS_PER_HOUR};

/// Values of the three linked fields.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScheduleTriple {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub duration: Option<f64>,
}

/// Staged proposals; `None` means "not proposed", `Some(None)` proposes null.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProposedTriple {
    pub start: Option<Option<Timestamp>>,
    pub end: Option<Option<Timestamp>>,
    pub duration: Option<Option<f64>>,
}

impl ProposedTriple {
    /// Whether anything is staged.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none() && self.duration.is_none()
    }
}

/// Which of the linked fields changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFields {
    pub start: bool,
    pub end: bool,
    pub duration: bool,
}

impl ChangedFields {
    /// Whether no field changed.
    pub fn is_empty(&self) -> bool {
        !(self.start || self.end || self.duration)
    }
}

/// Field derived by a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculatedField {
    Start,
    End,
    Duration,
}

/// Everything reconciliation needs from one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileInput {
    pub committed: ScheduleTriple,
    pub proposed: ProposedTriple,
    /// Duration unit after this transaction.
    pub unit: DurationUnit,
    /// A unit change counts as a duration change.
    pub unit_changed: bool,
    pub keep_duration: bool,
    pub keep_start: bool,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reconciled {
    /// Consistent values to commit.
    pub values: ScheduleTriple,
    /// Field derived from the other two, if any.
    pub calculated: Option<CalculatedField>,
    /// Changed set the decision was made on (after the no-op correction).
    pub trigger: ChangedFields,
}

/// Runs the decision table and computes the derived field.
///
/// # Errors
/// [`RangeError`] when a shift or the resulting span exceeds
/// `max_range_ms`, or the shifted date is not representable.
pub fn reconcile(
    input: &ReconcileInput,
    arithmetic: &dyn DateArithmetic,
    max_range_ms: i64,
) -> Result<Reconciled, RangeError> {
    let committed = input.committed;
    let proposed = input.proposed;

    let mut values = ScheduleTriple {
        start: proposed.start.unwrap_or(committed.start),
        end: proposed.end.unwrap_or(committed.end),
        duration: proposed.duration.unwrap_or(committed.duration),
    };

    let mut changed = ChangedFields {
        start: proposed.start.is_some_and(|v| v != committed.start),
        end: proposed.end.is_some_and(|v| v != committed.end),
        duration: proposed.duration.is_some_and(|v| v != committed.duration)
            || input.unit_changed,
    };

    // An end supplied alongside a moved start (or alongside a duration) must
    // take part in the decision even when it equals the committed end,
    // otherwise the stale duration survives.
    if proposed.end.is_some() && !changed.end {
        let start_end_pair = proposed.start.is_some() && proposed.duration.is_none() && changed.start;
        let duration_end_pair =
            proposed.duration.is_some() && proposed.start.is_none() && changed.duration;
        if start_end_pair || duration_end_pair {
            changed.end = true;
        }
    }

    let calculated = decide(&mut values, changed, input);
    trace!(?changed, ?calculated, "reconcile decision");

    match calculated {
        Some(CalculatedField::End) => {
            values.end = match (values.start, values.duration) {
                (Some(start), Some(duration)) => Some(shift(
                    arithmetic,
                    start,
                    duration,
                    input.unit,
                    max_range_ms,
                )?),
                _ => None,
            };
        }
        Some(CalculatedField::Start) => {
            values.start = match (values.end, values.duration) {
                (Some(end), Some(duration)) => Some(shift(
                    arithmetic,
                    end,
                    -duration,
                    input.unit,
                    max_range_ms,
                )?),
                _ => None,
            };
        }
        Some(CalculatedField::Duration) => {
            values.duration = match (values.start, values.end) {
                (Some(start), Some(end)) => Some(arithmetic.diff(start, end, input.unit)),
                _ => None,
            };
        }
        None => {}
    }

    if let (Some(start), Some(end)) = (values.start, values.end) {
        let span = (end - start).num_milliseconds().saturating_abs();
        if span > max_range_ms {
            return Err(RangeError::new(span, max_range_ms));
        }
    }

    Ok(Reconciled {
        values,
        calculated,
        trigger: changed,
    })
}

/// Picks the field to calculate, applying the table's direct assignments
/// (null propagation, collapse to zero duration) to `values`.
fn decide(
    values: &mut ScheduleTriple,
    changed: ChangedFields,
    input: &ReconcileInput,
) -> Option<CalculatedField> {
    use CalculatedField::{Duration, End, Start};

    match (changed.start, changed.end, changed.duration) {
        (true, false, false) => {
            let Some(start) = values.start else {
                values.end = None;
                return None;
            };
            let keep = input.keep_duration && values.duration.is_some();
            match values.end {
                Some(end) if !keep => {
                    if start > end {
                        values.end = Some(start);
                        values.duration = Some(0.0);
                        None
                    } else {
                        Some(Duration)
                    }
                }
                _ => Some(End),
            }
        }
        (false, true, false) => {
            let Some(end) = values.end else {
                values.start = None;
                return None;
            };
            let keep = input.keep_duration && values.duration.is_some();
            match values.start {
                Some(start) if !keep => {
                    if end < start {
                        values.start = Some(end);
                        values.duration = Some(0.0);
                        None
                    } else {
                        Some(Duration)
                    }
                }
                _ => Some(Start),
            }
        }
        (false, false, true) => {
            let Some(duration) = values.duration else {
                // A unit switch on a missing duration leaves the dates alone.
                if input.committed.duration.is_some() {
                    values.end = None;
                }
                return None;
            };
            let keep = input.keep_start && values.start.is_some();
            if keep || values.end.is_none() {
                if keep && duration < 0.0 {
                    values.duration = Some(0.0);
                }
                Some(End)
            } else {
                Some(Start)
            }
        }
        (true, true, false) => {
            if values.start.is_none() && values.end.is_none() {
                values.duration = None;
                None
            } else {
                Some(Duration)
            }
        }
        (true, false, true) => Some(End),
        (false, true, true) => Some(Start),
        (true, true, true) => {
            if values.duration.is_none() {
                Some(Duration)
            } else if values.start.is_none() {
                Some(Start)
            } else {
                Some(End)
            }
        }
        (false, false, false) => None,
    }
}

fn shift(
    arithmetic: &dyn DateArithmetic,
    date: Timestamp,
    amount: f64,
    unit: DurationUnit,
    max_range_ms: i64,
) -> Result<Timestamp, RangeError> {
    let span = (unit.to_hours(amount) * MS_PER_HOUR as f64).abs();
    // `as` saturates, so huge or infinite spans report as i64::MAX.
    let span_ms = span as i64;
    if !span.is_finite() || span_ms > max_range_ms {
        return Err(RangeError::new(span_ms, max_range_ms));
    }
    arithmetic
        .add(date, amount, unit)
        .ok_or_else(|| RangeError::new(span_ms, max_range_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_CALENDAR_RANGE_MS;
    use crate::time::PlainArithmetic;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn committed(start: Option<u32>, end: Option<u32>, duration: Option<f64>) -> ScheduleTriple {
        ScheduleTriple {
            start: start.map(day),
            end: end.map(day),
            duration,
        }
    }

    fn input(committed: ScheduleTriple, proposed: ProposedTriple) -> ReconcileInput {
        ReconcileInput {
            committed,
            proposed,
            unit: DurationUnit::Day,
            unit_changed: false,
            keep_duration: true,
            keep_start: true,
        }
    }

    fn run(input: &ReconcileInput) -> Reconciled {
        reconcile(input, &PlainArithmetic, DEFAULT_MAX_CALENDAR_RANGE_MS).unwrap()
    }

    #[test]
    fn test_start_only_keeps_duration() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(Some(day(3))),
                ..Default::default()
            },
        ));
        assert_eq!(result.calculated, Some(CalculatedField::End));
        assert_eq!(result.values.end, Some(day(7)));
        assert_eq!(result.values.duration, Some(4.0));
    }

    #[test]
    fn test_start_only_past_end_collapses() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let mut inp = input(
            base,
            ProposedTriple {
                start: Some(Some(day(10))),
                ..Default::default()
            },
        );
        inp.keep_duration = false;
        let result = run(&inp);
        assert_eq!(result.calculated, None);
        assert_eq!(result.values.end, Some(day(10)));
        assert_eq!(result.values.duration, Some(0.0));
    }

    #[test]
    fn test_start_only_before_end_recomputes_duration() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let mut inp = input(
            base,
            ProposedTriple {
                start: Some(Some(day(2))),
                ..Default::default()
            },
        );
        inp.keep_duration = false;
        let result = run(&inp);
        assert_eq!(result.calculated, Some(CalculatedField::Duration));
        assert_eq!(result.values.duration, Some(3.0));
        assert_eq!(result.values.end, Some(day(5)));
    }

    #[test]
    fn test_null_start_nulls_end() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(None),
                ..Default::default()
            },
        ));
        assert_eq!(result.values.start, None);
        assert_eq!(result.values.end, None);
        assert_eq!(result.values.duration, Some(4.0));
    }

    #[test]
    fn test_end_only_variants() {
        let base = committed(Some(5), Some(10), Some(5.0));

        // Default for end proposals: don't keep duration → recompute it.
        let mut inp = input(
            base,
            ProposedTriple {
                end: Some(Some(day(12))),
                ..Default::default()
            },
        );
        inp.keep_duration = false;
        let result = run(&inp);
        assert_eq!(result.calculated, Some(CalculatedField::Duration));
        assert_eq!(result.values.duration, Some(7.0));

        // End before start → collapse.
        inp.proposed.end = Some(Some(day(2)));
        let result = run(&inp);
        assert_eq!(result.values.start, Some(day(2)));
        assert_eq!(result.values.duration, Some(0.0));

        // Keeping duration moves the start.
        inp.proposed.end = Some(Some(day(12)));
        inp.keep_duration = true;
        let result = run(&inp);
        assert_eq!(result.calculated, Some(CalculatedField::Start));
        assert_eq!(result.values.start, Some(day(7)));

        // Null end nulls start.
        inp.proposed.end = Some(None);
        let result = run(&inp);
        assert_eq!(result.values.start, None);
        assert_eq!(result.values.end, None);
    }

    #[test]
    fn test_duration_only_variants() {
        let base = committed(Some(1), Some(4), Some(3.0));

        let mut inp = input(
            base,
            ProposedTriple {
                duration: Some(Some(5.0)),
                ..Default::default()
            },
        );
        let result = run(&inp);
        assert_eq!(result.calculated, Some(CalculatedField::End));
        assert_eq!(result.values.end, Some(day(6)));

        inp.keep_start = false;
        let result = run(&inp);
        assert_eq!(result.calculated, Some(CalculatedField::Start));
        assert_eq!(
            result.values.start,
            Some(Utc.with_ymd_and_hms(2023, 12, 30, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_duration_only_negative_clamped() {
        let base = committed(Some(10), Some(12), Some(2.0));
        let result = run(&input(
            base,
            ProposedTriple {
                duration: Some(Some(-3.0)),
                ..Default::default()
            },
        ));
        assert_eq!(result.values.duration, Some(0.0));
        assert_eq!(result.values.end, Some(day(10)));
    }

    #[test]
    fn test_null_duration_nulls_end() {
        let base = committed(Some(1), Some(4), Some(3.0));
        let result = run(&input(
            base,
            ProposedTriple {
                duration: Some(None),
                ..Default::default()
            },
        ));
        assert_eq!(result.values.start, Some(day(1)));
        assert_eq!(result.values.end, None);
        assert_eq!(result.values.duration, None);
    }

    #[test]
    fn test_unit_switch_without_duration_keeps_dates() {
        let mut unit_only = input(committed(None, Some(4), None), ProposedTriple::default());
        unit_only.unit = DurationUnit::Hour;
        unit_only.unit_changed = true;

        let result = run(&unit_only);
        assert_eq!(result.values.end, Some(day(4)));
        assert_eq!(result.calculated, None);
    }

    #[test]
    fn test_pairs() {
        let base = committed(Some(1), Some(4), Some(3.0));

        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(Some(day(2))),
                end: Some(Some(day(8))),
                duration: None,
            },
        ));
        assert_eq!(result.calculated, Some(CalculatedField::Duration));
        assert_eq!(result.values.duration, Some(6.0));

        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(None),
                end: Some(None),
                duration: None,
            },
        ));
        assert_eq!(result.values.duration, None);

        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(Some(day(2))),
                end: None,
                duration: Some(Some(2.0)),
            },
        ));
        assert_eq!(result.values.end, Some(day(4)));

        let result = run(&input(
            base,
            ProposedTriple {
                start: None,
                end: Some(Some(day(9))),
                duration: Some(Some(2.0)),
            },
        ));
        assert_eq!(result.values.start, Some(day(7)));
    }

    #[test]
    fn test_all_three_changed() {
        let base = committed(Some(1), Some(4), Some(3.0));
        let all = |start, end, duration| ProposedTriple {
            start: Some(start),
            end: Some(end),
            duration: Some(duration),
        };

        let result = run(&input(base, all(Some(day(2)), Some(day(5)), None)));
        assert_eq!(result.calculated, Some(CalculatedField::Duration));
        assert_eq!(result.values.duration, Some(3.0));

        let result = run(&input(base, all(None, Some(day(10)), Some(2.0))));
        assert_eq!(result.calculated, Some(CalculatedField::Start));
        assert_eq!(result.values.start, Some(day(8)));

        let result = run(&input(base, all(Some(day(2)), Some(day(30)), Some(1.0))));
        assert_eq!(result.calculated, Some(CalculatedField::End));
        assert_eq!(result.values.end, Some(day(3)));
    }

    #[test]
    fn test_unchanged_end_with_moved_start_recomputes_duration() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(Some(day(3))),
                end: Some(Some(day(5))),
                duration: None,
            },
        ));
        assert!(result.trigger.end);
        assert_eq!(result.calculated, Some(CalculatedField::Duration));
        assert_eq!(result.values.end, Some(day(5)));
        assert_eq!(result.values.duration, Some(2.0));
    }

    #[test]
    fn test_unchanged_end_with_new_duration_moves_start() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let result = run(&input(
            base,
            ProposedTriple {
                start: None,
                end: Some(Some(day(5))),
                duration: Some(Some(1.0)),
            },
        ));
        assert_eq!(result.calculated, Some(CalculatedField::Start));
        assert_eq!(result.values.start, Some(day(4)));
        assert_eq!(result.values.end, Some(day(5)));
    }

    #[test]
    fn test_unchanged_duration_and_end_is_noop() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let result = run(&input(
            base,
            ProposedTriple {
                start: None,
                end: Some(Some(day(5))),
                duration: Some(Some(4.0)),
            },
        ));
        assert!(result.trigger.is_empty());
        assert_eq!(result.calculated, None);
        assert_eq!(result.values, base);
    }

    #[test]
    fn test_unchanged_end_alone_is_noop() {
        let base = committed(Some(1), Some(5), Some(4.0));
        let result = run(&input(
            base,
            ProposedTriple {
                end: Some(Some(day(5))),
                ..Default::default()
            },
        ));
        assert!(result.trigger.is_empty());
        assert_eq!(result.calculated, None);
        assert_eq!(result.values, base);
    }

    #[test]
    fn test_keep_without_duration_does_not_erase_end() {
        // Only an end is known; a new start can't keep a missing duration.
        let base = committed(None, Some(10), None);
        let result = run(&input(
            base,
            ProposedTriple {
                start: Some(Some(day(4))),
                ..Default::default()
            },
        ));
        assert_eq!(result.calculated, Some(CalculatedField::Duration));
        assert_eq!(result.values.end, Some(day(10)));
        assert_eq!(result.values.duration, Some(6.0));
    }

    #[test]
    fn test_range_error() {
        let base = committed(Some(1), Some(2), Some(1.0));
        let inp = input(
            base,
            ProposedTriple {
                duration: Some(Some(10.0)),
                ..Default::default()
            },
        );
        let err = reconcile(&inp, &PlainArithmetic, 5 * 24 * MS_PER_HOUR).unwrap_err();
        assert_eq!(err.max_ms, 5 * 24 * MS_PER_HOUR);
        assert_eq!(err.span_ms, 10 * 24 * MS_PER_HOUR);

        let pair = input(
            base,
            ProposedTriple {
                start: Some(Some(day(1))),
                end: Some(Some(day(20))),
                duration: None,
            },
        );
        assert!(reconcile(&pair, &PlainArithmetic, 5 * 24 * MS_PER_HOUR).is_err());
    }
}
