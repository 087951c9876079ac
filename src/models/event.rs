//! Event (schedulable entity) model.
//!
//! An event owns a start date, an end date and a duration in a declared
//! unit. Edits are staged with `propose_*` and reconciled at commit so the
//! three always form a consistent triple.
//!
//! # Defaults
//!
//! | Proposal | Policy flag | Conventional default |
//! |----------|-------------|----------------------|
//! | `propose_start` | `keep_duration` | `true` |
//! | `propose_end` | `keep_duration` | `false` |
//! | `propose_duration` | `keep_start` | `true` |
//!
//! # Visibility
//! Getters return the current-or-proposed value, including the field
//! derived from the staged proposals, before the commit completes.

use crate::engine::{
    reconcile, DateReconciling, FieldDelta, ProjectAttachment, ProposedTriple, ReconcileInput,
    Reconciled, ScheduleTriple, TransactionContext,
};
use crate::error::RangeError;
use crate::time::{check_date, check_duration, DurationUnit, Timestamp};
use crate::validation::ValidationError;

use super::{EventData, Field, FieldTransaction, RecordId};

/// A schedulable event.
#[derive(Debug, Clone)]
pub struct Event {
    id: RecordId,
    /// Display name.
    pub name: String,
    start: Field<Option<Timestamp>>,
    end: Field<Option<Timestamp>>,
    duration: Field<Option<f64>>,
    duration_unit: Field<DurationUnit>,
    calendar: Option<RecordId>,
    transaction: FieldTransaction,
    attachment: ProjectAttachment,
    /// Values staged on joining a project, until the first successful
    /// reconciliation.
    initial: Option<ScheduleTriple>,
}

impl Event {
    /// Creates an event with no dates and a duration unit of days.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            start: Field::new(None),
            end: Field::new(None),
            duration: Field::new(None),
            duration_unit: Field::new(DurationUnit::Day),
            calendar: None,
            transaction: FieldTransaction::default(),
            attachment: ProjectAttachment::default(),
            initial: None,
        }
    }

    /// Builds an event from load data.
    pub fn from_data(data: EventData, default_unit: DurationUnit) -> Self {
        let mut event = Self::new(data.id).with_name(data.name);
        event.start = Field::new(data.start_date);
        event.end = Field::new(data.end_date);
        event.duration = Field::new(data.duration);
        event.duration_unit = Field::new(data.duration_unit.unwrap_or(default_unit));
        event.calendar = data.calendar;
        event
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the initial start date.
    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start = Field::new(Some(start));
        self
    }

    /// Sets the initial end date.
    pub fn with_end(mut self, end: Timestamp) -> Self {
        self.end = Field::new(Some(end));
        self
    }

    /// Sets the initial duration and its unit.
    pub fn with_duration(mut self, duration: f64, unit: DurationUnit) -> Self {
        self.duration = Field::new(Some(duration));
        self.duration_unit = Field::new(unit);
        self
    }

    /// References a calendar by id.
    pub fn with_calendar(mut self, calendar: impl Into<RecordId>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    /// Record id.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// Referenced calendar id.
    pub fn calendar(&self) -> Option<&RecordId> {
        self.calendar.as_ref()
    }

    pub(crate) fn set_calendar(&mut self, calendar: Option<RecordId>) {
        self.calendar = calendar;
    }

    /// Current-or-proposed start date.
    pub fn start(&self) -> Option<Timestamp> {
        self.derived().map_or(*self.start.effective(), |r| r.values.start)
    }

    /// Current-or-proposed end date.
    pub fn end(&self) -> Option<Timestamp> {
        self.derived().map_or(*self.end.effective(), |r| r.values.end)
    }

    /// Current-or-proposed duration, in [`Event::duration_unit`].
    pub fn duration(&self) -> Option<f64> {
        self.derived().map_or(*self.duration.effective(), |r| r.values.duration)
    }

    /// Current-or-proposed duration unit.
    pub fn duration_unit(&self) -> DurationUnit {
        *self.duration_unit.effective()
    }

    /// Last committed values.
    pub fn committed(&self) -> ScheduleTriple {
        ScheduleTriple {
            start: *self.start.committed(),
            end: *self.end.committed(),
            duration: *self.duration.committed(),
        }
    }

    /// Open transaction buffer.
    pub fn transaction(&self) -> &FieldTransaction {
        &self.transaction
    }

    /// Stages a new start date.
    ///
    /// # Errors
    /// [`ValidationError`] for dates outside the supported window; nothing
    /// is staged in that case.
    pub fn propose_start(
        &mut self,
        start: Option<Timestamp>,
        keep_duration: bool,
    ) -> Result<(), ValidationError> {
        if let Some(date) = start {
            check_date(date)?;
        }
        self.start.propose(start);
        self.transaction.set_keep_duration(keep_duration);
        self.refresh_preview();
        Ok(())
    }

    /// Stages a new end date.
    pub fn propose_end(
        &mut self,
        end: Option<Timestamp>,
        keep_duration: bool,
    ) -> Result<(), ValidationError> {
        if let Some(date) = end {
            check_date(date)?;
        }
        self.end.propose(end);
        self.transaction.set_keep_duration(keep_duration);
        self.refresh_preview();
        Ok(())
    }

    /// Stages a new duration, optionally in a new unit.
    pub fn propose_duration(
        &mut self,
        duration: Option<f64>,
        unit: Option<DurationUnit>,
        keep_start: bool,
    ) -> Result<(), ValidationError> {
        if let Some(value) = duration {
            check_duration(value)?;
        }
        self.duration.propose(duration);
        if let Some(unit) = unit {
            self.duration_unit.propose(unit);
        }
        self.transaction.set_keep_start(keep_start);
        self.refresh_preview();
        Ok(())
    }

    /// Stages both dates at once; the duration is derived from them.
    pub fn propose_start_end(
        &mut self,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> Result<(), ValidationError> {
        for date in [start, end].into_iter().flatten() {
            check_date(date)?;
        }
        self.start.propose(start);
        self.end.propose(end);
        self.refresh_preview();
        Ok(())
    }

    /// Switches the duration unit, converting the duration so neither date
    /// moves.
    pub fn propose_duration_unit(&mut self, unit: DurationUnit) {
        let current = self.duration_unit();
        if let Some(value) = *self.duration.effective() {
            self.duration.propose(Some(current.convert(value, unit)));
        }
        self.duration_unit.propose(unit);
        self.refresh_preview();
    }

    /// Drops every staged proposal. Initial values that have not been
    /// normalized yet are staged again.
    pub fn discard_proposals(&mut self) {
        self.start.discard();
        self.end.discard();
        self.duration.discard();
        self.duration_unit.discard();
        self.transaction.clear();
        if let Some(initial) = self.initial {
            self.propose_initial(initial);
        }
    }

    /// Binds the event to a project's arithmetic.
    pub(crate) fn attach(&mut self, attachment: ProjectAttachment) {
        self.attachment = attachment;
        self.refresh_preview();
    }

    /// Arithmetic the event reconciles with.
    pub fn attachment(&self) -> &ProjectAttachment {
        &self.attachment
    }

    /// Moves the initial values into the proposal slots so the first commit
    /// normalizes them like a live edit.
    pub(crate) fn stage_initial_values(&mut self) {
        let initial = self.committed();
        self.start.restage(None);
        self.end.restage(None);
        self.duration.restage(None);
        self.initial = Some(initial);
        self.refresh_preview();
    }

    fn propose_initial(&mut self, initial: ScheduleTriple) {
        if initial.start.is_some() {
            self.start.propose(initial.start);
        }
        if initial.end.is_some() {
            self.end.propose(initial.end);
        }
        if initial.duration.is_some() {
            self.duration.propose(initial.duration);
        }
        self.refresh_preview();
    }

    fn reconcile_input(&self) -> ReconcileInput {
        ReconcileInput {
            committed: self.committed(),
            proposed: ProposedTriple {
                start: self.start.proposed().copied(),
                end: self.end.proposed().copied(),
                duration: self.duration.proposed().copied(),
            },
            unit: self.duration_unit(),
            unit_changed: self.duration_unit.is_changed(),
            keep_duration: self.transaction.keep_duration(),
            keep_start: self.transaction.keep_start(),
        }
    }

    fn derived(&self) -> Option<&Reconciled> {
        self.transaction.preview().and_then(|preview| preview.as_ref().ok())
    }

    fn refresh_preview(&mut self) {
        let preview = self.is_dirty().then(|| {
            reconcile(
                &self.reconcile_input(),
                self.attachment.arithmetic(),
                self.attachment.max_calendar_range_ms(),
            )
        });
        self.transaction.set_preview(preview);
    }
}

impl DateReconciling for Event {
    fn is_dirty(&self) -> bool {
        self.start.is_proposed()
            || self.end.is_proposed()
            || self.duration.is_proposed()
            || self.duration_unit.is_proposed()
    }

    fn reconcile(&mut self, ctx: &TransactionContext) -> Result<Option<FieldDelta>, RangeError> {
        if !self.is_dirty() {
            return Ok(None);
        }
        let reconciled = reconcile(
            &self.reconcile_input(),
            self.attachment.arithmetic(),
            ctx.max_calendar_range_ms(),
        )?;

        let unit = self.duration_unit();
        let mut delta = FieldDelta::default();
        delta.fields.start = self.start.commit(reconciled.values.start);
        delta.fields.end = self.end.commit(reconciled.values.end);
        delta.fields.duration = self.duration.commit(reconciled.values.duration);
        delta.duration_unit = self.duration_unit.commit(unit);
        delta.initial = self.initial.take().is_some();
        self.transaction.clear();

        Ok((!delta.is_empty()).then_some(delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_CALENDAR_RANGE_MS;
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn ctx() -> TransactionContext {
        TransactionContext::new(1, false, DEFAULT_MAX_CALENDAR_RANGE_MS)
    }

    fn committed_event() -> Event {
        let mut event = Event::new(1)
            .with_start(day(1))
            .with_duration(3.0, DurationUnit::Day);
        event.stage_initial_values();
        event.reconcile(&ctx()).unwrap();
        event
    }

    #[test]
    fn test_initial_values_are_normalized() {
        let event = committed_event();
        assert!(!event.is_dirty());
        assert_eq!(event.committed().end, Some(day(4)));
        assert_eq!(event.end(), Some(day(4)));
    }

    #[test]
    fn test_pre_commit_visibility() {
        let mut event = committed_event();
        event.propose_start(Some(day(10)), true).unwrap();
        event.propose_duration(Some(2.0), None, true).unwrap();

        assert_eq!(event.end(), Some(day(12)));
        assert_eq!(event.committed().end, Some(day(4)));
    }

    #[test]
    fn test_commit_reports_delta() {
        let mut event = committed_event();
        event.propose_duration(Some(5.0), None, true).unwrap();
        let delta = event.reconcile(&ctx()).unwrap().unwrap();

        assert!(delta.fields.end && delta.fields.duration);
        assert!(!delta.fields.start);
        assert_eq!(event.end(), Some(day(6)));
        assert!(event.transaction().preview().is_none());
    }

    #[test]
    fn test_same_value_proposal_is_noop() {
        let mut event = committed_event();
        event.propose_start(Some(day(1)), true).unwrap();
        assert!(event.is_dirty());
        assert_eq!(event.reconcile(&ctx()).unwrap(), None);
        assert!(!event.is_dirty());
    }

    #[test]
    fn test_invalid_date_leaves_proposal_untouched() {
        let mut event = committed_event();
        event.propose_start(Some(day(2)), true).unwrap();

        let far = Utc.with_ymd_and_hms(10_001, 1, 1, 0, 0, 0).unwrap();
        assert!(event.propose_start(Some(far), true).is_err());
        assert!(event.propose_duration(Some(f64::NAN), None, true).is_err());

        assert_eq!(event.start(), Some(day(2)));
        assert_eq!(event.end(), Some(day(5)));
    }

    #[test]
    fn test_duration_unit_switch_keeps_dates() {
        let mut event = committed_event();
        event.propose_duration_unit(DurationUnit::Hour);
        assert_eq!(event.duration(), Some(72.0));

        let delta = event.reconcile(&ctx()).unwrap().unwrap();
        assert!(delta.duration_unit && delta.fields.duration);
        assert!(!delta.fields.end);
        assert_eq!(event.end(), Some(day(4)));
        assert_eq!(event.duration_unit(), DurationUnit::Hour);
    }

    #[test]
    fn test_duration_with_new_unit() {
        let mut event = committed_event();
        event
            .propose_duration(Some(12.0), Some(DurationUnit::Hour), true)
            .unwrap();
        event.reconcile(&ctx()).unwrap();
        assert_eq!(
            event.end(),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_range_error_keeps_event_dirty() {
        let mut event = committed_event();
        event.propose_duration(Some(10.0), Some(DurationUnit::Year), true).unwrap();
        assert!(matches!(event.transaction().preview(), Some(Err(_))));
        // The getter falls back to the staged value.
        assert_eq!(event.duration(), Some(10.0));

        assert!(event.reconcile(&ctx()).is_err());
        assert!(event.is_dirty());
        assert_eq!(event.committed().end, Some(day(4)));
    }

    #[test]
    fn test_discard_proposals() {
        let mut event = committed_event();
        event.propose_end(Some(day(20)), false).unwrap();
        event.discard_proposals();
        assert!(!event.is_dirty());
        assert_eq!(event.end(), Some(day(4)));
    }

    #[test]
    fn test_discard_before_first_commit_restages_initial_values() {
        let mut event = Event::new(1)
            .with_start(day(1))
            .with_duration(3.0, DurationUnit::Day);
        event.stage_initial_values();
        event.propose_start(Some(day(8)), true).unwrap();
        event.discard_proposals();

        assert!(event.is_dirty());
        assert_eq!(event.start(), Some(day(1)));
        assert_eq!(event.end(), Some(day(4)));
    }
}
