//! Project coordinator.
//!
//! Owns the four stores and runs the commit pipeline:
//!
//! 1. **Reconciling**: every dirty event runs its start/end/duration
//!    reconciliation. Events don't depend on each other, so order is
//!    irrelevant. An event that hits a [`RangeError`] is reported and
//!    stays dirty; the rest commit.
//! 2. **Resolving**: assignments waiting on records that joined since the
//!    last pass are linked, then the relation indices are rebuilt once.
//! 3. **Committed**: one [`ChangeSet`] with every field and relation change
//!    is returned.
//!
//! Entities never reach into other stores; cross-store lookups go through
//! the project.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::ProjectConfig;
use crate::error::{SchedulingError, SchedulingResult};
use crate::models::{
    Assignment, Calendar, EntityKey, Event, LinkTarget, ProjectData, RecordId, Resource, StoreKind,
};
use crate::store::{
    AssignmentResolver, AssignmentStore, CalendarStore, Origin, RecordStore, StoreChanges,
};
use crate::time::{DateArithmetic, DurationUnit, PlainArithmetic, Timestamp, WorkingTimeProvider};
use crate::validation::{validate_project_data, ValidationError};

use super::changeset::merge_relations;
use super::{
    ChangeSet, CommitOutcome, CommitPhase, DateReconciling, EntityChange, FieldDelta,
    ProjectAttachment, RejectedEdit, RelationChange, TransactionContext,
};

/// A scheduling project: stores, commit state and the default arithmetic.
///
/// # Example
///
/// ```
/// use u_schedule_core::engine::Project;
/// use u_schedule_core::models::{Assignment, Event, RecordId};
///
/// let mut project = Project::default();
/// project.add_assignment(Assignment::new("a1", 42, "r1")).unwrap();
/// assert!(project.assignment_event("a1").is_none());
///
/// project.add_event(Event::new(42)).unwrap();
/// project.update_indices();
/// assert_eq!(project.assignment_event("a1").unwrap().id(), &RecordId::from(42));
/// ```
#[derive(Debug)]
pub struct Project {
    config: ProjectConfig,
    arithmetic: Arc<dyn DateArithmetic>,
    events: RecordStore<Event>,
    resources: RecordStore<Resource>,
    assignments: AssignmentStore,
    calendars: CalendarStore,
    dirty_events: BTreeSet<EntityKey>,
    pending_relations: Vec<RelationChange>,
    generation: u64,
    is_initial_commit: bool,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(ProjectConfig::default())
    }
}

impl Project {
    /// Creates an empty project with plain arithmetic.
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            arithmetic: Arc::new(PlainArithmetic),
            events: RecordStore::new(),
            resources: RecordStore::new(),
            assignments: AssignmentStore::new(),
            calendars: CalendarStore::new(),
            dirty_events: BTreeSet::new(),
            pending_relations: Vec::new(),
            generation: 0,
            is_initial_commit: true,
        }
    }

    /// Replaces the default arithmetic used by events without a calendar
    /// provider.
    pub fn with_arithmetic(mut self, arithmetic: Arc<dyn DateArithmetic>) -> Self {
        self.arithmetic = arithmetic;
        self.reattach_where(|_| true);
        self
    }

    /// Loads a batch of records in any order, then resolves links in one
    /// sweep.
    ///
    /// The data must be self-contained: calendar references point into
    /// `data.calendars`. Nothing is inserted if validation fails or an id
    /// is already taken.
    ///
    /// # Errors
    /// - `InvalidData` with every integrity problem found
    /// - `DuplicateId` if a record id already exists in the project
    pub fn load(&mut self, data: ProjectData) -> SchedulingResult<()> {
        validate_project_data(&data).map_err(SchedulingError::InvalidData)?;
        self.check_free(StoreKind::Calendar, data.calendars.iter().map(|c| &c.id))?;
        self.check_free(StoreKind::Event, data.events.iter().map(|e| &e.id))?;
        self.check_free(StoreKind::Resource, data.resources.iter().map(|r| &r.id))?;
        self.check_free(StoreKind::Assignment, data.assignments.iter().map(|a| &a.id))?;

        let counts = (
            data.calendars.len(),
            data.events.len(),
            data.resources.len(),
            data.assignments.len(),
        );

        for calendar in data.calendars {
            self.calendars
                .add_unchecked(Calendar::from_data(calendar), Origin::Loaded)?;
        }
        for event in data.events {
            let event = Event::from_data(event, self.config.default_duration_unit);
            self.insert_event(event, Origin::Loaded)?;
        }
        for resource in data.resources {
            self.resources
                .insert(Resource::from_data(resource), Origin::Loaded)?;
        }
        for assignment in data.assignments {
            self.assignments
                .add(Assignment::from_data(assignment), Origin::Loaded)?;
        }

        // The sweep covers every record that just joined.
        self.assignments.take_joined();
        let events = &self.events;
        let resources = &self.resources;
        let changes = AssignmentResolver::new(&mut self.assignments)
            .resolve_unresolved(key_lookup(events, resources));

        debug!(
            calendars = counts.0,
            events = counts.1,
            resources = counts.2,
            assignments = counts.3,
            resolved = changes.len(),
            "project data loaded"
        );
        merge_relations(&mut self.pending_relations, changes);
        Ok(())
    }

    // ---- events ----

    /// Adds an event. Its initial values are normalized by the next commit;
    /// assignments waiting for its id resolve at the next
    /// [`Project::update_indices`] or commit.
    pub fn add_event(&mut self, event: Event) -> SchedulingResult<()> {
        self.check_calendar(event.calendar())?;
        self.insert_event(event, Origin::Added)
    }

    /// Removes an event. Assignments pointing at it revert to its raw id.
    pub fn remove_event(&mut self, id: impl Into<RecordId>) -> SchedulingResult<Event> {
        let (key, event) = self.events.remove(&id.into())?;
        self.dirty_events.remove(&key);
        let changes =
            AssignmentResolver::new(&mut self.assignments).detach(LinkTarget::Event, key, event.id());
        debug!(event = %event.id(), unlinked = changes.len(), "event removed");
        merge_relations(&mut self.pending_relations, changes);
        Ok(event)
    }

    /// Changes an event's id. Linked assignments follow it.
    pub fn change_event_id(
        &mut self,
        old: impl Into<RecordId>,
        new: impl Into<RecordId>,
    ) -> SchedulingResult<()> {
        let (old, new) = (old.into(), new.into());
        let key = self.events.rekey(&old, new.clone())?;
        let updated = AssignmentResolver::new(&mut self.assignments)
            .retarget(LinkTarget::Event, key, &old, &new);
        self.assignments.note_joined(LinkTarget::Event, key);
        debug!(%old, %new, updated, "event id changed");
        Ok(())
    }

    /// Points an event at a calendar (or none) and rebinds its arithmetic.
    pub fn set_event_calendar(
        &mut self,
        id: impl Into<RecordId>,
        calendar: Option<RecordId>,
    ) -> SchedulingResult<()> {
        let id = id.into();
        self.check_calendar(calendar.as_ref())?;
        let key = self
            .events
            .key_of(&id)
            .ok_or_else(|| SchedulingError::unknown(StoreKind::Event, &id))?;
        let attachment = self.attachment_for(calendar.as_ref());
        if let Some(event) = self.events.get_by_key_mut(key) {
            event.set_calendar(calendar);
            event.attach(attachment);
        }
        self.events.mark_modified(key);
        Ok(())
    }

    /// Event by id.
    pub fn event(&self, id: impl Into<RecordId>) -> Option<&Event> {
        self.events.get(&id.into())
    }

    /// All events.
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    // ---- proposals ----

    /// Stages a new start date on an event.
    ///
    /// # Errors
    /// `UnknownRecord` for a missing event, `Validation` for an
    /// unsupported date. Earlier proposals are untouched on error.
    pub fn propose_start(
        &mut self,
        id: impl Into<RecordId>,
        start: Option<Timestamp>,
        keep_duration: bool,
    ) -> SchedulingResult<()> {
        self.propose(id.into(), |event| event.propose_start(start, keep_duration))
    }

    /// Stages a new end date on an event.
    pub fn propose_end(
        &mut self,
        id: impl Into<RecordId>,
        end: Option<Timestamp>,
        keep_duration: bool,
    ) -> SchedulingResult<()> {
        self.propose(id.into(), |event| event.propose_end(end, keep_duration))
    }

    /// Stages a new duration, optionally in a new unit.
    pub fn propose_duration(
        &mut self,
        id: impl Into<RecordId>,
        duration: Option<f64>,
        unit: Option<DurationUnit>,
        keep_start: bool,
    ) -> SchedulingResult<()> {
        self.propose(id.into(), |event| {
            event.propose_duration(duration, unit, keep_start)
        })
    }

    /// Stages both dates at once.
    pub fn propose_start_end(
        &mut self,
        id: impl Into<RecordId>,
        start: Option<Timestamp>,
        end: Option<Timestamp>,
    ) -> SchedulingResult<()> {
        self.propose(id.into(), |event| event.propose_start_end(start, end))
    }

    /// Stages a duration unit switch that keeps both dates.
    pub fn propose_duration_unit(
        &mut self,
        id: impl Into<RecordId>,
        unit: DurationUnit,
    ) -> SchedulingResult<()> {
        self.propose(id.into(), |event| {
            event.propose_duration_unit(unit);
            Ok(())
        })
    }

    /// Drops an event's staged proposals.
    pub fn discard_proposals(&mut self, id: impl Into<RecordId>) -> SchedulingResult<()> {
        let id = id.into();
        let key = self
            .events
            .key_of(&id)
            .ok_or_else(|| SchedulingError::unknown(StoreKind::Event, &id))?;
        if let Some(event) = self.events.get_by_key_mut(key) {
            event.discard_proposals();
            if !event.is_dirty() {
                self.dirty_events.remove(&key);
            }
        }
        Ok(())
    }

    /// Proposes a start date and commits.
    pub fn set_start(
        &mut self,
        id: impl Into<RecordId>,
        start: Option<Timestamp>,
        keep_duration: bool,
    ) -> SchedulingResult<CommitOutcome> {
        self.propose_start(id, start, keep_duration)?;
        Ok(self.commit())
    }

    /// Proposes an end date and commits.
    pub fn set_end(
        &mut self,
        id: impl Into<RecordId>,
        end: Option<Timestamp>,
        keep_duration: bool,
    ) -> SchedulingResult<CommitOutcome> {
        self.propose_end(id, end, keep_duration)?;
        Ok(self.commit())
    }

    /// Proposes a duration and commits.
    pub fn set_duration(
        &mut self,
        id: impl Into<RecordId>,
        duration: Option<f64>,
        unit: Option<DurationUnit>,
        keep_start: bool,
    ) -> SchedulingResult<CommitOutcome> {
        self.propose_duration(id, duration, unit, keep_start)?;
        Ok(self.commit())
    }

    fn propose<F>(&mut self, id: RecordId, stage: F) -> SchedulingResult<()>
    where
        F: FnOnce(&mut Event) -> Result<(), ValidationError>,
    {
        let key = self
            .events
            .key_of(&id)
            .ok_or_else(|| SchedulingError::unknown(StoreKind::Event, &id))?;
        let event = self
            .events
            .get_by_key_mut(key)
            .ok_or_else(|| SchedulingError::unknown(StoreKind::Event, &id))?;
        stage(event)?;
        if event.is_dirty() {
            self.dirty_events.insert(key);
        }
        trace!(event = %id, "proposal staged");
        Ok(())
    }

    // ---- resources ----

    /// Adds a resource.
    pub fn add_resource(&mut self, resource: Resource) -> SchedulingResult<()> {
        self.check_calendar(resource.calendar.as_ref())?;
        let key = self.resources.insert(resource, Origin::Added)?;
        self.assignments.note_joined(LinkTarget::Resource, key);
        Ok(())
    }

    /// Removes a resource. Assignments pointing at it revert to its raw id.
    pub fn remove_resource(&mut self, id: impl Into<RecordId>) -> SchedulingResult<Resource> {
        let (key, resource) = self.resources.remove(&id.into())?;
        let changes = AssignmentResolver::new(&mut self.assignments).detach(
            LinkTarget::Resource,
            key,
            resource.id(),
        );
        debug!(resource = %resource.id(), unlinked = changes.len(), "resource removed");
        merge_relations(&mut self.pending_relations, changes);
        Ok(resource)
    }

    /// Changes a resource's id. Linked assignments follow it.
    pub fn change_resource_id(
        &mut self,
        old: impl Into<RecordId>,
        new: impl Into<RecordId>,
    ) -> SchedulingResult<()> {
        let (old, new) = (old.into(), new.into());
        let key = self.resources.rekey(&old, new.clone())?;
        let updated = AssignmentResolver::new(&mut self.assignments)
            .retarget(LinkTarget::Resource, key, &old, &new);
        self.assignments.note_joined(LinkTarget::Resource, key);
        debug!(%old, %new, updated, "resource id changed");
        Ok(())
    }

    /// Resource by id.
    pub fn resource(&self, id: impl Into<RecordId>) -> Option<&Resource> {
        self.resources.get(&id.into())
    }

    // ---- assignments ----

    /// Adds an assignment, linking whichever targets already exist.
    pub fn add_assignment(&mut self, assignment: Assignment) -> SchedulingResult<()> {
        let key = self.assignments.add(assignment, Origin::Added)?;
        let events = &self.events;
        let resources = &self.resources;
        let changes = AssignmentResolver::new(&mut self.assignments)
            .resolve_assignment(key, key_lookup(events, resources));
        merge_relations(&mut self.pending_relations, changes);
        Ok(())
    }

    /// Removes an assignment.
    pub fn remove_assignment(&mut self, id: impl Into<RecordId>) -> SchedulingResult<Assignment> {
        let assignment = self.assignments.remove(&id.into())?;
        let id = assignment.id();
        self.pending_relations.retain(|change| &change.assignment_id != id);
        Ok(assignment)
    }

    /// Assignment by id.
    pub fn assignment(&self, id: impl Into<RecordId>) -> Option<&Assignment> {
        self.assignments.get(&id.into())
    }

    /// The event an assignment is linked to; `None` while unresolved.
    pub fn assignment_event(&self, id: impl Into<RecordId>) -> Option<&Event> {
        let key = self.assignments.get(&id.into())?.event().key()?;
        self.events.get_by_key(key)
    }

    /// The resource an assignment is linked to; `None` while unresolved.
    pub fn assignment_resource(&self, id: impl Into<RecordId>) -> Option<&Resource> {
        let key = self.assignments.get(&id.into())?.resource().key()?;
        self.resources.get_by_key(key)
    }

    /// Assignments linked to an event.
    pub fn assignments_for_event(&mut self, id: impl Into<RecordId>) -> Vec<&Assignment> {
        let id = id.into();
        self.assignments.assignments_for(LinkTarget::Event, Some(&id))
    }

    /// Assignments linked to a resource.
    pub fn assignments_for_resource(&mut self, id: impl Into<RecordId>) -> Vec<&Assignment> {
        let id = id.into();
        self.assignments.assignments_for(LinkTarget::Resource, Some(&id))
    }

    /// Assignments whose `target` side is unresolved.
    pub fn unresolved_assignments(&mut self, target: LinkTarget) -> Vec<&Assignment> {
        self.assignments.assignments_for(target, None)
    }

    /// The assignment store.
    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    /// Links assignments waiting on records that joined since the last
    /// pass and rebuilds the relation indices. The relation changes are
    /// published with the next commit.
    pub fn update_indices(&mut self) {
        let changes = self.resolve_joined();
        merge_relations(&mut self.pending_relations, changes);
        self.assignments.update_indices();
    }

    // ---- calendars ----

    /// Adds a calendar. Its parent must exist.
    pub fn add_calendar(&mut self, calendar: Calendar) -> SchedulingResult<()> {
        self.calendars.add(calendar, Origin::Added)?;
        Ok(())
    }

    /// Removes a calendar and its subtree. Events and resources that used a
    /// removed calendar lose the reference; events fall back to the default
    /// arithmetic.
    pub fn remove_calendar(&mut self, id: impl Into<RecordId>) -> SchedulingResult<Vec<RecordId>> {
        let removed = self.calendars.remove(&id.into())?;
        let uses_removed = |calendar: Option<&RecordId>| calendar.is_some_and(|c| removed.contains(c));

        let event_keys: Vec<EntityKey> = self
            .events
            .iter()
            .filter(|(_, event)| uses_removed(event.calendar()))
            .map(|(key, _)| key)
            .collect();
        let attachment = self.attachment_for(None);
        for key in event_keys {
            if let Some(event) = self.events.get_by_key_mut(key) {
                event.set_calendar(None);
                event.attach(attachment.clone());
            }
            self.events.mark_modified(key);
        }

        let resource_ids: Vec<RecordId> = self
            .resources
            .values()
            .filter(|resource| uses_removed(resource.calendar.as_ref()))
            .map(|resource| resource.id().clone())
            .collect();
        for id in resource_ids {
            let key = self.resources.key_of(&id);
            if let Some(resource) = self.resources.get_mut(&id) {
                resource.calendar = None;
            }
            if let Some(key) = key {
                self.resources.mark_modified(key);
            }
        }

        debug!(removed = removed.len(), "calendars removed");
        Ok(removed)
    }

    /// Attaches or clears a calendar's working-time provider and rebinds
    /// every event using the calendar or one of its descendants.
    pub fn set_calendar_provider(
        &mut self,
        id: impl Into<RecordId>,
        provider: Option<Arc<dyn WorkingTimeProvider>>,
    ) -> SchedulingResult<()> {
        let id = id.into();
        self.calendars.set_provider(&id, provider)?;
        let affected = self.calendars.subtree(&id);
        self.reattach_where(|event| event.calendar().is_some_and(|c| affected.contains(c)));
        Ok(())
    }

    /// Calendar by id.
    pub fn calendar(&self, id: impl Into<RecordId>) -> Option<&Calendar> {
        self.calendars.get(&id.into())
    }

    /// The calendar store.
    pub fn calendars(&self) -> &CalendarStore {
        &self.calendars
    }

    /// Whether `at` is working time under a calendar (or the default
    /// arithmetic for `None`).
    pub fn is_working_time(&self, calendar: Option<&RecordId>, at: Timestamp) -> bool {
        self.attachment_for(calendar).arithmetic().is_working_time(at)
    }

    // ---- commit ----

    /// Runs the commit pipeline.
    ///
    /// Committing with nothing staged is a no-op: no generation is consumed
    /// and no change-set is produced.
    pub fn commit(&mut self) -> CommitOutcome {
        if !self.has_pending_work() {
            trace!("commit skipped, nothing staged");
            return CommitOutcome::default();
        }

        self.generation += 1;
        let ctx = TransactionContext::new(
            self.generation,
            self.is_initial_commit,
            self.config.max_calendar_range_ms,
        );

        debug!(
            generation = ctx.generation(),
            phase = ?CommitPhase::Reconciling,
            dirty = self.dirty_events.len(),
            "commit started"
        );
        let attempted = self.dirty_events.len();
        let (entities, rejected) = self.reconcile_dirty(&ctx);

        debug!(generation = ctx.generation(), phase = ?CommitPhase::Resolving);
        let changes = self.resolve_joined();
        merge_relations(&mut self.pending_relations, changes);
        self.assignments.update_indices();
        let relations = std::mem::take(&mut self.pending_relations);

        let change_set = (!entities.is_empty() || !relations.is_empty()).then(|| ChangeSet {
            generation: ctx.generation(),
            initial: ctx.is_initial_commit(),
            entities,
            relations,
        });
        debug!(
            generation = ctx.generation(),
            phase = ?CommitPhase::Committed,
            entities = change_set.as_ref().map_or(0, |set| set.entities.len()),
            relations = change_set.as_ref().map_or(0, |set| set.relations.len()),
            rejected = rejected.len(),
        );
        // A commit whose every edit was rejected committed nothing.
        let all_rejected = !rejected.is_empty() && rejected.len() == attempted;
        if change_set.is_some() || !all_rejected {
            self.is_initial_commit = false;
        }

        CommitOutcome {
            change_set,
            rejected,
        }
    }

    /// `Dirty` while anything is staged, `Idle` otherwise.
    pub fn phase(&self) -> CommitPhase {
        if self.has_pending_work() {
            CommitPhase::Dirty
        } else {
            CommitPhase::Idle
        }
    }

    /// Whether no commit has succeeded yet.
    pub fn is_initial_commit(&self) -> bool {
        self.is_initial_commit
    }

    /// Number of commits that processed work.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Project settings.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Persistence sync sets of one store.
    pub fn changes(&self, store: StoreKind) -> StoreChanges {
        match store {
            StoreKind::Event => self.events.changes(),
            StoreKind::Resource => self.resources.changes(),
            StoreKind::Assignment => self.assignments.changes(),
            StoreKind::Calendar => self.calendars.changes(),
        }
    }

    /// Clears every store's sync sets after a successful sync.
    pub fn accept_changes(&mut self) {
        self.events.accept_changes();
        self.resources.accept_changes();
        self.assignments.accept_changes();
        self.calendars.accept_changes();
    }

    fn has_pending_work(&self) -> bool {
        !self.dirty_events.is_empty()
            || !self.pending_relations.is_empty()
            || self.assignments.has_joined()
    }

    fn reconcile_dirty(&mut self, ctx: &TransactionContext) -> (Vec<EntityChange>, Vec<RejectedEdit>) {
        let mut entities = Vec::new();
        let mut rejected = Vec::new();
        for key in std::mem::take(&mut self.dirty_events) {
            let Some(event) = self.events.get_by_key_mut(key) else {
                continue;
            };
            match event.reconcile(ctx) {
                Ok(Some(delta)) => {
                    entities.push(entity_change(event, delta));
                    // Normalizing the values a record joined with is not an edit.
                    if !delta.initial {
                        self.events.mark_modified(key);
                    }
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(event = %event.id(), %error, "edit rejected");
                    rejected.push(RejectedEdit {
                        entity_id: event.id().clone(),
                        error,
                    });
                    self.dirty_events.insert(key);
                }
            }
        }
        (entities, rejected)
    }

    fn resolve_joined(&mut self) -> Vec<RelationChange> {
        if !self.assignments.has_joined() {
            return Vec::new();
        }
        let events = &self.events;
        let resources = &self.resources;
        let changes = AssignmentResolver::new(&mut self.assignments).resolve_joined(
            move |target: LinkTarget, key: EntityKey| match target {
                LinkTarget::Event => events.get_by_key(key).map(|e| e.id().clone()),
                LinkTarget::Resource => resources.get_by_key(key).map(|r| r.id().clone()),
            },
        );
        debug!(linked = changes.len(), "joined records resolved");
        changes
    }

    fn insert_event(&mut self, mut event: Event, origin: Origin) -> SchedulingResult<()> {
        if self.events.contains(event.id()) {
            return Err(SchedulingError::DuplicateId {
                store: StoreKind::Event,
                id: event.id().clone(),
            });
        }
        event.attach(self.attachment_for(event.calendar()));
        event.stage_initial_values();
        let dirty = event.is_dirty();
        let key = self.events.insert(event, origin)?;
        if dirty {
            self.dirty_events.insert(key);
        }
        if origin == Origin::Added {
            self.assignments.note_joined(LinkTarget::Event, key);
        }
        Ok(())
    }

    fn attachment_for(&self, calendar: Option<&RecordId>) -> ProjectAttachment {
        let arithmetic = calendar
            .and_then(|id| self.calendars.arithmetic_for(id))
            .unwrap_or_else(|| Arc::clone(&self.arithmetic));
        ProjectAttachment::new(arithmetic, self.config.max_calendar_range_ms)
    }

    fn reattach_where<F>(&mut self, predicate: F)
    where
        F: Fn(&Event) -> bool,
    {
        let updates: Vec<(EntityKey, ProjectAttachment)> = self
            .events
            .iter()
            .filter(|(_, event)| predicate(event))
            .map(|(key, event)| (key, self.attachment_for(event.calendar())))
            .collect();
        for (key, attachment) in updates {
            if let Some(event) = self.events.get_by_key_mut(key) {
                event.attach(attachment);
            }
        }
    }

    fn check_calendar(&self, calendar: Option<&RecordId>) -> SchedulingResult<()> {
        match calendar {
            Some(id) if !self.calendars.contains(id) => {
                Err(SchedulingError::unknown(StoreKind::Calendar, id))
            }
            _ => Ok(()),
        }
    }

    fn check_free<'a>(
        &self,
        store: StoreKind,
        mut ids: impl Iterator<Item = &'a RecordId>,
    ) -> SchedulingResult<()> {
        let taken = |id: &RecordId| match store {
            StoreKind::Event => self.events.contains(id),
            StoreKind::Resource => self.resources.contains(id),
            StoreKind::Assignment => self.assignments.contains(id),
            StoreKind::Calendar => self.calendars.contains(id),
        };
        match ids.find(|id| taken(*id)) {
            Some(id) => Err(SchedulingError::DuplicateId {
                store,
                id: id.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn key_lookup<'a>(
    events: &'a RecordStore<Event>,
    resources: &'a RecordStore<Resource>,
) -> impl Fn(LinkTarget, &RecordId) -> Option<EntityKey> + 'a {
    move |target: LinkTarget, id: &RecordId| match target {
        LinkTarget::Event => events.key_of(id),
        LinkTarget::Resource => resources.key_of(id),
    }
}

fn entity_change(event: &Event, delta: FieldDelta) -> EntityChange {
    EntityChange {
        entity_id: event.id().clone(),
        changed_fields: delta.fields,
        duration_unit_changed: delta.duration_unit,
        start: event.start(),
        end: event.end(),
        duration: event.duration(),
        duration_unit: event.duration_unit(),
    }
}
