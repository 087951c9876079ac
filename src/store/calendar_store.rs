//! Tree-shaped calendar store.
//!
//! No link resolution happens here: events and resources reference
//! calendars by id and look them up when their arithmetic is rebuilt.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{SchedulingError, SchedulingResult};
use crate::models::{Calendar, EntityKey, RecordId, StoreKind};
use crate::time::{CalendarArithmetic, DateArithmetic, WorkingTimeProvider};

use super::{Origin, RecordStore, StoreChanges};

/// Calendars of a project.
#[derive(Debug, Clone, Default)]
pub struct CalendarStore {
    records: RecordStore<Calendar>,
}

impl CalendarStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a calendar. Its parent, if any, must already exist.
    pub fn add(&mut self, calendar: Calendar, origin: Origin) -> SchedulingResult<EntityKey> {
        if let Some(parent) = calendar.parent() {
            if !self.records.contains(parent) {
                return Err(SchedulingError::unknown(StoreKind::Calendar, parent));
            }
        }
        self.records.insert(calendar, origin)
    }

    /// Adds a calendar without checking its parent. Bulk loads validate the
    /// whole tree up front and arrive in any order.
    pub(crate) fn add_unchecked(&mut self, calendar: Calendar, origin: Origin) -> SchedulingResult<EntityKey> {
        self.records.insert(calendar, origin)
    }

    /// Removes a calendar and its whole subtree. Returns the removed ids,
    /// the requested calendar first.
    pub fn remove(&mut self, id: &RecordId) -> SchedulingResult<Vec<RecordId>> {
        if !self.records.contains(id) {
            return Err(SchedulingError::unknown(StoreKind::Calendar, id));
        }
        let subtree = self.subtree(id);
        for member in &subtree {
            self.records.remove(member)?;
        }
        Ok(subtree)
    }

    /// Calendar by id.
    pub fn get(&self, id: &RecordId) -> Option<&Calendar> {
        self.records.get(id)
    }

    /// Whether a calendar with this id exists.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains(id)
    }

    /// Calendars in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Calendar> {
        self.records.values()
    }

    /// Number of calendars.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Calendars without a parent.
    pub fn roots(&self) -> Vec<&Calendar> {
        self.iter().filter(|c| c.parent().is_none()).collect()
    }

    /// Direct children of a calendar.
    pub fn children(&self, id: &RecordId) -> Vec<&Calendar> {
        self.iter().filter(|c| c.parent() == Some(id)).collect()
    }

    /// Parent chain, nearest first. Stops at a missing parent or a cycle.
    pub fn ancestors(&self, id: &RecordId) -> Vec<&RecordId> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&RecordId> = HashSet::from([id]);
        let mut current = self.get(id).and_then(Calendar::parent);
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            let Some(calendar) = self.get(parent) else {
                break;
            };
            chain.push(calendar.id());
            current = calendar.parent();
        }
        chain
    }

    /// The calendar and all its descendants, breadth first.
    pub fn subtree(&self, id: &RecordId) -> Vec<RecordId> {
        let mut members = vec![id.clone()];
        let mut next = 0;
        while next < members.len() {
            let children: Vec<RecordId> = self
                .children(&members[next])
                .into_iter()
                .map(|c| c.id().clone())
                .filter(|child| !members.contains(child))
                .collect();
            members.extend(children);
            next += 1;
        }
        members
    }

    /// Attaches or clears a calendar's own provider.
    pub fn set_provider(
        &mut self,
        id: &RecordId,
        provider: Option<Arc<dyn WorkingTimeProvider>>,
    ) -> SchedulingResult<()> {
        let calendar = self
            .records
            .get_mut(id)
            .ok_or_else(|| SchedulingError::unknown(StoreKind::Calendar, id))?;
        calendar.set_provider(provider);
        Ok(())
    }

    /// Provider of the calendar or its nearest ancestor that has one.
    pub fn effective_provider(&self, id: &RecordId) -> Option<Arc<dyn WorkingTimeProvider>> {
        let own = self.get(id)?.provider();
        own.or_else(|| {
            self.ancestors(id)
                .into_iter()
                .find_map(|ancestor| self.get(ancestor).and_then(Calendar::provider))
        })
        .cloned()
    }

    /// Calendar-aware arithmetic for a calendar id, or `None` when neither
    /// the calendar nor its ancestors carry a provider.
    pub fn arithmetic_for(&self, id: &RecordId) -> Option<Arc<dyn DateArithmetic>> {
        self.effective_provider(id)
            .map(|provider| Arc::new(CalendarArithmetic::new(provider)) as Arc<dyn DateArithmetic>)
    }

    /// Persistence sync sets.
    pub fn changes(&self) -> StoreChanges {
        self.records.changes()
    }

    /// Clears the persistence sync sets.
    pub fn accept_changes(&mut self) {
        self.records.accept_changes();
    }
}
