//! Calendar model.
//!
//! Calendars form a tree. A calendar may carry a working-time provider; a
//! calendar without one inherits its parent's. Which hours count as working
//! time is entirely up to the provider.

use std::fmt;
use std::sync::Arc;

use crate::time::WorkingTimeProvider;

use super::{CalendarData, RecordId};

/// A node of the calendar tree.
#[derive(Clone)]
pub struct Calendar {
    id: RecordId,
    /// Human-readable name.
    pub name: String,
    parent: Option<RecordId>,
    provider: Option<Arc<dyn WorkingTimeProvider>>,
}

impl Calendar {
    /// Creates a root calendar without a provider.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            parent: None,
            provider: None,
        }
    }

    /// Builds a calendar from load data.
    pub fn from_data(data: CalendarData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            parent: data.parent_id,
            provider: None,
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Places the calendar under a parent.
    pub fn with_parent(mut self, parent: impl Into<RecordId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Attaches a working-time provider.
    pub fn with_provider(mut self, provider: Arc<dyn WorkingTimeProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Record id.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// Parent calendar id.
    pub fn parent(&self) -> Option<&RecordId> {
        self.parent.as_ref()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<RecordId>) {
        self.parent = parent;
    }

    /// Own provider, ignoring ancestors.
    pub fn provider(&self) -> Option<&Arc<dyn WorkingTimeProvider>> {
        self.provider.as_ref()
    }

    pub(crate) fn set_provider(&mut self, provider: Option<Arc<dyn WorkingTimeProvider>>) {
        self.provider = provider;
    }
}

impl fmt::Debug for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Calendar")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}
