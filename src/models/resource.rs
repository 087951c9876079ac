//! Resource model.
//!
//! Resources are the entities events are assigned to: people, machines,
//! rooms. The engine only needs their identity and optional calendar; the
//! rest travels as opaque attributes.

use std::collections::HashMap;

use super::{RecordId, ResourceData};

/// A resource that assignments can reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    id: RecordId,
    /// Human-readable name.
    pub name: String,
    /// Referenced calendar id.
    pub calendar: Option<RecordId>,
    /// Domain-specific metadata.
    pub attributes: HashMap<String, String>,
}

impl Resource {
    /// Creates a resource.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            calendar: None,
            attributes: HashMap::new(),
        }
    }

    /// Builds a resource from load data.
    pub fn from_data(data: ResourceData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            calendar: data.calendar,
            attributes: HashMap::new(),
        }
    }

    /// Sets the resource name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// References a calendar by id.
    pub fn with_calendar(mut self, calendar: impl Into<RecordId>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Record id.
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}
