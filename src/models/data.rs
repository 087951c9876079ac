//! Serialized input records.
//!
//! The shape of data loaded into a project. Field names are camelCase to
//! match the JSON produced by typical scheduling front ends.

use serde::{Deserialize, Serialize};

use crate::time::{DurationUnit, Timestamp};

use super::RecordId;

/// Everything a project can be loaded from. Any section may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectData {
    pub calendars: Vec<CalendarData>,
    pub events: Vec<EventData>,
    pub resources: Vec<ResourceData>,
    pub assignments: Vec<AssignmentData>,
}

/// Event input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    #[serde(default)]
    pub duration: Option<f64>,
    /// Falls back to the project's default unit.
    #[serde(default)]
    pub duration_unit: Option<DurationUnit>,
    #[serde(default)]
    pub calendar: Option<RecordId>,
}

impl EventData {
    /// Creates event data with only an id.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            start_date: None,
            end_date: None,
            duration: None,
            duration_unit: None,
            calendar: None,
        }
    }

    /// Sets the start date.
    pub fn with_start(mut self, start: Timestamp) -> Self {
        self.start_date = Some(start);
        self
    }

    /// Sets the end date.
    pub fn with_end(mut self, end: Timestamp) -> Self {
        self.end_date = Some(end);
        self
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the duration unit.
    pub fn with_unit(mut self, unit: DurationUnit) -> Self {
        self.duration_unit = Some(unit);
        self
    }

    /// References a calendar.
    pub fn with_calendar(mut self, calendar: impl Into<RecordId>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }
}

/// Resource input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceData {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calendar: Option<RecordId>,
}

impl ResourceData {
    /// Creates resource data with only an id.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            calendar: None,
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// References a calendar.
    pub fn with_calendar(mut self, calendar: impl Into<RecordId>) -> Self {
        self.calendar = Some(calendar.into());
        self
    }
}

/// Assignment input. Targets need not exist yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentData {
    pub id: RecordId,
    pub event_id: RecordId,
    pub resource_id: RecordId,
    #[serde(default = "default_units")]
    pub units: f64,
}

fn default_units() -> f64 {
    100.0
}

impl AssignmentData {
    /// Creates assignment data at full allocation.
    pub fn new(
        id: impl Into<RecordId>,
        event_id: impl Into<RecordId>,
        resource_id: impl Into<RecordId>,
    ) -> Self {
        Self {
            id: id.into(),
            event_id: event_id.into(),
            resource_id: resource_id.into(),
            units: default_units(),
        }
    }
}

/// Calendar input. Providers are attached in code, not loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarData {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<RecordId>,
}

impl CalendarData {
    /// Creates a root calendar entry.
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            parent_id: None,
        }
    }

    /// Places the calendar under a parent.
    pub fn with_parent(mut self, parent: impl Into<RecordId>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }
}
