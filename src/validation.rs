//! Input validation for project data and proposals.
//!
//! Checks structural integrity of loaded data before it enters the stores.
//! Detects:
//! - Duplicate IDs (per store)
//! - Dates outside the supported window, non-finite durations
//! - Missing calendar references (parent calendars, event/resource calendars)
//! - Circular calendar trees
//!
//! Assignments referencing events or resources that are not (yet) loaded are
//! **not** errors; they stay unresolved until the target joins.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::models::{ProjectData, RecordId};
use crate::time::{check_date, check_duration};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two records in one store share the same ID.
    DuplicateId,
    /// A date lies outside the supported calendar window.
    InvalidDate,
    /// A duration is NaN or infinite.
    InvalidDuration,
    /// A duration unit name is not recognized.
    UnknownDurationUnit,
    /// A record references a calendar that doesn't exist.
    InvalidCalendarReference,
    /// The calendar tree contains a cycle.
    CyclicCalendar,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates project data before loading.
///
/// Checks:
/// 1. No duplicate IDs within events, resources, assignments, calendars
/// 2. All event dates are inside the supported window
/// 3. All event durations are finite
/// 4. Calendar parents and event/resource calendar references exist
/// 5. No circular calendar parent chains
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_project_data(data: &ProjectData) -> ValidationResult {
    let mut errors = Vec::new();

    let calendar_ids = collect_ids(
        "calendar",
        data.calendars.iter().map(|c| &c.id),
        &mut errors,
    );
    collect_ids("event", data.events.iter().map(|e| &e.id), &mut errors);
    collect_ids("resource", data.resources.iter().map(|r| &r.id), &mut errors);
    collect_ids("assignment", data.assignments.iter().map(|a| &a.id), &mut errors);

    for event in &data.events {
        for date in [event.start_date, event.end_date].into_iter().flatten() {
            if let Err(mut err) = check_date(date) {
                err.message = format!("Event '{}': {}", event.id, err.message);
                errors.push(err);
            }
        }
        if let Some(duration) = event.duration {
            if let Err(mut err) = check_duration(duration) {
                err.message = format!("Event '{}': {}", event.id, err.message);
                errors.push(err);
            }
        }
    }

    // Calendar references
    let references = data
        .calendars
        .iter()
        .filter_map(|c| c.parent_id.as_ref().map(|p| ("calendar", &c.id, p)))
        .chain(
            data.events
                .iter()
                .filter_map(|e| e.calendar.as_ref().map(|c| ("event", &e.id, c))),
        )
        .chain(
            data.resources
                .iter()
                .filter_map(|r| r.calendar.as_ref().map(|c| ("resource", &r.id, c))),
        );
    for (store, owner, calendar) in references {
        if !calendar_ids.contains(calendar) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCalendarReference,
                format!("{store} '{owner}' references unknown calendar '{calendar}'"),
            ));
        }
    }

    if let Some(cycle_err) = detect_calendar_cycles(data) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect_ids<'a>(
    store: &str,
    ids: impl Iterator<Item = &'a RecordId>,
    errors: &mut Vec<ValidationError>,
) -> HashSet<&'a RecordId> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {store} ID: {id}"),
            ));
        }
    }
    seen
}

/// Detects cycles in the calendar parent graph using DFS.
///
/// # Algorithm
/// DFS over child → parent edges. A back-edge (visiting a node currently
/// in the recursion stack) means a cycle.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_calendar_cycles(data: &ProjectData) -> Option<ValidationError> {
    let mut adj: HashMap<&RecordId, Vec<&RecordId>> = HashMap::new();
    for calendar in &data.calendars {
        if let Some(parent) = &calendar.parent_id {
            adj.entry(&calendar.id).or_default().push(parent);
        }
    }

    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for calendar in &data.calendars {
        let node = &calendar.id;
        if !visited.contains(node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicCalendar,
                format!("Circular calendar parent chain involving calendar '{node}'"),
            ));
        }
    }

    None
}

fn has_cycle_dfs<'a>(
    node: &'a RecordId,
    adj: &HashMap<&'a RecordId, Vec<&'a RecordId>>,
    visited: &mut HashSet<&'a RecordId>,
    in_stack: &mut HashSet<&'a RecordId>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(node) {
        for &next in neighbors {
            if in_stack.contains(next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(node);
    false
}
