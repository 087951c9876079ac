//! Project configuration.
//!
//! All fields have defaults, so partial documents deserialize:
//!
//! ```
//! use u_schedule_core::ProjectConfig;
//! use u_schedule_core::time::DurationUnit;
//!
//! let config: ProjectConfig = serde_json::from_str(r#"{ "defaultDurationUnit": "hour" }"#).unwrap();
//! assert_eq!(config.default_duration_unit, DurationUnit::Hour);
//! assert_eq!(config.max_calendar_range_ms, u_schedule_core::config::DEFAULT_MAX_CALENDAR_RANGE_MS);
//! ```

use serde::{Deserialize, Serialize};

use crate::time::{DurationUnit, MS_PER_HOUR};

/// Default maximum span of a single event: five 365-day years.
pub const DEFAULT_MAX_CALENDAR_RANGE_MS: i64 = 5 * 365 * 24 * MS_PER_HOUR;

/// Default capacity of the change-set broadcast channel.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Settings shared by every store in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Largest permitted `end - start` span (ms). Larger spans are rejected
    /// with a `RangeError` at commit.
    pub max_calendar_range_ms: i64,
    /// Duration unit for loaded events that don't declare one.
    pub default_duration_unit: DurationUnit,
    /// Buffered change-sets per `SharedProject` subscriber.
    pub broadcast_capacity: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            max_calendar_range_ms: DEFAULT_MAX_CALENDAR_RANGE_MS,
            default_duration_unit: DurationUnit::Day,
            broadcast_capacity: DEFAULT_BROADCAST_CAPACITY,
        }
    }
}

impl ProjectConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum calendar range (ms).
    pub fn with_max_calendar_range(mut self, max_ms: i64) -> Self {
        self.max_calendar_range_ms = max_ms;
        self
    }

    /// Sets the default duration unit for loaded events.
    pub fn with_default_duration_unit(mut self, unit: DurationUnit) -> Self {
        self.default_duration_unit = unit;
        self
    }

    /// Sets the change-set channel capacity.
    pub fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }
}
