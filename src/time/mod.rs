//! Date and duration arithmetic.
//!
//! # Time Model
//! Dates are UTC instants (`Timestamp`). Durations are `f64` values in a
//! [`DurationUnit`]. Every conversion goes through a fixed millisecond
//! ratio, and every add/diff goes through hours, so shifting a date by a
//! duration is elapsed-time arithmetic and never drifts across daylight
//! saving transitions of the viewer's time zone.
//!
//! # Unit Ratios
//!
//! | Unit | Length |
//! |------|--------|
//! | Day | 24 h |
//! | Week | 7 days |
//! | Month | 30 days |
//! | Quarter | 3 months |
//! | Year | 365 days |

mod arithmetic;

pub use arithmetic::{CalendarArithmetic, DateArithmetic, PlainArithmetic, WorkingTimeProvider};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validation::{ValidationError, ValidationErrorKind};

/// A point in time.
pub type Timestamp = DateTime<Utc>;

/// Milliseconds per hour.
pub const MS_PER_HOUR: i64 = 3_600_000;

/// Earliest calendar year accepted at the proposal boundary.
pub const MIN_SUPPORTED_YEAR: i32 = 1;

/// Latest calendar year accepted at the proposal boundary.
pub const MAX_SUPPORTED_YEAR: i32 = 9999;

/// Unit in which an event's duration is expressed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    #[serde(alias = "milliseconds", alias = "ms")]
    Millisecond,
    #[serde(alias = "seconds", alias = "s")]
    Second,
    #[serde(alias = "minutes", alias = "min")]
    Minute,
    #[serde(alias = "hours", alias = "h")]
    Hour,
    #[default]
    #[serde(alias = "days", alias = "d")]
    Day,
    #[serde(alias = "weeks", alias = "w")]
    Week,
    #[serde(alias = "months", alias = "mo")]
    Month,
    #[serde(alias = "quarters", alias = "q")]
    Quarter,
    #[serde(alias = "years", alias = "y")]
    Year,
}

impl DurationUnit {
    /// All units, shortest first.
    pub const ALL: [DurationUnit; 9] = [
        DurationUnit::Millisecond,
        DurationUnit::Second,
        DurationUnit::Minute,
        DurationUnit::Hour,
        DurationUnit::Day,
        DurationUnit::Week,
        DurationUnit::Month,
        DurationUnit::Quarter,
        DurationUnit::Year,
    ];

    /// Length of one unit in milliseconds.
    pub const fn millis(self) -> i64 {
        const DAY: i64 = 24 * MS_PER_HOUR;
        match self {
            DurationUnit::Millisecond => 1,
            DurationUnit::Second => 1_000,
            DurationUnit::Minute => 60_000,
            DurationUnit::Hour => MS_PER_HOUR,
            DurationUnit::Day => DAY,
            DurationUnit::Week => 7 * DAY,
            DurationUnit::Month => 30 * DAY,
            DurationUnit::Quarter => 90 * DAY,
            DurationUnit::Year => 365 * DAY,
        }
    }

    /// Converts `value` expressed in `self` into `target` units.
    #[inline]
    pub fn convert(self, value: f64, target: DurationUnit) -> f64 {
        if self == target {
            return value;
        }
        value * self.millis() as f64 / target.millis() as f64
    }

    /// Converts `value` expressed in `self` into hours.
    #[inline]
    pub fn to_hours(self, value: f64) -> f64 {
        self.convert(value, DurationUnit::Hour)
    }

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            DurationUnit::Millisecond => "millisecond",
            DurationUnit::Second => "second",
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Day => "day",
            DurationUnit::Week => "week",
            DurationUnit::Month => "month",
            DurationUnit::Quarter => "quarter",
            DurationUnit::Year => "year",
        }
    }
}

impl fmt::Display for DurationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DurationUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_ascii_lowercase().as_str() {
            "ms" | "millisecond" | "milliseconds" => DurationUnit::Millisecond,
            "s" | "second" | "seconds" => DurationUnit::Second,
            "min" | "minute" | "minutes" => DurationUnit::Minute,
            "h" | "hour" | "hours" => DurationUnit::Hour,
            "d" | "day" | "days" => DurationUnit::Day,
            "w" | "week" | "weeks" => DurationUnit::Week,
            "mo" | "month" | "months" => DurationUnit::Month,
            "q" | "quarter" | "quarters" => DurationUnit::Quarter,
            "y" | "year" | "years" => DurationUnit::Year,
            other => {
                return Err(ValidationError::new(
                    ValidationErrorKind::UnknownDurationUnit,
                    format!("Unknown duration unit: '{other}'"),
                ))
            }
        };
        Ok(unit)
    }
}

/// Milliseconds between two instants as an hour-normalized `f64` in `unit`.
pub fn hour_diff(start: Timestamp, end: Timestamp, unit: DurationUnit) -> f64 {
    let hours = (end - start).num_milliseconds() as f64 / MS_PER_HOUR as f64;
    DurationUnit::Hour.convert(hours, unit)
}

/// Whether a date lies inside the supported calendar window.
pub fn is_supported_date(date: Timestamp) -> bool {
    (MIN_SUPPORTED_YEAR..=MAX_SUPPORTED_YEAR).contains(&date.year())
}

/// Rejects dates outside the supported window.
pub fn check_date(date: Timestamp) -> Result<(), ValidationError> {
    if is_supported_date(date) {
        Ok(())
    } else {
        Err(ValidationError::new(
            ValidationErrorKind::InvalidDate,
            format!("Date {date} is outside years {MIN_SUPPORTED_YEAR}..={MAX_SUPPORTED_YEAR}"),
        ))
    }
}

/// Rejects NaN and infinite durations.
pub fn check_duration(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::new(
            ValidationErrorKind::InvalidDuration,
            format!("Duration must be a finite number, got {value}"),
        ))
    }
}
