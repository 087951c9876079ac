//! Date arithmetic capabilities.
//!
//! [`PlainArithmetic`] is the default: elapsed-time add/diff through hours.
//! [`CalendarArithmetic`] delegates to an external [`WorkingTimeProvider`]
//! when a calendar-aware schedule is configured. The engine never decides
//! which hours count as working time itself.

use chrono::TimeDelta;
use std::fmt::Debug;
use std::sync::Arc;

use super::{hour_diff, DurationUnit, Timestamp, MS_PER_HOUR};

/// Unit-aware add/diff used by reconciliation.
pub trait DateArithmetic: Send + Sync + Debug {
    /// Shifts `date` by `amount` units. Negative amounts shift backwards.
    ///
    /// Returns `None` when the result is not representable.
    fn add(&self, date: Timestamp, amount: f64, unit: DurationUnit) -> Option<Timestamp>;

    /// Duration from `start` to `end` expressed in `unit`.
    fn diff(&self, start: Timestamp, end: Timestamp, unit: DurationUnit) -> f64;

    /// Whether `at` is working time. Plain arithmetic treats every instant
    /// as working time.
    fn is_working_time(&self, _at: Timestamp) -> bool {
        true
    }
}

/// Elapsed-time arithmetic normalized through hours.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainArithmetic;

impl DateArithmetic for PlainArithmetic {
    fn add(&self, date: Timestamp, amount: f64, unit: DurationUnit) -> Option<Timestamp> {
        let millis = (unit.to_hours(amount) * MS_PER_HOUR as f64).round();
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return None;
        }
        date.checked_add_signed(TimeDelta::try_milliseconds(millis as i64)?)
    }

    fn diff(&self, start: Timestamp, end: Timestamp, unit: DurationUnit) -> f64 {
        hour_diff(start, end, unit)
    }
}

/// External working-time capability (a calendar engine).
pub trait WorkingTimeProvider: Send + Sync + Debug {
    /// Whether `at` falls in working time.
    fn is_working_time(&self, at: Timestamp) -> bool;

    /// Shifts `at` by `amount` units of working time.
    fn add_working_time(&self, at: Timestamp, amount: f64, unit: DurationUnit)
        -> Option<Timestamp>;

    /// Working time between two instants (ms). Defaults to elapsed time.
    fn working_time_between(&self, start: Timestamp, end: Timestamp) -> i64 {
        (end - start).num_milliseconds()
    }
}

/// Arithmetic that counts only the provider's working time.
#[derive(Debug, Clone)]
pub struct CalendarArithmetic {
    provider: Arc<dyn WorkingTimeProvider>,
}

impl CalendarArithmetic {
    /// Wraps a working-time provider.
    pub fn new(provider: Arc<dyn WorkingTimeProvider>) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &Arc<dyn WorkingTimeProvider> {
        &self.provider
    }
}

impl DateArithmetic for CalendarArithmetic {
    fn add(&self, date: Timestamp, amount: f64, unit: DurationUnit) -> Option<Timestamp> {
        if amount == 0.0 {
            return Some(date);
        }
        // Providers receive hours so sub-day units never hit calendar-day stepping.
        self.provider
            .add_working_time(date, unit.to_hours(amount), DurationUnit::Hour)
    }

    fn diff(&self, start: Timestamp, end: Timestamp, unit: DurationUnit) -> f64 {
        let hours = self.provider.working_time_between(start, end) as f64 / MS_PER_HOUR as f64;
        DurationUnit::Hour.convert(hours, unit)
    }

    fn is_working_time(&self, at: Timestamp) -> bool {
        self.provider.is_working_time(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Utc, Weekday};

    /// Weekdays are working time around the clock, weekends are not.
    #[derive(Debug)]
    struct Weekdays;

    impl WorkingTimeProvider for Weekdays {
        fn is_working_time(&self, at: Timestamp) -> bool {
            !matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
        }

        fn add_working_time(
            &self,
            at: Timestamp,
            amount: f64,
            unit: DurationUnit,
        ) -> Option<Timestamp> {
            let mut remaining = unit.to_hours(amount).round() as i64;
            let step = TimeDelta::hours(remaining.signum());
            let mut cursor = at;
            while remaining != 0 {
                let probe = if remaining > 0 { cursor } else { cursor - TimeDelta::hours(1) };
                if self.is_working_time(probe) {
                    remaining -= remaining.signum();
                }
                cursor += step;
            }
            Some(cursor)
        }

        fn working_time_between(&self, start: Timestamp, end: Timestamp) -> i64 {
            let mut cursor = start;
            let mut total = 0;
            while cursor < end {
                if self.is_working_time(cursor) {
                    total += MS_PER_HOUR;
                }
                cursor += TimeDelta::hours(1);
            }
            total
        }
    }

    #[test]
    fn test_plain_add_and_diff() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = PlainArithmetic.add(start, 1.5, DurationUnit::Day).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap());

        let back = PlainArithmetic.add(end, -1.5, DurationUnit::Day).unwrap();
        assert_eq!(back, start);

        assert!((PlainArithmetic.diff(start, end, DurationUnit::Hour) - 36.0).abs() < 1e-12);
        assert!(PlainArithmetic.is_working_time(start));
    }

    #[test]
    fn test_plain_add_overflow() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(PlainArithmetic.add(start, f64::INFINITY, DurationUnit::Day).is_none());
        assert!(PlainArithmetic.add(start, 1e300, DurationUnit::Year).is_none());
    }

    #[test]
    fn test_calendar_arithmetic_skips_weekend() {
        let arith = CalendarArithmetic::new(Arc::new(Weekdays));
        // 2024-01-05 is a Friday.
        let friday = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let end = arith.add(friday, 2.0, DurationUnit::Day).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 9, 0, 0, 0).unwrap());

        assert!((arith.diff(friday, end, DurationUnit::Day) - 2.0).abs() < 1e-12);

        let back = arith.add(end, -2.0, DurationUnit::Day).unwrap();
        assert_eq!(back, friday);

        let saturday = Utc.with_ymd_and_hms(2024, 1, 6, 12, 0, 0).unwrap();
        assert!(!arith.is_working_time(saturday));
        assert_eq!(arith.add(saturday, 0.0, DurationUnit::Hour), Some(saturday));
    }
}
