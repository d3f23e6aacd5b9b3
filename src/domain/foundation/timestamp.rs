//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

const DAY_MILLIS: i64 = 86_400_000;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Checks if this timestamp is before another.
    pub fn is_before(&self, other: &Timestamp) -> bool {
        self.0 < other.0
    }

    /// Checks if this timestamp is after another.
    pub fn is_after(&self, other: &Timestamp) -> bool {
        self.0 > other.0
    }

    /// Returns the duration from another timestamp to this one.
    ///
    /// Returns negative duration if other is after self.
    pub fn duration_since(&self, other: &Timestamp) -> Duration {
        self.0.signed_duration_since(other.0)
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a new timestamp by subtracting the specified number of days.
    pub fn minus_days(&self, days: i64) -> Self {
        Self(self.0 - Duration::days(days))
    }

    /// Creates a new timestamp by adding calendar months.
    ///
    /// The day of month is clamped when the target month is shorter,
    /// so Jan 31 plus one month lands on the last day of February.
    pub fn add_calendar_months(&self, months: u32) -> Self {
        match self.0.checked_add_months(Months::new(months)) {
            Some(dt) => Self(dt),
            None => *self,
        }
    }

    /// Creates a new timestamp by adding calendar years.
    pub fn add_years(&self, years: u32) -> Self {
        self.add_calendar_months(years * 12)
    }

    /// Counts the days between this timestamp and another, rounding any
    /// partial day up.
    ///
    /// The difference is taken as an absolute value, so argument order
    /// does not matter. Two equal timestamps yield zero.
    pub fn days_between_ceil(&self, other: &Timestamp) -> u32 {
        let millis = self.0.signed_duration_since(other.0).num_milliseconds().abs();
        ((millis + DAY_MILLIS - 1) / DAY_MILLIS) as u32
    }

    /// Creates a timestamp from Unix seconds.
    pub fn from_unix_secs(secs: u64) -> Self {
        use chrono::TimeZone;
        Self(Utc.timestamp_opt(secs as i64, 0).unwrap())
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> u64 {
        self.0.timestamp() as u64
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}
