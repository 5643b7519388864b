//! Time spans used by all window arithmetic in the planner.
//!
//! Instants are `chrono::DateTime<Utc>`; spans are half-open `[start, end)`.
//! Quantities coming from the data model (exposure lengths, policy minutes)
//! are converted to `chrono::Duration` through the helpers at the bottom of
//! this module so rounding happens in one place.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An immutable `[start, end)` span of time.
///
/// # Examples
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use target_scheduler::models::TimeInterval;
///
/// let start = Utc.with_ymd_and_hms(2024, 1, 10, 22, 0, 0).unwrap();
/// let span = TimeInterval::new(start, start + Duration::hours(2));
/// assert_eq!(span.duration(), Duration::hours(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Creates a new span. `end` before `start` is allowed and yields a
    /// negative duration, which callers treat as "too short".
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// `end - start`.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// True when `instant` falls inside `[start, end)`.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// Overlap of two spans, `None` when they do not intersect.
    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then(|| TimeInterval::new(start, end))
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} - {}]",
            self.start.format("%Y-%m-%d %H:%M:%S"),
            self.end.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Convert a length in seconds into a millisecond-accurate duration.
pub fn seconds_to_duration(seconds: qtty::Seconds) -> Duration {
    Duration::milliseconds((seconds.value() * 1000.0).round() as i64)
}

/// Convert fractional minutes into a millisecond-accurate duration.
pub fn minutes_to_duration(minutes: f64) -> Duration {
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}
