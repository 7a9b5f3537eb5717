//! UTC calendar-day window math: bucket boundaries and range enumeration.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// One calendar-day bucket: [start, end) with end = start + 1 day, both UTC midnights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The window containing `ts`.
    pub fn containing(ts: DateTime<Utc>) -> Self {
        let start = start_of_day(ts);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }
}

/// Midnight of the UTC day containing `ts`.
pub fn start_of_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Smallest UTC midnight >= `ts`.
pub fn ceil_to_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    let floor = start_of_day(ts);
    if floor == ts {
        floor
    } else {
        floor + Duration::days(1)
    }
}

/// Midnight of the current UTC day; the default exclusive upper bound so the
/// in-progress day is never processed as a partial window.
pub fn start_of_current_day() -> DateTime<Utc> {
    start_of_day(Utc::now())
}

/// Whole-day windows fully contained in [since, until), ascending.
/// A mid-day bound shrinks the range inward rather than emitting partial windows.
pub fn day_windows(since: DateTime<Utc>, until: DateTime<Utc>) -> Vec<DayWindow> {
    let mut windows = Vec::new();
    let mut start = ceil_to_day(since);
    while start + Duration::days(1) <= until {
        windows.push(DayWindow {
            start,
            end: start + Duration::days(1),
        });
        start += Duration::days(1);
    }
    windows
}
