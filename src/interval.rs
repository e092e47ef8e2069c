use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// Half-open time interval `[start, end)`
///
/// The constructor enforces `start < end`, so every value of this type is a
/// non-empty interval. Two bookings that share only a boundary instant
/// (one ends exactly when the other starts) do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeInterval {
    /// Create an interval, rejecting empty or inverted bounds
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::Validation(format!(
                "interval start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Rehydrate an interval whose bounds were already validated at
    /// creation time (e.g. loaded from the repository).
    pub(crate) fn new_unchecked(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(start < end);
        Self { start, end }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Standard half-open overlap test: `start < other.end && end > other.start`
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains_instant(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Same interval shifted forward (or backward, for negative `by`)
    pub fn shifted(&self, by: Duration) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }

    /// Whether the interval starts and ends on the same UTC calendar day.
    /// End exactly at midnight counts as the same day.
    pub fn is_same_day(&self) -> bool {
        let end_date = if self.end.time() == chrono::NaiveTime::MIN {
            (self.end - Duration::nanoseconds(1)).date_naive()
        } else {
            self.end.date_naive()
        };
        self.start.date_naive() == end_date
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
