// Conflict resolver: pure accept/reject/suggest decisions over a slot
// calendar snapshot. Never mutates state, so it is safe to call
// speculatively for availability previews.

use chrono::Duration;
use uuid::Uuid;

use crate::calendar::SlotCalendar;
use crate::interval::TimeInterval;

/// Policy applied when resolving a requested interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvePolicy {
    /// Reject on any overlap (the default booking policy).
    Reject,
    /// On rejection, scan forward within the same day for free
    /// alternatives of the same duration.
    Suggest {
        granularity: Duration,
        limit: usize,
    },
}

/// Outcome of resolving a requested interval against the calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject {
        conflicts: Vec<Uuid>,
    },
    Suggest {
        conflicts: Vec<Uuid>,
        alternatives: Vec<TimeInterval>,
    },
}

impl Decision {
    pub fn is_accept(&self) -> bool {
        matches!(self, Decision::Accept)
    }
}

/// Pure decision procedure over a calendar snapshot
pub struct ConflictResolver;

impl ConflictResolver {
    /// Decide whether the requested interval can be booked.
    ///
    /// Out-of-hours requests resolve to a rejection with an empty conflict
    /// set: nothing overlaps, the slot is simply not bookable.
    pub fn resolve(
        calendar: &SlotCalendar,
        interval: &TimeInterval,
        policy: &ResolvePolicy,
    ) -> Decision {
        let within_hours = calendar.hours().covers(interval);
        let conflicts = calendar.conflicting_ids(interval);
        if within_hours && conflicts.is_empty() {
            return Decision::Accept;
        }

        match policy {
            ResolvePolicy::Reject => Decision::Reject { conflicts },
            ResolvePolicy::Suggest { granularity, limit } => {
                let alternatives =
                    Self::scan_alternatives(calendar, interval, *granularity, *limit);
                Decision::Suggest {
                    conflicts,
                    alternatives,
                }
            }
        }
    }

    /// Scan forward from the requested start in fixed-size steps, staying
    /// within the same day, and collect free slots of the same duration.
    /// The forward scan yields alternatives ordered by proximity to the
    /// requested start.
    fn scan_alternatives(
        calendar: &SlotCalendar,
        requested: &TimeInterval,
        granularity: Duration,
        limit: usize,
    ) -> Vec<TimeInterval> {
        if limit == 0 || granularity <= Duration::zero() {
            return Vec::new();
        }

        let day_end = requested
            .start()
            .date_naive()
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc());
        let Some(day_end) = day_end else {
            return Vec::new();
        };

        let mut alternatives = Vec::new();
        let mut candidate = requested.shifted(granularity);
        while candidate.end() <= day_end && alternatives.len() < limit {
            if calendar.is_available(&candidate) {
                alternatives.push(candidate);
            }
            candidate = candidate.shifted(granularity);
        }
        alternatives
    }
}
