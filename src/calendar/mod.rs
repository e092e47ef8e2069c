// Slot calendar: per-pitch, read-optimized index of scheduled intervals.
//
// The calendar is a derived projection of the scheduled reservations for
// one pitch. It is maintained inside the same commit boundary as the
// reservation write and rebuilt lazily per pitch on first access, so it
// never silently diverges from persisted state.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::error::BookingError;
use crate::interval::TimeInterval;
use crate::pitches::WeeklySchedule;

/// One booked interval in the calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    pub reservation_id: Uuid,
    pub interval: TimeInterval,
}

/// Booked-interval index for a single pitch
///
/// Entries are keyed by start time. Invariant: no two entries overlap, so
/// overlap queries can stop at the first earlier entry that ends at or
/// before the candidate's start.
#[derive(Debug, Clone)]
pub struct SlotCalendar {
    hours: WeeklySchedule,
    entries: BTreeMap<DateTime<Utc>, CalendarEntry>,
    by_id: HashMap<Uuid, DateTime<Utc>>,
}

impl SlotCalendar {
    pub fn new(hours: WeeklySchedule) -> Self {
        Self {
            hours,
            entries: BTreeMap::new(),
            by_id: HashMap::new(),
        }
    }

    /// Rebuild the index from scheduled reservations.
    /// Entries that overlap an already-inserted one are skipped with a
    /// warning rather than corrupting the index.
    pub fn from_reservations<I>(hours: WeeklySchedule, reservations: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, TimeInterval)>,
    {
        let mut calendar = Self::new(hours);
        for (reservation_id, interval) in reservations {
            if let Err(err) = calendar.insert(reservation_id, interval) {
                tracing::warn!(
                    "Skipping reservation {} while rebuilding calendar: {}",
                    reservation_id,
                    err
                );
            }
        }
        calendar
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hours(&self) -> &WeeklySchedule {
        &self.hours
    }

    /// Whether the candidate can be booked: fully inside operating hours
    /// and overlapping no scheduled entry.
    pub fn is_available(&self, interval: &TimeInterval) -> bool {
        self.hours.covers(interval) && self.overlapping(interval).is_empty()
    }

    /// All entries overlapping the candidate, in start order
    pub fn overlapping(&self, interval: &TimeInterval) -> Vec<CalendarEntry> {
        let mut hits: Vec<CalendarEntry> = Vec::new();
        // Walk backwards from the last entry starting before the candidate
        // ends; the non-overlap invariant lets us stop at the first entry
        // that ends at or before the candidate's start.
        for entry in self.entries.range(..interval.end()).rev().map(|(_, e)| e) {
            if entry.interval.end() <= interval.start() {
                break;
            }
            hits.push(entry.clone());
        }
        hits.reverse();
        hits
    }

    /// Ids of the reservations overlapping the candidate
    pub fn conflicting_ids(&self, interval: &TimeInterval) -> Vec<Uuid> {
        self.overlapping(interval)
            .into_iter()
            .map(|entry| entry.reservation_id)
            .collect()
    }

    /// Add a booking. Idempotent per reservation id: re-booking the same
    /// id with the same interval succeeds without duplication. A
    /// conflicting interval fails with the overlapping reservation ids.
    pub fn book(
        &mut self,
        reservation_id: Uuid,
        interval: TimeInterval,
    ) -> Result<(), BookingError> {
        if let Some(existing_start) = self.by_id.get(&reservation_id) {
            let existing = &self.entries[existing_start];
            if existing.interval == interval {
                return Ok(());
            }
            return Err(BookingError::Validation(format!(
                "reservation {} is already booked for {}",
                reservation_id, existing.interval
            )));
        }

        if !self.hours.covers(&interval) {
            return Err(BookingError::Validation(format!(
                "interval {} is outside the pitch operating hours",
                interval
            )));
        }

        let conflicts = self.conflicting_ids(&interval);
        if !conflicts.is_empty() {
            return Err(BookingError::Conflict { conflicts });
        }

        self.insert(reservation_id, interval)
    }

    /// Remove a booking; no-op if the reservation is not present
    pub fn release(&mut self, reservation_id: Uuid) {
        if let Some(start) = self.by_id.remove(&reservation_id) {
            self.entries.remove(&start);
        }
    }

    /// Drop entries that ended at or before the given instant.
    /// Keeps a long-lived calendar from growing without bound.
    pub fn prune_ended_before(&mut self, instant: DateTime<Utc>) {
        let ended: Vec<Uuid> = self
            .entries
            .values()
            .take_while(|entry| entry.interval.end() <= instant)
            .map(|entry| entry.reservation_id)
            .collect();
        for reservation_id in ended {
            self.release(reservation_id);
        }
    }

    fn insert(
        &mut self,
        reservation_id: Uuid,
        interval: TimeInterval,
    ) -> Result<(), BookingError> {
        let conflicts = self.conflicting_ids(&interval);
        if !conflicts.is_empty() {
            return Err(BookingError::Conflict { conflicts });
        }
        self.by_id.insert(reservation_id, interval.start());
        self.entries.insert(
            interval.start(),
            CalendarEntry {
                reservation_id,
                interval,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitches::DayHours;
    use chrono::{NaiveTime, TimeZone};

    fn all_day_schedule() -> WeeklySchedule {
        WeeklySchedule::uniform(
            DayHours::new(
                NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    fn iv(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeInterval {
        TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, start_h, start_m, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, end_h, end_m, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_book_then_query_round_trip() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        calendar.book(Uuid::new_v4(), iv(10, 0, 11, 0)).unwrap();

        assert!(!calendar.is_available(&iv(10, 0, 11, 0)));
        // Adjacent, non-overlapping slot stays free.
        assert!(calendar.is_available(&iv(11, 0, 12, 0)));
    }

    #[test]
    fn test_book_is_idempotent_per_id() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let id = Uuid::new_v4();

        calendar.book(id, iv(10, 0, 11, 0)).unwrap();
        calendar.book(id, iv(10, 0, 11, 0)).unwrap();
        assert_eq!(calendar.len(), 1);
    }

    #[test]
    fn test_rebooking_same_id_with_different_interval_fails() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let id = Uuid::new_v4();

        calendar.book(id, iv(10, 0, 11, 0)).unwrap();
        let err = calendar.book(id, iv(12, 0, 13, 0)).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(calendar.len(), 1);
    }

    #[test]
    fn test_conflicting_booking_reports_all_overlaps() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        calendar.book(first, iv(10, 0, 11, 0)).unwrap();
        calendar.book(second, iv(11, 0, 12, 0)).unwrap();

        let err = calendar.book(Uuid::new_v4(), iv(10, 30, 11, 30)).unwrap_err();
        match err {
            BookingError::Conflict { conflicts } => {
                assert_eq!(conflicts, vec![first, second]);
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(calendar.len(), 2);
    }

    #[test]
    fn test_booking_outside_hours_rejected() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let before_open = iv(5, 0, 6, 0);
        assert!(!calendar.is_available(&before_open));
        assert!(matches!(
            calendar.book(Uuid::new_v4(), before_open),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_release_frees_the_slot() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let id = Uuid::new_v4();
        calendar.book(id, iv(10, 0, 11, 0)).unwrap();

        calendar.release(id);
        assert!(calendar.is_available(&iv(10, 0, 11, 0)));
        assert!(calendar.is_empty());
    }

    #[test]
    fn test_release_unknown_id_is_noop() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        calendar.book(Uuid::new_v4(), iv(10, 0, 11, 0)).unwrap();
        calendar.release(Uuid::new_v4());
        assert_eq!(calendar.len(), 1);
    }

    #[test]
    fn test_overlapping_ignores_earlier_and_later_entries() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let target = Uuid::new_v4();
        calendar.book(Uuid::new_v4(), iv(8, 0, 9, 0)).unwrap();
        calendar.book(target, iv(10, 0, 11, 0)).unwrap();
        calendar.book(Uuid::new_v4(), iv(12, 0, 13, 0)).unwrap();

        let hits = calendar.overlapping(&iv(10, 30, 11, 30));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].reservation_id, target);
    }

    #[test]
    fn test_from_reservations_skips_overlapping_rows() {
        let keep = Uuid::new_v4();
        let calendar = SlotCalendar::from_reservations(
            all_day_schedule(),
            vec![(keep, iv(10, 0, 11, 0)), (Uuid::new_v4(), iv(10, 30, 11, 30))],
        );
        assert_eq!(calendar.len(), 1);
        assert!(!calendar.is_available(&iv(10, 0, 11, 0)));
    }

    #[test]
    fn test_prune_drops_only_ended_entries() {
        let mut calendar = SlotCalendar::new(all_day_schedule());
        let old = Uuid::new_v4();
        let current = Uuid::new_v4();
        calendar.book(old, iv(8, 0, 9, 0)).unwrap();
        calendar.book(current, iv(10, 0, 11, 0)).unwrap();

        calendar.prune_ended_before(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        assert_eq!(calendar.len(), 1);
        assert!(calendar.is_available(&iv(8, 0, 9, 0)));
        assert!(!calendar.is_available(&iv(10, 0, 11, 0)));
    }
}
