// Booking coordinator: turns reservation requests into committed,
// conflict-free slots under concurrency.
//
// Correctness is per pitch. Each pitch gets its own gate (a lazily
// created async mutex in a concurrent map), so requests for different
// pitches run fully in parallel while the check-then-commit sequence for
// one pitch is atomic relative to its other writers. Availability
// previews read a recent snapshot without the gate and must re-validate
// at commit time.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tokio::time::timeout;
use uuid::Uuid;
use validator::Validate;

use crate::calendar::SlotCalendar;
use crate::clock::Clock;
use crate::config::BookingConfig;
use crate::error::BookingError;
use crate::events::{BookingEvent, EventPublisher};
use crate::interval::TimeInterval;
use crate::pitches::{Pitch, PitchRepository};
use crate::reservations::{
    BookingRequest, Reservation, ReservationRepository, ReservationStatus, StatusMachine,
};
use crate::resolver::{ConflictResolver, Decision, ResolvePolicy};

/// Outcome for one requested interval
#[derive(Debug, Clone)]
pub enum BookingOutcome {
    Confirmed(Reservation),
    Rejected {
        conflicts: Vec<Uuid>,
        alternatives: Vec<TimeInterval>,
    },
}

impl BookingOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, BookingOutcome::Confirmed(_))
    }
}

/// Outcome of one occurrence of a (possibly recurring) request
#[derive(Debug, Clone)]
pub struct OccurrenceOutcome {
    pub interval: TimeInterval,
    pub outcome: BookingOutcome,
}

/// Result of a booking request.
/// A plain request yields exactly one occurrence; a recurring request
/// yields one per expanded occurrence, and a partial failure (some
/// occurrences conflicting) does not abort the rest of the series.
#[derive(Debug, Clone)]
pub struct BookingResult {
    pub series_id: Option<Uuid>,
    pub outcomes: Vec<OccurrenceOutcome>,
}

impl BookingResult {
    pub fn confirmed(&self) -> Vec<&Reservation> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                BookingOutcome::Confirmed(reservation) => Some(reservation),
                BookingOutcome::Rejected { .. } => None,
            })
            .collect()
    }

    pub fn confirmed_count(&self) -> usize {
        self.confirmed().len()
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes.len() - self.confirmed_count()
    }

    /// The single outcome of a non-recurring request
    pub fn single(&self) -> Option<&BookingOutcome> {
        match self.outcomes.as_slice() {
            [only] => Some(&only.outcome),
            _ => None,
        }
    }
}

struct PitchSlot {
    pitch: Pitch,
    /// Serialization point: exclusive writer state for one pitch.
    gate: Mutex<SlotCalendar>,
    /// Recent read-only view for previews; refreshed on every commit.
    snapshot: RwLock<Arc<SlotCalendar>>,
}

impl PitchSlot {
    fn refresh_snapshot(&self, calendar: &SlotCalendar) {
        match self.snapshot.write() {
            Ok(mut snapshot) => *snapshot = Arc::new(calendar.clone()),
            Err(_) => tracing::warn!(
                "Snapshot lock poisoned for pitch {}; previews may go stale",
                self.pitch.id
            ),
        }
    }

    fn read_snapshot(&self) -> Arc<SlotCalendar> {
        match self.snapshot.read() {
            Ok(snapshot) => snapshot.clone(),
            // A poisoned snapshot only degrades previews; fall back to an
            // empty view of the same hours.
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Orchestrates validation, per-pitch serialization, conflict resolution,
/// transactional commit and side-effect dispatch
pub struct BookingCoordinator {
    reservations: Arc<dyn ReservationRepository>,
    pitches: Arc<dyn PitchRepository>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
    slots: DashMap<Uuid, Arc<PitchSlot>>,
}

impl BookingCoordinator {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        pitches: Arc<dyn PitchRepository>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        Self {
            reservations,
            pitches,
            publisher,
            clock,
            config,
            slots: DashMap::new(),
        }
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Request a booking; expands a recurrence template into independent
    /// occurrences, each resolved and committed on its own.
    ///
    /// Errors: `Validation` before any state is touched, `Busy` when the
    /// pitch gate cannot be acquired in time, `Repository` when a commit
    /// fails (already-committed occurrences of a series stand; the slot
    /// calendar never holds an occurrence whose reservation row was not
    /// written).
    pub async fn request_booking(
        &self,
        request: BookingRequest,
    ) -> Result<BookingResult, BookingError> {
        request
            .validate()
            .map_err(|errors| BookingError::Validation(errors.to_string()))?;
        let first = TimeInterval::new(request.start_time, request.end_time)?;
        let now = self.clock.now();
        self.validate_window(&first, now)?;

        let (series_id, candidates, recurring) = match &request.recurrence {
            Some(rule) => (Some(Uuid::new_v4()), rule.expand(first), true),
            None => (None, vec![first], false),
        };

        let policy = if request.with_suggestions {
            ResolvePolicy::Suggest {
                granularity: self.config.suggestion_granularity,
                limit: self.config.max_suggestions,
            }
        } else {
            ResolvePolicy::Reject
        };

        let slot = self.slot(request.pitch_id).await?;
        let mut calendar = timeout(self.config.gate_wait, slot.gate.lock())
            .await
            .map_err(|_| BookingError::Busy(request.pitch_id))?;
        calendar.prune_ended_before(now);

        let committed = self
            .commit_candidates(
                &mut calendar,
                &slot.pitch,
                &request,
                candidates,
                recurring,
                series_id,
                &policy,
                now,
            )
            .await;

        // The snapshot must reflect whatever was committed, even when a
        // mid-series repository failure cuts the loop short.
        slot.refresh_snapshot(&calendar);
        drop(calendar);

        let outcomes = committed?;
        let result = BookingResult {
            series_id,
            outcomes,
        };

        for reservation in result.confirmed() {
            self.dispatch_booking_side_effects(&slot.pitch, reservation)
                .await;
        }

        Ok(result)
    }

    /// Speculative availability check against a recent snapshot.
    /// Does not take the pitch gate; the answer can be stale by the time
    /// a booking commits, so bookings always re-validate under the gate.
    pub async fn preview(
        &self,
        pitch_id: Uuid,
        interval: TimeInterval,
        policy: ResolvePolicy,
    ) -> Result<Decision, BookingError> {
        let slot = self.slot(pitch_id).await?;
        let snapshot = slot.read_snapshot();
        Ok(ConflictResolver::resolve(&snapshot, &interval, &policy))
    }

    /// Snapshot-based availability query
    pub async fn is_available(
        &self,
        pitch_id: Uuid,
        interval: TimeInterval,
    ) -> Result<bool, BookingError> {
        Ok(self
            .preview(pitch_id, interval, ResolvePolicy::Reject)
            .await?
            .is_accept())
    }

    /// Cancel a scheduled reservation before its start, freeing its slot
    pub async fn cancel(
        &self,
        reservation_id: Uuid,
        reason: Option<&str>,
    ) -> Result<Reservation, BookingError> {
        let reservation = self.find_reservation(reservation_id).await?;
        let slot = self.slot(reservation.pitch_id).await?;
        let mut calendar = timeout(self.config.gate_wait, slot.gate.lock())
            .await
            .map_err(|_| BookingError::Busy(reservation.pitch_id))?;

        // Re-check under the gate: a concurrent cancel or sweep may have
        // finished the lifecycle while we were waiting.
        let current = self.find_reservation(reservation_id).await?;
        StatusMachine::transition(current.status, ReservationStatus::Cancelled)
            .map_err(BookingError::InvalidTransition)?;
        if self.clock.now() >= current.start_time {
            return Err(BookingError::InvalidTransition(format!(
                "reservation {} has already started",
                reservation_id
            )));
        }

        let updated = self
            .reservations
            .update_status(reservation_id, ReservationStatus::Cancelled, reason)
            .await?;
        calendar.release(reservation_id);
        slot.refresh_snapshot(&calendar);
        drop(calendar);

        tracing::info!("Cancelled reservation {}", reservation_id);
        self.dispatch(BookingEvent::BookingCancelled {
            reservation_id,
            reserver_id: updated.reserver_id,
            reason: updated.cancel_reason.clone(),
        })
        .await;

        Ok(updated)
    }

    /// Mark a scheduled reservation done once its interval has ended.
    /// Normally driven by the completion sweeper.
    pub async fn mark_done(&self, reservation_id: Uuid) -> Result<Reservation, BookingError> {
        let reservation = self.find_reservation(reservation_id).await?;
        let slot = self.slot(reservation.pitch_id).await?;
        let mut calendar = timeout(self.config.gate_wait, slot.gate.lock())
            .await
            .map_err(|_| BookingError::Busy(reservation.pitch_id))?;

        let current = self.find_reservation(reservation_id).await?;
        StatusMachine::transition(current.status, ReservationStatus::Done)
            .map_err(BookingError::InvalidTransition)?;
        if self.clock.now() < current.end_time {
            return Err(BookingError::InvalidTransition(format!(
                "reservation {} has not ended yet",
                reservation_id
            )));
        }

        let updated = self
            .reservations
            .update_status(reservation_id, ReservationStatus::Done, None)
            .await?;
        calendar.release(reservation_id);
        slot.refresh_snapshot(&calendar);

        tracing::debug!("Marked reservation {} done", reservation_id);
        Ok(updated)
    }

    /// Drop the cached calendar for a pitch (e.g. after its operating
    /// hours changed); the next request rebuilds it from the repository.
    pub fn invalidate_pitch(&self, pitch_id: Uuid) {
        self.slots.remove(&pitch_id);
    }

    /// Drop cached slots for pitches with no remaining scheduled entries.
    /// Runs during sweep passes so long-idle pitches do not pin memory.
    ///
    /// Only slots referenced by nothing but the map itself are eligible;
    /// a slot some task still holds (or whose gate is taken) is kept, so
    /// eviction can never race an in-flight commit.
    pub fn evict_idle(&self) {
        let now = self.clock.now();
        self.slots.retain(|pitch_id, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let Ok(mut calendar) = slot.gate.try_lock() else {
                return true;
            };
            calendar.prune_ended_before(now);
            if calendar.is_empty() {
                tracing::debug!("Evicting idle calendar for pitch {}", pitch_id);
                false
            } else {
                true
            }
        });
    }

    /// Number of pitches with a cached calendar
    pub fn cached_pitches(&self) -> usize {
        self.slots.len()
    }

    async fn find_reservation(&self, reservation_id: Uuid) -> Result<Reservation, BookingError> {
        self.reservations
            .find_by_id(reservation_id)
            .await?
            .ok_or(BookingError::ReservationNotFound(reservation_id))
    }

    fn validate_window(
        &self,
        interval: &TimeInterval,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if interval.start() < now {
            return Err(BookingError::Validation(format!(
                "booking start {} is in the past",
                interval.start()
            )));
        }
        if interval.start() > now + self.config.booking_horizon {
            return Err(BookingError::Validation(format!(
                "booking start {} is beyond the booking horizon",
                interval.start()
            )));
        }
        if interval.duration() > self.config.max_duration {
            return Err(BookingError::Validation(format!(
                "booking duration {} minutes exceeds the maximum",
                interval.duration().num_minutes()
            )));
        }
        Ok(())
    }

    /// Resolve and commit each candidate in turn while holding the gate.
    /// Repository write first, calendar second: a failed write leaves no
    /// calendar mutation for that occurrence.
    #[allow(clippy::too_many_arguments)]
    async fn commit_candidates(
        &self,
        calendar: &mut SlotCalendar,
        pitch: &Pitch,
        request: &BookingRequest,
        candidates: Vec<TimeInterval>,
        recurring: bool,
        series_id: Option<Uuid>,
        policy: &ResolvePolicy,
        now: DateTime<Utc>,
    ) -> Result<Vec<OccurrenceOutcome>, BookingError> {
        let mut outcomes = Vec::with_capacity(candidates.len());
        for interval in candidates {
            let decision = ConflictResolver::resolve(calendar, &interval, policy);
            let outcome = match decision {
                Decision::Accept => {
                    let reservation = Reservation {
                        id: Uuid::new_v4(),
                        pitch_id: pitch.id,
                        reserver_id: request.reserver_id,
                        start_time: interval.start(),
                        end_time: interval.end(),
                        recurring,
                        series_id,
                        status: ReservationStatus::Scheduled,
                        payment_id: None,
                        cancel_reason: None,
                        created_at: now,
                        updated_at: now,
                    };
                    self.reservations.save(&reservation).await?;
                    calendar.book(reservation.id, interval)?;
                    tracing::info!(
                        "Committed reservation {} on pitch {} for {}",
                        reservation.id,
                        pitch.id,
                        interval
                    );
                    BookingOutcome::Confirmed(reservation)
                }
                Decision::Reject { conflicts } => {
                    tracing::debug!(
                        "Rejected booking on pitch {} for {}: {} conflict(s)",
                        pitch.id,
                        interval,
                        conflicts.len()
                    );
                    BookingOutcome::Rejected {
                        conflicts,
                        alternatives: Vec::new(),
                    }
                }
                Decision::Suggest {
                    conflicts,
                    alternatives,
                } => BookingOutcome::Rejected {
                    conflicts,
                    alternatives,
                },
            };
            outcomes.push(OccurrenceOutcome { interval, outcome });
        }
        Ok(outcomes)
    }

    async fn dispatch_booking_side_effects(&self, pitch: &Pitch, reservation: &Reservation) {
        self.dispatch(BookingEvent::PaymentInitiate {
            reservation_id: reservation.id,
            reserver_id: reservation.reserver_id,
            amount: booking_amount(pitch.hourly_rate, &reservation.interval()),
        })
        .await;
        self.dispatch(BookingEvent::BookingConfirmed {
            reservation_id: reservation.id,
            pitch_id: reservation.pitch_id,
            reserver_id: reservation.reserver_id,
            start_time: reservation.start_time,
            end_time: reservation.end_time,
        })
        .await;
    }

    /// Fire-and-forget publish: a failure is logged and left to the
    /// messaging collaborator's retry policy, never unwinding the commit.
    async fn dispatch(&self, event: BookingEvent) {
        if let Err(err) = self.publisher.publish(&event).await {
            tracing::warn!(
                "Failed to publish {} for reservation {}: {}",
                event.kind(),
                event.reservation_id(),
                err
            );
        }
    }

    /// Fetch or lazily create the per-pitch slot, rebuilding the calendar
    /// from the repository on first access.
    async fn slot(&self, pitch_id: Uuid) -> Result<Arc<PitchSlot>, BookingError> {
        if let Some(slot) = self.slots.get(&pitch_id) {
            return Ok(slot.clone());
        }

        let pitch = self
            .pitches
            .find_by_id(pitch_id)
            .await?
            .ok_or(BookingError::PitchNotFound(pitch_id))?;

        // Wide enough to cover the horizon plus the furthest occurrence a
        // maximal recurrence starting at the horizon can reach.
        let now = self.clock.now();
        let window = TimeInterval::new(
            now - chrono::Duration::days(1),
            now + self.config.booking_horizon + chrono::Duration::weeks(53),
        )?;
        let existing = self
            .reservations
            .find_scheduled_by_pitch(pitch_id, window)
            .await?;
        let calendar = SlotCalendar::from_reservations(
            pitch.hours.clone(),
            existing.iter().map(|r| (r.id, r.interval())),
        );

        let slot = Arc::new(PitchSlot {
            pitch,
            gate: Mutex::new(calendar.clone()),
            snapshot: RwLock::new(Arc::new(calendar)),
        });
        // Two concurrent builders race benignly here; both loaded the
        // same persisted state and the map keeps one of them.
        Ok(self.slots.entry(pitch_id).or_insert(slot).clone())
    }
}

/// Amount owed for an interval at the pitch's hourly rate
fn booking_amount(hourly_rate: Decimal, interval: &TimeInterval) -> Decimal {
    let minutes = Decimal::from(interval.duration().num_minutes());
    (hourly_rate * minutes / Decimal::from(60)).round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn iv(start_h: u32, end_h: u32) -> TimeInterval {
        TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, end_h, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_booking_amount_full_hours() {
        assert_eq!(booking_amount(dec!(45), &iv(10, 11)), dec!(45));
        assert_eq!(booking_amount(dec!(45), &iv(10, 12)), dec!(90));
    }

    #[test]
    fn test_booking_amount_fractional_hour() {
        let interval = TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 30, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(booking_amount(dec!(50), &interval), dec!(75));
    }
}
