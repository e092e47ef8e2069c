use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::interval::TimeInterval;
use crate::reservations::recurrence::RecurrenceRule;

/// Reservation status over its lifecycle.
/// `requested` is transient and never persisted; a reservation record only
/// exists once a request has been accepted into `scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Scheduled,
    Done,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Scheduled => "scheduled",
            ReservationStatus::Done => "done",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "scheduled" => Ok(ReservationStatus::Scheduled),
            "done" => Ok(ReservationStatus::Done),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Done | ReservationStatus::Cancelled)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A booked time interval on a pitch by a reserver.
/// Never physically deleted; cancellation is a status change so the audit
/// history survives.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: Uuid,
    pub pitch_id: Uuid,
    pub reserver_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub recurring: bool,
    /// Links the occurrences expanded from one recurrence template.
    pub series_id: Option<Uuid>,
    pub status: ReservationStatus,
    pub payment_id: Option<Uuid>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new_unchecked(self.start_time, self.end_time)
    }
}

/// Request DTO for a booking attempt
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "crate::validation::validate_booking_window"))]
pub struct BookingRequest {
    pub pitch_id: Uuid,
    pub reserver_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// When set, the request is a recurrence template expanded into one
    /// reservation per occurrence.
    #[serde(default)]
    #[validate]
    pub recurrence: Option<RecurrenceRule>,
    /// Ask the resolver for alternative slots when the request is rejected.
    #[serde(default)]
    pub with_suggestions: bool,
}

impl BookingRequest {
    pub fn new(
        pitch_id: Uuid,
        reserver_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            pitch_id,
            reserver_id,
            start_time,
            end_time,
            recurrence: None,
            with_suggestions: false,
        }
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn suggesting_alternatives(mut self) -> Self {
        self.with_suggestions = true;
        self
    }
}
