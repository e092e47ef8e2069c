// Error types for the booking engine.
// Rejections carry structured conflict information so the calling layer
// can present alternatives instead of a bare error string.

use uuid::Uuid;

/// Error type for booking engine operations
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Malformed or out-of-range input. User-correctable, reported
    /// synchronously before any state is touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested interval overlaps existing scheduled reservations.
    /// Carries the ids of every overlapping reservation.
    #[error("interval conflicts with {} scheduled reservation(s)", conflicts.len())]
    Conflict { conflicts: Vec<Uuid> },

    /// Timed out waiting for the per-pitch booking gate. Transient;
    /// callers may retry with backoff.
    #[error("timed out waiting for booking gate on pitch {0}")]
    Busy(Uuid),

    /// Lifecycle misuse (e.g. cancelling an already-cancelled
    /// reservation). Indicates a caller bug, not retryable.
    #[error("invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("pitch not found: {0}")]
    PitchNotFound(Uuid),

    #[error("reservation not found: {0}")]
    ReservationNotFound(Uuid),

    /// Persistence layer failure. A repository failure during commit
    /// leaves no partial slot-calendar mutation behind.
    #[error("repository error: {0}")]
    Repository(String),
}

impl From<sqlx::Error> for BookingError {
    fn from(err: sqlx::Error) -> Self {
        BookingError::Repository(err.to_string())
    }
}

impl BookingError {
    /// Whether the caller can safely retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Busy(_) | BookingError::Repository(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message_counts_reservations() {
        let err = BookingError::Conflict {
            conflicts: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        assert_eq!(
            err.to_string(),
            "interval conflicts with 2 scheduled reservation(s)"
        );
    }

    #[test]
    fn test_busy_is_retryable() {
        assert!(BookingError::Busy(Uuid::new_v4()).is_retryable());
        assert!(BookingError::Repository("down".to_string()).is_retryable());
        assert!(!BookingError::Validation("bad".to_string()).is_retryable());
        assert!(!BookingError::InvalidTransition("done".to_string()).is_retryable());
    }
}
