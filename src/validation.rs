// Validation utilities for booking request DTOs.
// Clock-dependent checks (past start, booking horizon) live in the
// coordinator where a Clock is available; only shape checks belong here.

use validator::ValidationError;

use crate::reservations::BookingRequest;

/// Validates that the requested window is a non-empty, forward interval
pub fn validate_booking_window(request: &BookingRequest) -> Result<(), ValidationError> {
    if request.start_time >= request.end_time {
        return Err(ValidationError::new("empty_or_inverted_interval"));
    }
    Ok(())
}
