use crate::reservations::ReservationStatus;

/// Guard for reservation status transitions
///
/// Valid transitions:
/// - Scheduled → Done (once the interval has ended)
/// - Scheduled → Cancelled (before the interval starts)
///
/// Done and Cancelled are terminal: every transition out of them is
/// rejected, including repeating the transition that got there. Repeated
/// cancel/done calls must surface as errors to the caller.
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid
    pub fn is_valid_transition(from: ReservationStatus, to: ReservationStatus) -> bool {
        matches!(
            (from, to),
            (ReservationStatus::Scheduled, ReservationStatus::Done)
                | (ReservationStatus::Scheduled, ReservationStatus::Cancelled)
        )
    }

    /// Attempt to transition from one status to another
    ///
    /// Returns `Ok(to)` if the transition is valid, `Err(message)` otherwise.
    pub fn transition(
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<ReservationStatus, String> {
        if Self::is_valid_transition(from, to) {
            Ok(to)
        } else {
            Err(format!("Invalid status transition from {} to {}", from, to))
        }
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn status_strategy() -> impl Strategy<Value = ReservationStatus> {
        prop_oneof![
            Just(ReservationStatus::Scheduled),
            Just(ReservationStatus::Done),
            Just(ReservationStatus::Cancelled),
        ]
    }

    /// Terminal states never transition anywhere
    #[test]
    fn prop_terminal_states_reject_everything() {
        proptest!(|(to in status_strategy())| {
            prop_assert!(!StatusMachine::is_valid_transition(ReservationStatus::Done, to));
            prop_assert!(!StatusMachine::is_valid_transition(ReservationStatus::Cancelled, to));
        });
    }

    /// Only Scheduled can be left, and only for a terminal state
    #[test]
    fn prop_valid_transitions_leave_scheduled_for_terminal() {
        proptest!(|(from in status_strategy(), to in status_strategy())| {
            if StatusMachine::is_valid_transition(from, to) {
                prop_assert_eq!(from, ReservationStatus::Scheduled);
                prop_assert!(to.is_terminal());
            }
        });
    }

    /// transition() and is_valid_transition() agree
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(from in status_strategy(), to in status_strategy())| {
            let is_valid = StatusMachine::is_valid_transition(from, to);
            let result = StatusMachine::transition(from, to);
            prop_assert_eq!(is_valid, result.is_ok());
        });
    }
}
