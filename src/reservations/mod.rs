// Reservation domain: lifecycle state machine, recurrence expansion and
// persistence.

pub mod models;
pub mod recurrence;
pub mod repository;
pub mod status_machine;

pub use models::{BookingRequest, Reservation, ReservationStatus};
pub use recurrence::{Frequency, RecurrenceRule};
pub use repository::{
    InMemoryReservationRepository, PostgresReservationRepository, ReservationRepository,
};
pub use status_machine::StatusMachine;
