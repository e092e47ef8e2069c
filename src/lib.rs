//! Booking engine for multi-tenant sports pitch reservations.
//!
//! The engine keeps one in-memory slot calendar per pitch, serializes
//! writes through a per-pitch gate and resolves conflicts before any
//! reservation is committed. Persistence sits behind repository traits
//! (Postgres and in-memory implementations ship here) and post-commit
//! side effects go out through an event publisher.
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use pitch_booking::{
//!     BookingConfig, BookingCoordinator, SystemClock,
//!     events::InMemoryEventPublisher,
//!     pitches::InMemoryPitchRepository,
//!     reservations::InMemoryReservationRepository,
//! };
//!
//! let coordinator = BookingCoordinator::new(
//!     Arc::new(InMemoryReservationRepository::new()),
//!     Arc::new(InMemoryPitchRepository::new()),
//!     Arc::new(InMemoryEventPublisher::new()),
//!     Arc::new(SystemClock),
//!     BookingConfig::from_env(),
//! );
//! ```

pub mod calendar;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod interval;
pub mod pitches;
pub mod reservations;
pub mod resolver;
pub mod sweeper;
pub mod validation;

pub use calendar::SlotCalendar;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::BookingConfig;
pub use coordinator::{BookingCoordinator, BookingOutcome, BookingResult, OccurrenceOutcome};
pub use error::BookingError;
pub use events::{BookingEvent, EventPublisher};
pub use interval::TimeInterval;
pub use pitches::{Pitch, PitchRepository};
pub use reservations::{BookingRequest, Reservation, ReservationRepository, ReservationStatus};
pub use resolver::{ConflictResolver, Decision, ResolvePolicy};
pub use sweeper::CompletionSweeper;
