// Pitch domain: physical attributes and operating hours.

pub mod models;
pub mod repository;

pub use models::{DayHours, Pitch, PitchSize, SurfaceType, WeeklySchedule};
pub use repository::{InMemoryPitchRepository, PitchRepository, PostgresPitchRepository};
