use chrono::{Datelike, NaiveTime, Timelike, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BookingError;
use crate::interval::TimeInterval;

/// Playing surface of a pitch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurfaceType {
    NaturalGrass,
    ArtificialTurf,
    Hybrid,
    Indoor,
}

impl SurfaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SurfaceType::NaturalGrass => "natural_grass",
            SurfaceType::ArtificialTurf => "artificial_turf",
            SurfaceType::Hybrid => "hybrid",
            SurfaceType::Indoor => "indoor",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "natural_grass" => Ok(SurfaceType::NaturalGrass),
            "artificial_turf" => Ok(SurfaceType::ArtificialTurf),
            "hybrid" => Ok(SurfaceType::Hybrid),
            "indoor" => Ok(SurfaceType::Indoor),
            _ => Err(format!("Invalid surface type: {}", s)),
        }
    }
}

impl std::fmt::Display for SurfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pitch size by team format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PitchSize {
    FiveASide,
    SevenASide,
    ElevenASide,
}

impl PitchSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchSize::FiveASide => "five_a_side",
            PitchSize::SevenASide => "seven_a_side",
            PitchSize::ElevenASide => "eleven_a_side",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "five_a_side" => Ok(PitchSize::FiveASide),
            "seven_a_side" => Ok(PitchSize::SevenASide),
            "eleven_a_side" => Ok(PitchSize::ElevenASide),
            _ => Err(format!("Invalid pitch size: {}", s)),
        }
    }
}

impl std::fmt::Display for PitchSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opening window for a single weekday, `[open, close)` in UTC.
/// A close of `00:00` means midnight at the end of the day, so a pitch
/// can stay open until (or across the whole of) the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl DayHours {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, BookingError> {
        if close != NaiveTime::MIN && open >= close {
            return Err(BookingError::Validation(format!(
                "opening time {} must be before closing time {}",
                open, close
            )));
        }
        Ok(Self { open, close })
    }

    fn covers(&self, interval: &TimeInterval) -> bool {
        let open = minutes_of(self.open);
        // Midnight as a close or an interval end means minute 1440 of
        // the starting day.
        let close = if self.close == NaiveTime::MIN {
            24 * 60
        } else {
            minutes_of(self.close)
        };
        let start = minutes_of(interval.start().time());
        let end = if interval.end().time() == NaiveTime::MIN {
            24 * 60
        } else {
            minutes_of(interval.end().time())
        };
        open <= start && end <= close
    }
}

fn minutes_of(t: NaiveTime) -> u32 {
    t.hour() * 60 + t.minute()
}

/// Operating hours per weekday; a missing entry means closed that day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySchedule {
    pub monday: Option<DayHours>,
    pub tuesday: Option<DayHours>,
    pub wednesday: Option<DayHours>,
    pub thursday: Option<DayHours>,
    pub friday: Option<DayHours>,
    pub saturday: Option<DayHours>,
    pub sunday: Option<DayHours>,
}

impl WeeklySchedule {
    /// Same hours every day of the week
    pub fn uniform(hours: DayHours) -> Self {
        Self {
            monday: Some(hours),
            tuesday: Some(hours),
            wednesday: Some(hours),
            thursday: Some(hours),
            friday: Some(hours),
            saturday: Some(hours),
            sunday: Some(hours),
        }
    }

    pub fn for_weekday(&self, weekday: Weekday) -> Option<&DayHours> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    /// Whether the candidate lies fully within the configured hours for
    /// the weekday it starts on. Intervals crossing a day boundary are
    /// never covered.
    pub fn covers(&self, interval: &TimeInterval) -> bool {
        if !interval.is_same_day() {
            return false;
        }
        self.for_weekday(interval.start().weekday())
            .map(|hours| hours.covers(interval))
            .unwrap_or(false)
    }
}

/// A bookable pitch owned by an owner.
/// Immutable for the duration of a booking transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pitch {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub size: PitchSize,
    pub surface: SurfaceType,
    pub location: String,
    pub hourly_rate: Decimal,
    pub hours: WeeklySchedule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn nine_to_five() -> DayHours {
        DayHours::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn saturday_interval(start_h: u32, end_h: u32) -> TimeInterval {
        // 2024-06-01 is a Saturday
        TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, start_h, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, end_h, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_day_hours_rejects_inverted_window() {
        let open = NaiveTime::from_hms_opt(17, 0, 0).unwrap();
        let close = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert!(DayHours::new(open, close).is_err());
        assert!(DayHours::new(open, open).is_err());
    }

    #[test]
    fn test_midnight_close_covers_the_last_slot_of_the_day() {
        let schedule = WeeklySchedule::uniform(
            DayHours::new(
                NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                NaiveTime::MIN,
            )
            .unwrap(),
        );

        let last_slot = TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(schedule.covers(&last_slot));

        // Crossing into the next day is still out.
        let crossing = TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 2, 1, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(!schedule.covers(&crossing));

        // Before opening is still out.
        assert!(!schedule.covers(&saturday_interval(10, 11)));
    }

    #[test]
    fn test_open_around_the_clock() {
        let all_day = DayHours::new(NaiveTime::MIN, NaiveTime::MIN).unwrap();
        let schedule = WeeklySchedule::uniform(all_day);

        let whole_day = TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(schedule.covers(&whole_day));
    }

    #[test]
    fn test_schedule_covers_interval_within_hours() {
        let schedule = WeeklySchedule::uniform(nine_to_five());
        assert!(schedule.covers(&saturday_interval(10, 11)));
        assert!(schedule.covers(&saturday_interval(9, 17)));
    }

    #[test]
    fn test_schedule_rejects_interval_outside_hours() {
        let schedule = WeeklySchedule::uniform(nine_to_five());
        assert!(!schedule.covers(&saturday_interval(8, 10)));
        assert!(!schedule.covers(&saturday_interval(16, 18)));
        assert!(!schedule.covers(&saturday_interval(18, 19)));
    }

    #[test]
    fn test_schedule_rejects_closed_weekday() {
        let schedule = WeeklySchedule {
            saturday: None,
            ..WeeklySchedule::uniform(nine_to_five())
        };
        assert!(!schedule.covers(&saturday_interval(10, 11)));
    }

    #[test]
    fn test_schedule_rejects_day_crossing_interval() {
        let schedule = WeeklySchedule::uniform(
            DayHours::new(
                NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
            )
            .unwrap(),
        );
        let crossing = TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 23, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 2, 1, 0, 0).unwrap(),
        )
        .unwrap();
        assert!(!schedule.covers(&crossing));
    }

    #[test]
    fn test_surface_type_round_trip() {
        for surface in [
            SurfaceType::NaturalGrass,
            SurfaceType::ArtificialTurf,
            SurfaceType::Hybrid,
            SurfaceType::Indoor,
        ] {
            assert_eq!(SurfaceType::from_str(surface.as_str()), Ok(surface));
        }
        assert!(SurfaceType::from_str("clay").is_err());
    }

    #[test]
    fn test_pitch_construction() {
        let pitch = Pitch {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Riverside 5s".to_string(),
            size: PitchSize::FiveASide,
            surface: SurfaceType::ArtificialTurf,
            location: "Riverside Park".to_string(),
            hourly_rate: dec!(45.00),
            hours: WeeklySchedule::uniform(nine_to_five()),
        };
        assert_eq!(pitch.size.as_str(), "five_a_side");
        assert_eq!(pitch.hourly_rate, dec!(45.00));
    }
}
