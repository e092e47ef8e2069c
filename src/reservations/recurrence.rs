use chrono::Duration;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::interval::TimeInterval;

/// How often a recurrence template repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    fn step(&self) -> Duration {
        match self {
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::weeks(1),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekly => write!(f, "weekly"),
        }
    }
}

/// Repeat rule expanded into independent reservation candidates.
///
/// Expansion is an explicit step producing one candidate interval per
/// occurrence; each candidate then runs through the conflict resolver on
/// its own, so recurrence never special-cases the conflict logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Total number of occurrences, including the first one.
    #[validate(range(min = 1, max = 52, message = "Occurrences must be between 1 and 52"))]
    pub occurrences: u32,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, occurrences: u32) -> Self {
        Self {
            frequency,
            occurrences,
        }
    }

    /// Expand the rule into candidate intervals starting from `first`
    pub fn expand(&self, first: TimeInterval) -> Vec<TimeInterval> {
        let step = self.frequency.step();
        (0..self.occurrences)
            .map(|i| first.shifted(step * i as i32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use validator::Validate;

    fn first_interval() -> TimeInterval {
        TimeInterval::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_weekly_expansion() {
        let rule = RecurrenceRule::new(Frequency::Weekly, 3);
        let occurrences = rule.expand(first_interval());

        assert_eq!(occurrences.len(), 3);
        assert_eq!(occurrences[0], first_interval());
        assert_eq!(
            occurrences[1].start(),
            Utc.with_ymd_and_hms(2024, 6, 8, 10, 0, 0).unwrap()
        );
        assert_eq!(
            occurrences[2].start(),
            Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_daily_expansion_preserves_duration() {
        let rule = RecurrenceRule::new(Frequency::Daily, 5);
        for occurrence in rule.expand(first_interval()) {
            assert_eq!(occurrence.duration(), Duration::hours(1));
        }
    }

    #[test]
    fn test_single_occurrence_is_identity() {
        let rule = RecurrenceRule::new(Frequency::Daily, 1);
        assert_eq!(rule.expand(first_interval()), vec![first_interval()]);
    }

    #[test]
    fn test_occurrence_bounds() {
        assert!(RecurrenceRule::new(Frequency::Weekly, 0).validate().is_err());
        assert!(RecurrenceRule::new(Frequency::Weekly, 53).validate().is_err());
        assert!(RecurrenceRule::new(Frequency::Weekly, 52).validate().is_ok());
    }
}
