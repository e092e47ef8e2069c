// Engine configuration.
// Values come from the environment with sensible fallbacks, the same way
// the application shell reads HOST/PORT/DATABASE_URL at startup.

use std::time::Duration as StdDuration;

use chrono::Duration;

/// Tunables for the booking coordinator and resolver
#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Maximum time a request waits for the per-pitch booking gate
    /// before failing with `BookingError::Busy`.
    pub gate_wait: StdDuration,
    /// How far into the future a booking may start.
    pub booking_horizon: Duration,
    /// Maximum length of a single reservation.
    pub max_duration: Duration,
    /// Step size used when scanning for alternative slots.
    pub suggestion_granularity: Duration,
    /// Maximum number of alternative slots returned on rejection.
    pub max_suggestions: usize,
    /// Pause between completion-sweeper passes.
    pub sweep_interval: StdDuration,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            gate_wait: StdDuration::from_secs(5),
            booking_horizon: Duration::days(90),
            max_duration: Duration::hours(12),
            suggestion_granularity: Duration::minutes(30),
            max_suggestions: 4,
            sweep_interval: StdDuration::from_secs(60),
        }
    }
}

impl BookingConfig {
    /// Build a configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    ///
    /// Recognized variables:
    /// - `BOOKING_GATE_WAIT_MS`
    /// - `BOOKING_HORIZON_DAYS`
    /// - `BOOKING_MAX_DURATION_HOURS`
    /// - `BOOKING_SUGGESTION_GRANULARITY_MINUTES`
    /// - `BOOKING_MAX_SUGGESTIONS`
    /// - `BOOKING_SWEEP_INTERVAL_SECS`
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            gate_wait: env_parse("BOOKING_GATE_WAIT_MS")
                .map(StdDuration::from_millis)
                .unwrap_or(defaults.gate_wait),
            booking_horizon: env_parse("BOOKING_HORIZON_DAYS")
                .map(Duration::days)
                .unwrap_or(defaults.booking_horizon),
            max_duration: env_parse("BOOKING_MAX_DURATION_HOURS")
                .map(Duration::hours)
                .unwrap_or(defaults.max_duration),
            suggestion_granularity: env_parse("BOOKING_SUGGESTION_GRANULARITY_MINUTES")
                .map(Duration::minutes)
                .unwrap_or(defaults.suggestion_granularity),
            max_suggestions: env_parse("BOOKING_MAX_SUGGESTIONS")
                .unwrap_or(defaults.max_suggestions),
            sweep_interval: env_parse("BOOKING_SWEEP_INTERVAL_SECS")
                .map(StdDuration::from_secs)
                .unwrap_or(defaults.sweep_interval),
        };

        tracing::debug!("Loaded booking configuration: {:?}", config);
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BookingConfig::default();
        assert_eq!(config.gate_wait, StdDuration::from_secs(5));
        assert_eq!(config.booking_horizon, Duration::days(90));
        assert_eq!(config.max_duration, Duration::hours(12));
        assert_eq!(config.suggestion_granularity, Duration::minutes(30));
        assert_eq!(config.max_suggestions, 4);
    }

    #[test]
    fn test_env_parse_ignores_garbage() {
        std::env::set_var("BOOKING_TEST_GARBAGE", "not-a-number");
        let parsed: Option<u64> = env_parse("BOOKING_TEST_GARBAGE");
        assert_eq!(parsed, None);
        std::env::remove_var("BOOKING_TEST_GARBAGE");
    }
}
