//! Time and duration conversion utilities.
//!
//! Timeouts may be supplied in milliseconds, seconds or minutes but are
//! always held as whole milliseconds. [`TimeUnit::multiplier`] is the only
//! place the unit table lives.

use crate::error::InvalidConfiguration;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Extension trait for safe Duration conversions.
pub trait DurationExt {
    /// Convert duration to milliseconds as u64, saturating at `u64::MAX`.
    ///
    /// In practice, this is always safe because durations exceeding `u64::MAX`
    /// milliseconds would represent ~584 million years.
    fn as_millis_u64(&self) -> u64;

    /// Drop any sub-millisecond remainder.
    #[must_use]
    fn truncate_to_millis(&self) -> Duration {
        Duration::from_millis(self.as_millis_u64())
    }
}

impl DurationExt for Duration {
    fn as_millis_u64(&self) -> u64 {
        u64::try_from(self.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Unit a timeout is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeUnit {
    #[default]
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    /// Milliseconds per unit.
    #[must_use]
    pub const fn multiplier(self) -> u32 {
        match self {
            Self::Milliseconds => 1,
            Self::Seconds => 1_000,
            Self::Minutes => 60_000,
        }
    }

    /// Map a numeric unit code (`1` ms, `2` s, `3` min).
    ///
    /// Unrecognised codes fall back to milliseconds.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            2 => Self::Seconds,
            3 => Self::Minutes,
            _ => Self::Milliseconds,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "min",
        }
    }

    /// Convert `amount` of this unit into a whole-millisecond interval.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfiguration::NonPositiveTimeout`] when `amount` is
    /// not greater than zero (or truncates to zero milliseconds), and
    /// [`InvalidConfiguration::TimeoutOutOfRange`] when it cannot be
    /// represented as a [`Duration`].
    pub fn interval(self, amount: f64) -> Result<Duration, InvalidConfiguration> {
        if amount.is_nan() || amount <= 0.0 {
            return Err(InvalidConfiguration::NonPositiveTimeout);
        }

        let millis = amount * f64::from(self.multiplier());
        let interval = Duration::try_from_secs_f64(millis / 1_000.0)
            .map_err(|_| InvalidConfiguration::TimeoutOutOfRange)?
            .truncate_to_millis();

        if interval.is_zero() {
            return Err(InvalidConfiguration::NonPositiveTimeout);
        }
        Ok(interval)
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = std::convert::Infallible;

    /// Parse a unit name. Anything unrecognised is milliseconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "second" | "seconds" => Self::Seconds,
            "m" | "min" | "mins" | "minute" | "minutes" => Self::Minutes,
            _ => Self::Milliseconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_millis_u64() {
        let duration = Duration::from_millis(1234);
        assert_eq!(duration.as_millis_u64(), 1234);
    }

    #[test]
    fn test_as_millis_u64_saturates() {
        assert_eq!(Duration::MAX.as_millis_u64(), u64::MAX);
    }

    #[test]
    fn test_truncate_to_millis() {
        let duration = Duration::from_micros(2_999);
        assert_eq!(duration.truncate_to_millis(), Duration::from_millis(2));
    }

    #[test]
    fn test_two_seconds_is_2000_ms() {
        assert_eq!(
            TimeUnit::Seconds.interval(2.0),
            Ok(Duration::from_millis(2_000))
        );
    }

    #[test]
    fn test_minutes_multiplier() {
        assert_eq!(
            TimeUnit::Minutes.interval(1.5),
            Ok(Duration::from_millis(90_000))
        );
    }

    #[test]
    fn test_fraction_truncates() {
        assert_eq!(
            TimeUnit::Milliseconds.interval(250.9),
            Ok(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_non_positive_rejected() {
        assert_eq!(
            TimeUnit::Seconds.interval(0.0),
            Err(InvalidConfiguration::NonPositiveTimeout)
        );
        assert_eq!(
            TimeUnit::Seconds.interval(-3.0),
            Err(InvalidConfiguration::NonPositiveTimeout)
        );
        assert_eq!(
            TimeUnit::Seconds.interval(f64::NAN),
            Err(InvalidConfiguration::NonPositiveTimeout)
        );
    }

    #[test]
    fn test_sub_millisecond_rejected() {
        assert_eq!(
            TimeUnit::Milliseconds.interval(0.4),
            Err(InvalidConfiguration::NonPositiveTimeout)
        );
    }

    #[test]
    fn test_infinite_out_of_range() {
        assert_eq!(
            TimeUnit::Minutes.interval(f64::INFINITY),
            Err(InvalidConfiguration::TimeoutOutOfRange)
        );
    }

    #[test]
    fn test_from_code_defaults_to_milliseconds() {
        assert_eq!(TimeUnit::from_code(1), TimeUnit::Milliseconds);
        assert_eq!(TimeUnit::from_code(2), TimeUnit::Seconds);
        assert_eq!(TimeUnit::from_code(3), TimeUnit::Minutes);
        assert_eq!(TimeUnit::from_code(42), TimeUnit::Milliseconds);
    }

    #[test]
    fn test_parse_unit_names() {
        assert_eq!("s".parse::<TimeUnit>(), Ok(TimeUnit::Seconds));
        assert_eq!("Minutes".parse::<TimeUnit>(), Ok(TimeUnit::Minutes));
        assert_eq!("fortnights".parse::<TimeUnit>(), Ok(TimeUnit::Milliseconds));
    }

    #[test]
    fn test_interval_errors_are_timeout_errors() {
        let non_positive = TimeUnit::Seconds.interval(0.0).unwrap_err();
        let too_large = TimeUnit::Minutes.interval(f64::INFINITY).unwrap_err();
        assert!(non_positive.is_timeout());
        assert!(too_large.is_timeout());
        assert!(!InvalidConfiguration::EmptyTexts.is_timeout());
    }
}
