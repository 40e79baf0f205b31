//! Time units shared by datetime formats and granularities

use crate::time::error::{FormatError, FormatResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Fixed-length time units understood by the query engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    /// All units, coarsest first
    pub fn coarsest_first() -> &'static [TimeUnit] {
        &[
            TimeUnit::Days,
            TimeUnit::Hours,
            TimeUnit::Minutes,
            TimeUnit::Seconds,
            TimeUnit::Milliseconds,
            TimeUnit::Microseconds,
            TimeUnit::Nanoseconds,
        ]
    }

    /// Length of one unit in nanoseconds
    pub fn nanos(&self) -> u64 {
        match self {
            Self::Nanoseconds => 1,
            Self::Microseconds => 1_000,
            Self::Milliseconds => 1_000_000,
            Self::Seconds => 1_000_000_000,
            Self::Minutes => 60 * 1_000_000_000,
            Self::Hours => 3_600 * 1_000_000_000,
            Self::Days => 86_400 * 1_000_000_000,
        }
    }

    /// Canonical upper-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nanoseconds => "NANOSECONDS",
            Self::Microseconds => "MICROSECONDS",
            Self::Milliseconds => "MILLISECONDS",
            Self::Seconds => "SECONDS",
            Self::Minutes => "MINUTES",
            Self::Hours => "HOURS",
            Self::Days => "DAYS",
        }
    }

    /// Parse a unit name (case-insensitive)
    pub fn parse(s: &str) -> FormatResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "NANOSECONDS" => Ok(Self::Nanoseconds),
            "MICROSECONDS" => Ok(Self::Microseconds),
            "MILLISECONDS" => Ok(Self::Milliseconds),
            "SECONDS" => Ok(Self::Seconds),
            "MINUTES" => Ok(Self::Minutes),
            "HOURS" => Ok(Self::Hours),
            "DAYS" => Ok(Self::Days),
            _ => Err(FormatError::InvalidUnit(s.to_string())),
        }
    }

    /// Count of whole units elapsed since the epoch (floored)
    pub fn epoch_count(&self, t: DateTime<Utc>) -> FormatResult<i64> {
        let count = match self {
            Self::Nanoseconds => t
                .timestamp_nanos_opt()
                .ok_or_else(|| FormatError::OutOfRange(t.to_rfc3339()))?,
            Self::Microseconds => t.timestamp_micros(),
            Self::Milliseconds => t.timestamp_millis(),
            Self::Seconds => t.timestamp(),
            Self::Minutes => t.timestamp().div_euclid(60),
            Self::Hours => t.timestamp().div_euclid(3_600),
            Self::Days => t.timestamp().div_euclid(86_400),
        };
        Ok(count)
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Nanoseconds since the epoch, widened so that arithmetic never overflows
pub fn to_epoch_nanos(t: DateTime<Utc>) -> i128 {
    t.timestamp() as i128 * NANOS_PER_SECOND + t.timestamp_subsec_nanos() as i128
}

/// Inverse of [`to_epoch_nanos`]
pub fn from_epoch_nanos(nanos: i128) -> FormatResult<DateTime<Utc>> {
    let secs = i64::try_from(nanos.div_euclid(NANOS_PER_SECOND))
        .map_err(|_| FormatError::OutOfRange(format!("{}ns", nanos)))?;
    let subsec = nanos.rem_euclid(NANOS_PER_SECOND) as u32;
    DateTime::from_timestamp(secs, subsec)
        .ok_or_else(|| FormatError::OutOfRange(format!("{}ns", nanos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unit_case_insensitive() {
        assert_eq!(TimeUnit::parse("seconds").unwrap(), TimeUnit::Seconds);
        assert_eq!(TimeUnit::parse(" MINUTES ").unwrap(), TimeUnit::Minutes);
        assert!(TimeUnit::parse("FORTNIGHTS").is_err());
    }

    #[test]
    fn test_epoch_count() {
        let t = DateTime::from_timestamp(90_061, 5_000_000).unwrap();
        assert_eq!(TimeUnit::Milliseconds.epoch_count(t).unwrap(), 90_061_005);
        assert_eq!(TimeUnit::Seconds.epoch_count(t).unwrap(), 90_061);
        assert_eq!(TimeUnit::Minutes.epoch_count(t).unwrap(), 1_501);
        assert_eq!(TimeUnit::Hours.epoch_count(t).unwrap(), 25);
        assert_eq!(TimeUnit::Days.epoch_count(t).unwrap(), 1);
    }

    #[test]
    fn test_epoch_nanos_round_trip() {
        let t = DateTime::from_timestamp(-1, 999_999_999).unwrap();
        let nanos = to_epoch_nanos(t);
        assert_eq!(nanos, -1);
        assert_eq!(from_epoch_nanos(nanos).unwrap(), t);
    }
}
