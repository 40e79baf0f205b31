//! Bucket sizes for time grouping
//!
//! A [`Granularity`] is written `N:UNIT` (`N` defaults to 1). Two
//! granularities are equal when they denote the same absolute duration, so
//! `60:SECONDS` and `1:MINUTES` compare equal.

use crate::time::error::{FormatError, FormatResult};
use crate::time::unit::{from_epoch_nanos, to_epoch_nanos, TimeUnit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Fixed-size time bucket
#[derive(Debug, Clone, Copy)]
pub struct Granularity {
    size: u64,
    unit: TimeUnit,
}

impl Granularity {
    /// Create a granularity of `size` units
    pub fn new(size: u64, unit: TimeUnit) -> FormatResult<Self> {
        if size == 0 {
            return Err(FormatError::InvalidSize(size.to_string()));
        }
        Ok(Self { size, unit })
    }

    /// One millisecond, the finest bucket ever derived from a request
    pub fn millisecond() -> Self {
        Self {
            size: 1,
            unit: TimeUnit::Milliseconds,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Parse `N:UNIT` or `UNIT`
    pub fn parse(s: &str) -> FormatResult<Self> {
        let input = s.trim();
        let invalid = || FormatError::InvalidGranularity(s.to_string());

        let (size, unit) = match input.split_once(':') {
            Some((size, unit)) => {
                let size = size.trim().parse::<u64>().map_err(|_| invalid())?;
                (size, unit)
            }
            None => (1, input),
        };
        let unit = TimeUnit::parse(unit).map_err(|_| invalid())?;
        Self::new(size, unit).map_err(|_| invalid())
    }

    /// Largest-unit granularity that exactly represents `duration`
    ///
    /// Returns `None` for a zero duration.
    pub fn from_duration(duration: Duration) -> Option<Self> {
        let nanos = duration.as_nanos();
        if nanos == 0 {
            return None;
        }
        TimeUnit::coarsest_first()
            .iter()
            .find(|unit| nanos % unit.nanos() as u128 == 0)
            .and_then(|unit| {
                let size = u64::try_from(nanos / unit.nanos() as u128).ok()?;
                Some(Self { size, unit: *unit })
            })
    }

    /// Total length in nanoseconds
    pub fn as_nanos(&self) -> u128 {
        self.size as u128 * self.unit.nanos() as u128
    }

    /// Total length as a duration, saturating at `Duration::MAX`
    pub fn duration(&self) -> Duration {
        let nanos = self.as_nanos();
        let secs = u64::try_from(nanos / 1_000_000_000).unwrap_or(u64::MAX);
        Duration::new(secs, (nanos % 1_000_000_000) as u32)
    }

    /// Bucket length in whole milliseconds, never less than one
    pub fn as_millis(&self) -> u128 {
        (self.as_nanos() / 1_000_000).max(1)
    }

    /// Round `t` down to the start of its bucket
    pub fn floor(&self, t: DateTime<Utc>) -> FormatResult<DateTime<Utc>> {
        let nanos = to_epoch_nanos(t);
        let bucket = self.as_nanos() as i128;
        from_epoch_nanos(nanos - nanos.rem_euclid(bucket))
    }

    /// Round `t` up to the next bucket boundary (identity on a boundary)
    pub fn ceil(&self, t: DateTime<Utc>) -> FormatResult<DateTime<Utc>> {
        let nanos = to_epoch_nanos(t);
        let bucket = self.as_nanos() as i128;
        let remainder = nanos.rem_euclid(bucket);
        if remainder == 0 {
            Ok(t)
        } else {
            from_epoch_nanos(nanos - remainder + bucket)
        }
    }
}

impl PartialEq for Granularity {
    fn eq(&self, other: &Self) -> bool {
        self.as_nanos() == other.as_nanos()
    }
}

impl Eq for Granularity {}

impl Hash for Granularity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_nanos().hash(state);
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.size, self.unit)
    }
}

impl std::str::FromStr for Granularity {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Granularity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Granularity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(s: &str) -> Granularity {
        Granularity::parse(s).unwrap()
    }

    #[test]
    fn test_parse() {
        assert_eq!(g("5:MINUTES").size(), 5);
        assert_eq!(g("5:MINUTES").unit(), TimeUnit::Minutes);
        assert_eq!(g("HOURS").size(), 1);
        assert_eq!(g(" 1:days ").unit(), TimeUnit::Days);

        for bad in ["", "0:SECONDS", "-1:SECONDS", "x:SECONDS", "5:FORTNIGHTS", "5"] {
            assert!(Granularity::parse(bad).is_err(), "should reject {:?}", bad);
        }
    }

    #[test]
    fn test_equivalent_durations() {
        assert_eq!(g("60:SECONDS"), g("1:MINUTES"));
        assert_eq!(g("1000000:MICROSECONDS"), g("1:SECONDS"));
        assert_eq!(g("24:HOURS"), g("1:DAYS"));
        assert_eq!(g("1000:MILLISECONDS"), g("SECONDS"));

        assert_ne!(g("61:SECONDS"), g("1:MINUTES"));
        assert_ne!(g("59:SECONDS"), g("1:MINUTES"));
        assert_ne!(g("1000001:MICROSECONDS"), g("1:SECONDS"));
        assert_ne!(g("23:HOURS"), g("1:DAYS"));
    }

    #[test]
    fn test_duration() {
        assert_eq!(g("90:SECONDS").duration(), Duration::from_secs(90));
        assert_eq!(g("2:DAYS").duration(), Duration::from_secs(2 * 86_400));
        assert_eq!(g("1500:MICROSECONDS").duration(), Duration::from_micros(1500));
    }

    #[test]
    fn test_from_duration() {
        let minute = Granularity::from_duration(Duration::from_secs(60)).unwrap();
        assert_eq!(minute.to_string(), "1:MINUTES");

        let odd = Granularity::from_duration(Duration::from_millis(1500)).unwrap();
        assert_eq!(odd.to_string(), "1500:MILLISECONDS");

        assert!(Granularity::from_duration(Duration::ZERO).is_none());
    }

    #[test]
    fn test_floor_and_ceil() {
        let hour = g("1:HOURS");
        let t = DateTime::from_timestamp(90_001, 0).unwrap();
        assert_eq!(hour.floor(t).unwrap().timestamp(), 90_000);
        assert_eq!(hour.ceil(t).unwrap().timestamp(), 93_600);

        let boundary = DateTime::from_timestamp(90_000, 0).unwrap();
        assert_eq!(hour.ceil(boundary).unwrap(), boundary);

        let before_epoch = DateTime::from_timestamp(-1, 0).unwrap();
        assert_eq!(hour.floor(before_epoch).unwrap().timestamp(), -3_600);
    }

    #[test]
    fn test_as_millis_floor() {
        assert_eq!(g("5:MINUTES").as_millis(), 300_000);
        assert_eq!(g("10:MICROSECONDS").as_millis(), 1);
    }
}
