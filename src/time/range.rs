//! Half-open query time ranges

use chrono::{DateTime, Duration, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::time::error::FormatError;

/// Time range for queries (half-open interval: [from, to))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    /// Start (inclusive)
    pub from: DateTime<Utc>,
    /// End (exclusive)
    pub to: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawTimeRange {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawTimeRange::deserialize(deserializer)?;
        Self::try_new(raw.from, raw.to).ok_or_else(|| {
            de::Error::custom(FormatError::EmptyRange {
                from: raw.from.to_rfc3339(),
                to: raw.to.to_rfc3339(),
            })
        })
    }
}

impl TimeRange {
    /// Create a new time range
    ///
    /// # Panics
    /// Panics if from >= to
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        assert!(from < to, "TimeRange: from must be before to");
        Self { from, to }
    }

    /// Create a time range, returning None if invalid
    pub fn try_new(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Self> {
        if from < to {
            Some(Self { from, to })
        } else {
            None
        }
    }

    /// Build a range from millisecond epoch bounds
    pub fn from_millis(from: i64, to: i64) -> Option<Self> {
        let from = DateTime::from_timestamp_millis(from)?;
        let to = DateTime::from_timestamp_millis(to)?;
        Self::try_new(from, to)
    }

    /// Create a range for the last N minutes from now
    pub fn last_minutes(minutes: i64) -> Self {
        let to = Utc::now();
        Self {
            from: to - Duration::minutes(minutes),
            to,
        }
    }

    /// Create a range for the last N hours from now
    pub fn last_hours(hours: i64) -> Self {
        Self::last_minutes(hours * 60)
    }

    /// Start in milliseconds since the epoch
    pub fn from_millis_epoch(&self) -> i64 {
        self.from.timestamp_millis()
    }

    /// End in milliseconds since the epoch
    pub fn to_millis_epoch(&self) -> i64 {
        self.to.timestamp_millis()
    }

    /// Get the duration in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.to_millis_epoch() - self.from_millis_epoch()
    }

    /// Get the duration
    pub fn duration(&self) -> Duration {
        self.to - self.from
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_millis() {
        let range = TimeRange::from_millis(1_000, 90_001_000).unwrap();
        assert_eq!(range.from_millis_epoch(), 1_000);
        assert_eq!(range.duration_millis(), 90_000_000);

        assert!(TimeRange::from_millis(5, 5).is_none());
        assert!(TimeRange::from_millis(6, 5).is_none());
    }

    #[test]
    fn test_deserialize_checks_order() {
        let range: TimeRange =
            serde_json::from_str(r#"{"from": "1970-01-01T00:00:01Z", "to": "1970-01-01T00:00:02Z"}"#).unwrap();
        assert_eq!(range, TimeRange::from_millis(1_000, 2_000).unwrap());

        let err = serde_json::from_str::<TimeRange>(r#"{"from": "1970-01-01T00:00:02Z", "to": "1970-01-01T00:00:01Z"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Empty time range"), "{}", err);
        assert!(serde_json::from_str::<TimeRange>(r#"{"from": "1970-01-01T00:00:01Z", "to": "1970-01-01T00:00:01Z"}"#).is_err());
    }

    #[test]
    fn test_last_hours() {
        let range = TimeRange::last_hours(2);
        assert_eq!(range.duration(), Duration::hours(2));
    }
}
