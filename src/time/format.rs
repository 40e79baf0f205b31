//! Datetime column formats
//!
//! A [`DateTimeFormat`] describes how a time column stores its values: either
//! an integer count of `size` units since the epoch, or text produced by a
//! Java-style `SIMPLE_DATE_FORMAT` pattern.
//!
//! # Accepted spellings
//!
//! ```text
//! EPOCH_MILLIS                      shorthand
//! TIMESTAMP                         shorthand for 1:MILLISECONDS:EPOCH
//! 5:MINUTES:EPOCH                   legacy form
//! 1:DAYS:SIMPLE_DATE_FORMAT:yyyyMMdd
//! EPOCH|SECONDS|1                   pipe form
//! SIMPLE_DATE_FORMAT|yyyy-MM-dd
//! ```

use crate::time::error::{FormatError, FormatResult};
use crate::time::unit::{from_epoch_nanos, TimeUnit};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// How the column encodes a point in time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// Integer count of units since the epoch
    Epoch,
    /// Text rendered with a Java-style date pattern
    SimpleDate(String),
}

/// Canonical time-column format
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateTimeFormat {
    size: u64,
    unit: TimeUnit,
    kind: FormatKind,
}

impl DateTimeFormat {
    /// Epoch format counting `size` units per tick
    pub fn epoch(size: u64, unit: TimeUnit) -> FormatResult<Self> {
        if size == 0 {
            return Err(FormatError::InvalidSize(size.to_string()));
        }
        Ok(Self {
            size,
            unit,
            kind: FormatKind::Epoch,
        })
    }

    /// `1:MILLISECONDS:EPOCH`, the output format of every time-group expression
    pub fn millis() -> Self {
        Self {
            size: 1,
            unit: TimeUnit::Milliseconds,
            kind: FormatKind::Epoch,
        }
    }

    /// Simple-date format with the given Java-style pattern
    pub fn simple_date(size: u64, unit: TimeUnit, pattern: impl Into<String>) -> FormatResult<Self> {
        let pattern = pattern.into();
        if size == 0 {
            return Err(FormatError::InvalidSize(size.to_string()));
        }
        if pattern.trim().is_empty() {
            return Err(FormatError::InvalidFormat(pattern));
        }
        Ok(Self {
            size,
            unit,
            kind: FormatKind::SimpleDate(pattern),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn kind(&self) -> &FormatKind {
        &self.kind
    }

    pub fn is_epoch(&self) -> bool {
        self.kind == FormatKind::Epoch
    }

    /// Parse any accepted spelling into its canonical value
    pub fn parse(s: &str) -> FormatResult<Self> {
        let input = s.trim();
        if input.is_empty() {
            return Err(FormatError::InvalidFormat(s.to_string()));
        }

        if let Some(format) = parse_shorthand(input) {
            return Ok(format);
        }

        if input.contains('|') {
            return parse_pipe_form(input);
        }

        if input.contains(':') {
            return parse_legacy_form(input);
        }

        Err(FormatError::InvalidFormat(s.to_string()))
    }

    /// Legacy `N:UNIT:EPOCH` / `N:UNIT:SIMPLE_DATE_FORMAT:pattern` form
    pub fn to_legacy_string(&self) -> String {
        match &self.kind {
            FormatKind::Epoch => format!("{}:{}:EPOCH", self.size, self.unit),
            FormatKind::SimpleDate(pattern) => {
                format!("{}:{}:SIMPLE_DATE_FORMAT:{}", self.size, self.unit, pattern)
            }
        }
    }

    /// Pipe `EPOCH|UNIT|N` / `SIMPLE_DATE_FORMAT|pattern` form
    pub fn to_pipe_string(&self) -> String {
        match &self.kind {
            FormatKind::Epoch => format!("EPOCH|{}|{}", self.unit, self.size),
            FormatKind::SimpleDate(pattern) => format!("SIMPLE_DATE_FORMAT|{}", pattern),
        }
    }

    /// Encode a point in time as SQL literal text for this column
    ///
    /// Epoch columns get a bare integer, simple-date columns a single-quoted
    /// string.
    pub fn encode(&self, t: DateTime<Utc>) -> FormatResult<String> {
        match &self.kind {
            FormatKind::Epoch => {
                let count = self.unit.epoch_count(t)?;
                Ok(count.div_euclid(self.size as i64).to_string())
            }
            FormatKind::SimpleDate(pattern) => {
                let text = t.format(&java_pattern_to_strftime(pattern)).to_string();
                Ok(format!("'{}'", text.replace('\'', "''")))
            }
        }
    }

    /// Convert an epoch tick count of this format into a point in time
    pub fn from_epoch_count(&self, count: i64) -> FormatResult<DateTime<Utc>> {
        let nanos = count as i128 * self.size as i128 * self.unit.nanos() as i128;
        from_epoch_nanos(nanos)
    }

    /// Parse simple-date text produced by this format
    pub fn parse_date_text(&self, text: &str) -> FormatResult<DateTime<Utc>> {
        let pattern = match &self.kind {
            FormatKind::SimpleDate(pattern) => pattern,
            FormatKind::Epoch => {
                let count = text.trim().parse::<i64>().map_err(|_| self.decode_error(text))?;
                return self.from_epoch_count(count);
            }
        };

        let fmt = java_pattern_to_strftime(pattern);
        let text = text.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, &fmt) {
            return Ok(dt.and_utc());
        }
        NaiveDate::parse_from_str(text, &fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| self.decode_error(text))
    }

    fn decode_error(&self, value: &str) -> FormatError {
        FormatError::Decode {
            value: value.to_string(),
            format: self.to_legacy_string(),
        }
    }
}

impl Default for DateTimeFormat {
    fn default() -> Self {
        Self::millis()
    }
}

impl std::fmt::Display for DateTimeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_legacy_string())
    }
}

impl std::str::FromStr for DateTimeFormat {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DateTimeFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_legacy_string())
    }
}

impl<'de> Deserialize<'de> for DateTimeFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_shorthand(input: &str) -> Option<DateTimeFormat> {
    let unit = match input.to_uppercase().as_str() {
        "EPOCH_NANOS" | "EPOCH_NANOSECONDS" => TimeUnit::Nanoseconds,
        "EPOCH_MICROS" | "EPOCH_MICROSECONDS" => TimeUnit::Microseconds,
        "EPOCH_MILLIS" | "EPOCH_MILLISECONDS" | "EPOCH" | "TIMESTAMP" => TimeUnit::Milliseconds,
        "EPOCH_SECONDS" => TimeUnit::Seconds,
        "EPOCH_MINUTES" => TimeUnit::Minutes,
        "EPOCH_HOURS" => TimeUnit::Hours,
        "EPOCH_DAYS" => TimeUnit::Days,
        _ => return None,
    };
    Some(DateTimeFormat {
        size: 1,
        unit,
        kind: FormatKind::Epoch,
    })
}

fn parse_size(s: &str) -> FormatResult<u64> {
    match s.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(FormatError::InvalidSize(s.to_string())),
        Ok(n) => Ok(n),
    }
}

/// `EPOCH|UNIT[|N]`, `SIMPLE_DATE_FORMAT|pattern[|tz]`, `TIMESTAMP`
fn parse_pipe_form(input: &str) -> FormatResult<DateTimeFormat> {
    let parts: Vec<&str> = input.split('|').collect();
    match parts[0].trim().to_uppercase().as_str() {
        "EPOCH" => {
            let unit = match parts.get(1) {
                Some(u) => TimeUnit::parse(u)?,
                None => TimeUnit::Milliseconds,
            };
            let size = match parts.get(2) {
                Some(n) => parse_size(n)?,
                None => 1,
            };
            if parts.len() > 3 {
                return Err(FormatError::InvalidFormat(input.to_string()));
            }
            DateTimeFormat::epoch(size, unit)
        }
        "SIMPLE_DATE_FORMAT" => {
            let pattern = parts
                .get(1)
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .ok_or_else(|| FormatError::InvalidFormat(input.to_string()))?;
            DateTimeFormat::simple_date(1, unit_of_pattern(pattern), pattern)
        }
        "TIMESTAMP" => Ok(DateTimeFormat::millis()),
        _ => Err(FormatError::InvalidFormat(input.to_string())),
    }
}

/// `N:UNIT:EPOCH`, `N:UNIT:TIMESTAMP`, `N:UNIT:SIMPLE_DATE_FORMAT:pattern`
fn parse_legacy_form(input: &str) -> FormatResult<DateTimeFormat> {
    let parts: Vec<&str> = input.splitn(4, ':').collect();
    if parts.len() < 3 {
        return Err(FormatError::InvalidFormat(input.to_string()));
    }
    let size = parse_size(parts[0])?;
    let unit = TimeUnit::parse(parts[1])?;

    match (parts[2].trim().to_uppercase().as_str(), parts.get(3)) {
        ("EPOCH", None) | ("TIMESTAMP", None) => DateTimeFormat::epoch(size, unit),
        ("SIMPLE_DATE_FORMAT", Some(pattern)) => DateTimeFormat::simple_date(size, unit, *pattern),
        _ => Err(FormatError::InvalidFormat(input.to_string())),
    }
}

/// Finest unit a date pattern resolves to
fn unit_of_pattern(pattern: &str) -> TimeUnit {
    let letters: String = pattern.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.contains('S') {
        TimeUnit::Milliseconds
    } else if letters.contains('s') {
        TimeUnit::Seconds
    } else if letters.contains('m') {
        TimeUnit::Minutes
    } else if letters.contains(['H', 'h', 'k', 'K']) {
        TimeUnit::Hours
    } else {
        TimeUnit::Days
    }
}

/// Translate a Java `SimpleDateFormat` pattern into a chrono format string
pub fn java_pattern_to_strftime(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        // Quoted literal text; '' is an escaped quote
        if c == '\'' {
            if chars.get(i + 1) == Some(&'\'') {
                out.push('\'');
                i += 2;
                continue;
            }
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        if !c.is_ascii_alphabetic() {
            push_literal(&mut out, c);
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let spec = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('h', 1) => "%-I",
            ('h', _) => "%I",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            ('S', 6) => "%6f",
            ('S', 9) => "%9f",
            ('S', _) => "%3f",
            ('a', _) => "%p",
            ('E', 1..=3) => "%a",
            ('E', _) => "%A",
            ('D', _) => "%j",
            ('Z', _) => "%z",
            ('X', _) => "%:z",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(spec);
        i += run;
    }

    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
