//! Conversion between temporal axis values and their numeric encoding
//!
//! Temporal coordinate axes are stored as numbers relative to an epoch, with a
//! units string of the form `"<unit> since <epoch>"`, e.g.
//! `"hours since 1970-01-01 00:00:00"`.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unit of a numeric time offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "ms" | "msec" | "millisecond" | "milliseconds" => Some(TimeUnit::Milliseconds),
            "s" | "sec" | "secs" | "second" | "seconds" => Some(TimeUnit::Seconds),
            "min" | "mins" | "minute" | "minutes" => Some(TimeUnit::Minutes),
            "h" | "hr" | "hrs" | "hour" | "hours" => Some(TimeUnit::Hours),
            "d" | "day" | "days" => Some(TimeUnit::Days),
            _ => None,
        }
    }

    /// Length of one unit in milliseconds
    pub fn millis(&self) -> f64 {
        match self {
            TimeUnit::Milliseconds => 1.0,
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Days => 86_400_000.0,
        }
    }
}

/// Converts instants to and from numeric offsets since an epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalConverter {
    unit: TimeUnit,
    epoch: DateTime<Utc>,
}

impl TemporalConverter {
    pub fn new(unit: TimeUnit, epoch: DateTime<Utc>) -> Self {
        Self { unit, epoch }
    }

    /// Parse a `"<unit> since <epoch>"` units string.
    ///
    /// Returns `None` when the string does not describe a temporal axis.
    pub fn parse(units: &str) -> Option<Self> {
        let lower = units.to_ascii_lowercase();
        let at = lower.find(" since ")?;
        let unit = TimeUnit::parse(&units[..at])?;
        let epoch = parse_epoch(units[at + " since ".len()..].trim())?;
        Some(Self { unit, epoch })
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// Numeric offset of `instant` from the epoch, in this converter's unit
    pub fn to_numeric(&self, instant: &DateTime<Utc>) -> f64 {
        let elapsed = instant.signed_duration_since(self.epoch);
        elapsed.num_milliseconds() as f64 / self.unit.millis()
    }

    /// Instant at `value` units after the epoch
    pub fn to_instant(&self, value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = (value * self.unit.millis()).round();
        if millis.abs() > i64::MAX as f64 / 2.0 {
            return None;
        }
        self.epoch
            .checked_add_signed(Duration::milliseconds(millis as i64))
    }
}

fn parse_epoch(text: &str) -> Option<DateTime<Utc>> {
    let text = text
        .trim_end_matches("UTC")
        .trim_end_matches("utc")
        .trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    let text = text.trim_end_matches('Z');
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_units() {
        let converter = TemporalConverter::parse("hours since 1970-01-01 00:00:00").unwrap();
        assert_eq!(converter.unit(), TimeUnit::Hours);
        assert_eq!(converter.epoch(), Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());

        let converter = TemporalConverter::parse("days since 2000-01-01").unwrap();
        assert_eq!(converter.unit(), TimeUnit::Days);

        assert!(TemporalConverter::parse("meters").is_none());
        assert!(TemporalConverter::parse("fortnights since 2000-01-01").is_none());
    }

    #[test]
    fn test_numeric_conversion() {
        let converter = TemporalConverter::parse("days since 2000-01-01T00:00:00Z").unwrap();
        let instant = Utc.with_ymd_and_hms(2000, 1, 11, 12, 0, 0).unwrap();
        assert_eq!(converter.to_numeric(&instant), 10.5);
        assert_eq!(converter.to_instant(10.5), Some(instant));
        assert_eq!(converter.to_instant(f64::NAN), None);
    }
}
