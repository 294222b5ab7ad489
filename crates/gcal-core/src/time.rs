//! Time types and user input parsing.
//!
//! [`EventTime`] is either a specific instant or an all-day date, and
//! [`TimeWindow`] is the `[start, end)` range used for event queries.
//! The `parse_*` functions turn command-line input into those types.

use std::sync::LazyLock;

use chrono::{
    DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `1h`, `90m`, `1h30m` (plain integers are handled separately).
static DURATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<h>\d+)h)?(?:(?P<m>\d+)m(?:in)?)?$").expect("Invalid duration regex")
});

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S"];

/// Errors from parsing user-supplied dates, times and durations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("invalid date '{0}', expected YYYY-MM-DD, 'today' or 'tomorrow'")]
    InvalidDate(String),

    #[error("invalid date/time '{0}', expected 'YYYY-MM-DD HH:MM', RFC 3339, or 'today HH:MM'")]
    InvalidDateTime(String),

    #[error("'{0}' does not exist or is ambiguous in the local time zone")]
    AmbiguousLocalTime(String),

    #[error("invalid duration '{0}', expected minutes (90) or hours/minutes (1h30m)")]
    InvalidDuration(String),
}

/// The time of a calendar event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific instant, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day date.
    AllDay(NaiveDate),
}

impl EventTime {
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Formats for display in the given timezone.
    ///
    /// Instants render as `YYYY-MM-DD HH:MM`, all-day dates as `YYYY-MM-DD`.
    pub fn display_in<Tz: TimeZone>(&self, tz: &Tz) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).format("%Y-%m-%d %H:%M").to_string(),
            Self::AllDay(date) => date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Formats for display in the local timezone.
    pub fn display_local(&self) -> String {
        self.display_in(&Local)
    }
}

/// A time window for querying calendar events: `[start, end)` in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// A window of `days` days beginning at `start`.
    pub fn days_from(start: DateTime<Utc>, days: i64) -> Self {
        Self::new(start, start + Duration::days(days))
    }

    /// Returns `true` if `end` is strictly after `start`.
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }
}

/// Parses a date: `YYYY-MM-DD`, `today` or `tomorrow`.
pub fn parse_date_input(input: &str, today: NaiveDate) -> Result<NaiveDate, TimeParseError> {
    let trimmed = input.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| TimeParseError::InvalidDate(input.to_string()))
}

/// Parses a date and time in the given timezone.
///
/// Accepted forms:
/// - RFC 3339 (`2024-03-15T10:00:00+09:00`), any offset
/// - `YYYY-MM-DD HH:MM[:SS]` or `YYYY-MM-DDTHH:MM[:SS]` in `tz`
/// - `today HH:MM`, `tomorrow HH:MM`
/// - `HH:MM` (today)
pub fn parse_datetime_in<Tz: TimeZone>(
    input: &str,
    tz: &Tz,
    today: NaiveDate,
) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_relative_datetime(trimmed, today))
        .ok_or_else(|| TimeParseError::InvalidDateTime(input.to_string()))?;

    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::AmbiguousLocalTime(input.to_string()))
}

/// Parses a date and time in the local timezone, relative to today.
pub fn parse_datetime_input(input: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_datetime_in(input, &Local, Local::now().date_naive())
}

/// `today 14:00`, `tomorrow 9:30`, or a bare `14:00`.
fn parse_relative_datetime(input: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let mut parts = input.split_whitespace();
    let first = parts.next()?;
    let second = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let (date, time_str) = match second {
        Some(time) => (parse_date_input(first, today).ok()?, time),
        None => (today, first),
    };

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(time_str, fmt).ok())
        .map(|time| date.and_time(time))
}

/// Parses a positive duration: `90` (minutes), `90m`, `1h`, `1h30m`.
pub fn parse_duration(input: &str) -> Result<Duration, TimeParseError> {
    let trimmed = input.trim().to_ascii_lowercase();
    let invalid = || TimeParseError::InvalidDuration(input.to_string());

    let minutes = if let Ok(minutes) = trimmed.parse::<i64>() {
        minutes
    } else {
        let caps = DURATION_REGEX.captures(&trimmed).ok_or_else(invalid)?;
        let hours: i64 = caps
            .name("h")
            .map_or(Ok(0), |m| m.as_str().parse())
            .map_err(|_| invalid())?;
        let mins: i64 = caps
            .name("m")
            .map_or(Ok(0), |m| m.as_str().parse())
            .map_err(|_| invalid())?;
        hours
            .checked_mul(60)
            .and_then(|m| m.checked_add(mins))
            .ok_or_else(invalid)?
    };

    if minutes <= 0 {
        return Err(invalid());
    }
    Duration::try_minutes(minutes).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn date_keywords() {
        assert_eq!(parse_date_input("today", today()).unwrap(), today());
        assert_eq!(
            parse_date_input("Tomorrow", today()).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()
        );
        assert_eq!(
            parse_date_input("2024-12-31", today()).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
        );
    }

    #[test]
    fn invalid_date() {
        assert_eq!(
            parse_date_input("31/12/2024", today()),
            Err(TimeParseError::InvalidDate("31/12/2024".to_string()))
        );
    }

    #[test]
    fn datetime_formats_in_utc() {
        let expected = utc(2024, 3, 15, 10, 0);
        for input in ["2024-03-15 10:00", "2024-03-15T10:00", "2024-03-15 10:00:00"] {
            assert_eq!(parse_datetime_in(input, &Utc, today()).unwrap(), expected);
        }
    }

    #[test]
    fn datetime_in_offset_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let parsed = parse_datetime_in("2024-03-15 10:00", &tokyo, today()).unwrap();
        assert_eq!(parsed, utc(2024, 3, 15, 1, 0));
    }

    #[test]
    fn datetime_rfc3339_ignores_zone() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let parsed = parse_datetime_in("2024-03-15T10:00:00Z", &tokyo, today()).unwrap();
        assert_eq!(parsed, utc(2024, 3, 15, 10, 0));
    }

    #[test]
    fn datetime_relative() {
        assert_eq!(
            parse_datetime_in("tomorrow 09:30", &Utc, today()).unwrap(),
            utc(2024, 3, 16, 9, 30)
        );
        assert_eq!(
            parse_datetime_in("14:00", &Utc, today()).unwrap(),
            utc(2024, 3, 15, 14, 0)
        );
    }

    #[test]
    fn datetime_invalid() {
        assert!(matches!(
            parse_datetime_in("next tuesday", &Utc, today()),
            Err(TimeParseError::InvalidDateTime(_))
        ));
        assert!(parse_datetime_in("2024-03-15", &Utc, today()).is_err());
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("90").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("45m").unwrap(), Duration::minutes(45));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("1h30m").unwrap(), Duration::minutes(90));
        assert_eq!(parse_duration("1H15MIN").unwrap(), Duration::minutes(75));
    }

    #[test]
    fn invalid_durations() {
        for input in ["", "0", "-5", "h", "1.5h", "abc"] {
            assert!(parse_duration(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn out_of_range_durations_are_rejected() {
        for input in ["9223372036854775807", "153722867280912931h", "99999999999999999999m"] {
            assert_eq!(
                parse_duration(input),
                Err(TimeParseError::InvalidDuration(input.to_string()))
            );
        }
        // Representable, but far beyond any calendar date
        assert_eq!(
            parse_duration("200000000000").unwrap(),
            Duration::minutes(200_000_000_000)
        );
    }

    #[test]
    fn event_time_display() {
        let dt = EventTime::from_utc(utc(2024, 3, 15, 10, 5));
        assert_eq!(dt.display_in(&Utc), "2024-03-15 10:05");

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(dt.display_in(&tokyo), "2024-03-15 19:05");

        let all_day = EventTime::from_date(today());
        assert!(all_day.is_all_day());
        assert_eq!(all_day.display_in(&tokyo), "2024-03-15");
    }

    #[test]
    fn time_window_days() {
        let start = utc(2024, 3, 15, 0, 0);
        let window = TimeWindow::days_from(start, 7);
        assert_eq!(window.end, utc(2024, 3, 22, 0, 0));
        assert!(window.is_valid());
        assert!(!TimeWindow::new(start, start).is_valid());
    }
}
