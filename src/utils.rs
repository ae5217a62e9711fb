//! Time and text helpers shared by the resource methods.
//!
//! The API expects UTC instants formatted as `2024-01-02T03:04:05Z`, either
//! alone (`start`, `stop`) or joined as a `start:end` period filter.

use std::sync::OnceLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use crate::error::{Error, Result};

/// Timestamp format accepted by the API.
pub const API_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

static HTML_TAG: OnceLock<Regex> = OnceLock::new();

/// Formats `at` the way the API expects it.
///
/// # Examples
///
/// ```
/// use battlemetrics::utils::format_time;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
/// assert_eq!(format_time(&at), "2024-01-02T03:04:05Z");
/// ```
pub fn format_time(at: &DateTime<Utc>) -> String {
    at.format(API_TIME_FORMAT).to_string()
}

/// A closed UTC time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        TimeRange { start, end }
    }

    /// The window of length `span` ending now.
    pub fn last(span: TimeDelta) -> Self {
        let now = Utc::now();
        TimeRange::new(now - span, now)
    }

    /// From `before` ago to `after` from now.
    pub fn around_now(before: TimeDelta, after: TimeDelta) -> Self {
        let now = Utc::now();
        TimeRange::new(now - before, now + after)
    }

    pub fn start_param(&self) -> String {
        format_time(&self.start)
    }

    pub fn end_param(&self) -> String {
        format_time(&self.end)
    }

    /// `start:end`, the format of `filter[period]` style parameters.
    pub fn period(&self) -> String {
        format!("{}:{}", self.start_param(), self.end_param())
    }
}

/// Parses a short duration such as `30s`, `15m`, `12h`, `7d` or `2w`.
///
/// # Errors
///
/// [`Error::InvalidArgument`] when the number or the unit is not recognised.
///
/// # Examples
///
/// ```
/// use battlemetrics::utils::parse_duration;
/// use chrono::TimeDelta;
///
/// assert_eq!(parse_duration("7d").unwrap(), TimeDelta::days(7));
/// assert!(parse_duration("7y").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<TimeDelta> {
    let input = input.trim();
    let invalid = || Error::InvalidArgument(format!("invalid duration {:?}", input));

    let unit = input.chars().last().ok_or_else(invalid)?;
    let amount: i64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    if amount < 0 {
        return Err(invalid());
    }

    match unit {
        's' => TimeDelta::try_seconds(amount),
        'm' => TimeDelta::try_minutes(amount),
        'h' => TimeDelta::try_hours(amount),
        'd' => TimeDelta::try_days(amount),
        'w' => TimeDelta::try_weeks(amount),
        _ => None,
    }
    .ok_or_else(invalid)
}

/// The instant `duration` (see [`parse_duration`]) from now.
pub fn expires_in(duration: &str) -> Result<DateTime<Utc>> {
    let delta = parse_duration(duration)?;
    Utc::now()
        .checked_add_signed(delta)
        .ok_or_else(|| Error::InvalidArgument(format!("duration {:?} is too large", duration)))
}

/// Removes HTML tags, keeping the text between them.
pub fn strip_html_tags(text: &str) -> String {
    let tag = HTML_TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));
    tag.replace_all(text, "").into_owned()
}
