// src/timefilter.rs
//! Date parsing and the verdict cutoff.
//!
//! The cutoff is a civil date in a fixed timezone (US Eastern unless
//! configured): "2025-12-05" means midnight in New York, not UTC midnight.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use crate::error::{IntakeError, Result};

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::New_York;

/// Unix values at or above this magnitude are milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Gap search after a skipped midnight: 15-minute steps over six hours.
const GAP_STEP_MINUTES: i64 = 15;
const GAP_SEARCH_STEPS: i64 = 24;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse a JSON date-like field: ISO string, RFC 2822 string, or Unix number.
pub fn parse_timestamp(raw: &Value) -> Result<DateTime<Utc>> {
    match raw {
        Value::Number(n) => {
            let secs_or_millis = n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64));
            secs_or_millis
                .and_then(from_unix)
                .ok_or_else(|| IntakeError::UnparsableDate(n.to_string()))
        }
        Value::String(s) => parse_timestamp_str(s),
        other => Err(IntakeError::UnparsableDate(other.to_string())),
    }
}

/// Parse a date string. Naive values are taken as UTC.
pub fn parse_timestamp_str(raw: &str) -> Result<DateTime<Utc>> {
    let s = raw.trim();
    let fail = || IntakeError::UnparsableDate(raw.to_string());
    if s.is_empty() {
        return Err(fail());
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(from_unix).ok_or_else(fail);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(fail())
}

fn from_unix(v: i64) -> Option<DateTime<Utc>> {
    if v.unsigned_abs() >= MILLIS_THRESHOLD.unsigned_abs() {
        DateTime::from_timestamp_millis(v)
    } else {
        DateTime::from_timestamp(v, 0)
    }
}

/// Parse a `YYYY-MM-DD` cutoff date.
pub fn parse_cutoff_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| IntakeError::UnparsableDate(raw.to_string()))
}

/// IANA name ("America/New_York") or legacy alias ("US/Eastern").
pub fn parse_timezone(raw: &str) -> Option<Tz> {
    raw.trim().parse::<Tz>().ok()
}

/// Start of `date` in `tz`, as a UTC instant.
pub fn cutoff_instant(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::default());
    // midnight skipped by a DST jump: the day starts where the gap ends
    (0..=GAP_SEARCH_STEPS)
        .find_map(|step| {
            let local = midnight + Duration::minutes(GAP_STEP_MINUTES * step);
            tz.from_local_datetime(&local).earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
        .with_timezone(&Utc)
}

/// True when `instant` is on or after the start of `cutoff_date` in `tz`.
pub fn is_after_cutoff(instant: DateTime<Utc>, cutoff_date: NaiveDate, tz: Tz) -> bool {
    instant >= cutoff_instant(cutoff_date, tz)
}

/// Row date: `MM/DD/YYYY` in the civil timezone.
pub fn format_date_posted(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%m/%d/%Y").to_string()
}
