use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::error::{AlarmError, Result};

// ── Alarm export timestamps ───────────────────────────────────────────────────

/// Day-first date-time layouts written by the control system export.
const ALARM_DATETIME_FORMATS: &[&str] = &[
    "%d-%m-%Y %H:%M:%S%.f",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// Date-only layout; the time of day defaults to midnight.
const ALARM_DATE_FORMAT: &str = "%d-%m-%Y";

/// Parse an export timestamp of the shape `DD-MM-YYYY[ HH:MM[:SS[.fff]]]`.
///
/// Surrounding whitespace is ignored. Returns `None` for anything else,
/// including impossible dates such as `31-02-2025`.
pub fn parse_alarm_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for fmt in ALARM_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, ALARM_DATE_FORMAT) {
        return Some(date.and_time(NaiveTime::MIN));
    }

    debug!("could not parse alarm timestamp \"{}\"", s);
    None
}

// ── Date-range bounds ─────────────────────────────────────────────────────────

/// Which end of a date range a bound string describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Start,
    End,
}

/// Parse a user-supplied date-range bound.
///
/// Accepts ISO (`YYYY-MM-DD[ HH:MM:SS]`, `T` separator allowed) and export
/// (`DD-MM-YYYY[ HH:MM:SS]`) layouts. A date without a time of day covers the
/// whole day: midnight for a [`RangeBound::Start`], the last nanosecond of the
/// day for a [`RangeBound::End`].
pub fn parse_range_bound(s: &str, bound: RangeBound) -> Result<NaiveDateTime> {
    let trimmed = s.trim();

    const ISO_DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt);
        }
    }

    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, ALARM_DATE_FORMAT));
    if let Ok(date) = date {
        return Ok(match bound {
            RangeBound::Start => date.and_time(NaiveTime::MIN),
            RangeBound::End => end_of_day(date),
        });
    }

    parse_alarm_timestamp(trimmed).ok_or_else(|| AlarmError::TimestampParse(s.to_string()))
}

/// The last representable instant of `date`.
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
    date.and_time(last)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
