//! Alarm rows, normalized records and the aggregates built from them.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Number of hour-of-day buckets in an [`HourHistogram`].
pub const HOURS_PER_DAY: usize = 24;

/// A single line of the alarm export, split positionally but not yet typed.
///
/// Fields missing from a short line are `None` rather than empty strings so
/// that "absent" and "present but blank" stay distinguishable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawAlarmRow {
    pub timestamp: Option<String>,
    pub alarm_type: Option<String>,
    pub alarm_code: Option<String>,
    pub message: Option<String>,
}

impl RawAlarmRow {
    /// Build a row from an ordered list of fields, padding missing trailing
    /// fields with `None`.
    ///
    /// Fields beyond the fourth belong to the message: they are re-joined
    /// with `delimiter` so that unquoted commas inside message text survive.
    pub fn from_fields<I, S>(fields: I, delimiter: char) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut iter = fields.into_iter().map(Into::into);
        let timestamp = iter.next();
        let alarm_type = iter.next();
        let alarm_code = iter.next();
        let message = iter.next().map(|first| {
            iter.fold(first, |mut acc, extra| {
                acc.push(delimiter);
                acc.push_str(&extra);
                acc
            })
        });

        Self {
            timestamp,
            alarm_type,
            alarm_code,
            message,
        }
    }
}

/// A fully parsed, cleaned alarm record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmRecord {
    /// When the alarm was logged (plant-local time, no offset in the export).
    pub timestamp: NaiveDateTime,
    /// Category column, passed through unmodified.
    pub alarm_type: String,
    /// Alarm identifier column, passed through unmodified.
    pub alarm_code: String,
    /// Message text with any trailing actor annotation removed.
    pub message: String,
    /// Person who acknowledged or cleared the alarm, when the message names one.
    #[serde(default)]
    pub actor: Option<String>,
}

impl AlarmRecord {
    /// Hour of day (0–23) the alarm was logged in.
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Number of records attributed to one actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorCount {
    pub actor: String,
    pub count: u64,
}

/// Per-hour-of-day record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourHistogram {
    buckets: [u64; HOURS_PER_DAY],
}

impl HourHistogram {
    /// Count `records` into their hour buckets.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a AlarmRecord>,
    {
        let mut histogram = Self::default();
        for record in records {
            histogram.buckets[record.hour() as usize] += 1;
        }
        histogram
    }

    /// Count for a single hour; `0` for hours outside 0–23.
    pub fn count(&self, hour: u32) -> u64 {
        self.buckets.get(hour as usize).copied().unwrap_or(0)
    }

    pub fn buckets(&self) -> &[u64; HOURS_PER_DAY] {
        &self.buckets
    }

    /// Sum of all buckets.
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// The hour with the most records, first hour winning ties.
    /// `None` when the histogram is empty.
    pub fn peak_hour(&self) -> Option<u32> {
        let max = *self.buckets.iter().max()?;
        if max == 0 {
            return None;
        }
        self.buckets
            .iter()
            .position(|&c| c == max)
            .map(|h| h as u32)
    }
}

/// Inclusive time window applied to the record set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// `true` when `ts` lies within `[start, end]`.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        self.start <= ts && ts <= self.end
    }
}
