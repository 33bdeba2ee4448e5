//! Row normalization: structural filtering, timestamp parsing and actor
//! extraction.
//!
//! Every step is a per-row decision. Rows that are not alarm data, rows with
//! an unparseable timestamp and (optionally) rows without a usable actor are
//! counted and dropped; nothing here returns an error.

use alarm_core::models::{AlarmRecord, RawAlarmRow};
use alarm_core::time_utils::parse_alarm_timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Literal the export writes when nobody is attributed.
const NO_ACTOR_LITERAL: &str = "none";

// ── Row outcomes ──────────────────────────────────────────────────────────────

/// Why a row did not become an [`AlarmRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The timestamp column has no `DD-MM-YYYY` date in it.
    NotDataRow,
    /// The timestamp column looks like a date but does not parse.
    BadTimestamp,
    /// The actor-quality filter is on and the row has no usable actor.
    NoActor,
}

/// Result of normalizing a single row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Kept(AlarmRecord),
    Skipped(SkipReason),
}

/// Per-stage row counts for one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    pub rows_read: usize,
    pub dropped_not_data: usize,
    pub dropped_bad_timestamp: usize,
    pub dropped_no_actor: usize,
    pub records_kept: usize,
    /// Kept records that carry an actor.
    pub records_with_actor: usize,
}

impl NormalizeStats {
    /// Total rows dropped across all stages.
    pub fn dropped(&self) -> usize {
        self.dropped_not_data + self.dropped_bad_timestamp + self.dropped_no_actor
    }

    fn record(&mut self, outcome: &RowOutcome) {
        self.rows_read += 1;
        match outcome {
            RowOutcome::Kept(record) => {
                self.records_kept += 1;
                if record.actor.is_some() {
                    self.records_with_actor += 1;
                }
            }
            RowOutcome::Skipped(SkipReason::NotDataRow) => self.dropped_not_data += 1,
            RowOutcome::Skipped(SkipReason::BadTimestamp) => self.dropped_bad_timestamp += 1,
            RowOutcome::Skipped(SkipReason::NoActor) => self.dropped_no_actor += 1,
        }
    }
}

/// Normalized records in input order, plus the counts that produced them.
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<AlarmRecord>,
    pub stats: NormalizeStats,
}

// ── Normalizer ────────────────────────────────────────────────────────────────

/// Turns [`RawAlarmRow`]s into [`AlarmRecord`]s.
///
/// The actor annotation is a trailing `- por <name>` on the message, with
/// whitespace on both sides of `por`, so hyphenated words like `B-por` are
/// left alone. The marker is matched case-insensitively (`por`, `Por`, `POR`) and anchored to
/// the end of the message; the first occurrence wins, so everything after it
/// is the actor and everything before it is the cleaned message.
pub struct Normalizer {
    date_shape: Regex,
    actor_suffix: Regex,
    require_actor: bool,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Normalizer {
    /// Create a normalizer. With `require_actor` set, records without a usable
    /// actor are dropped instead of kept with the actor absent.
    pub fn new(require_actor: bool) -> Self {
        Self {
            date_shape: Regex::new(r"\d{2}-\d{2}-\d{4}").expect("regex is valid"),
            actor_suffix: Regex::new(r"(?i)\s*-\s+por\s+(.+?)\s*$").expect("regex is valid"),
            require_actor,
        }
    }

    pub fn requires_actor(&self) -> bool {
        self.require_actor
    }

    /// `true` when the timestamp column contains a `DD-MM-YYYY` date anywhere.
    pub fn is_data_row(&self, timestamp_field: &str) -> bool {
        self.date_shape.is_match(timestamp_field)
    }

    /// Actor named by the message's trailing annotation, if any.
    ///
    /// Blank names and the literal `none` (any case) count as no actor.
    pub fn extract_actor(&self, message: &str) -> Option<String> {
        let captured = self.actor_suffix.captures(message)?.get(1)?.as_str();
        usable_actor(captured)
    }

    /// `message` with its trailing actor annotation removed.
    ///
    /// Stripping an already-clean message returns it unchanged.
    pub fn strip_actor(&self, message: &str) -> String {
        match self.actor_suffix.find(message) {
            Some(m) => message[..m.start()].to_string(),
            None => message.to_string(),
        }
    }

    /// Run every normalization step on one row.
    pub fn normalize_row(&self, row: RawAlarmRow) -> RowOutcome {
        let Some(raw_ts) = row.timestamp.as_deref().filter(|ts| self.is_data_row(ts)) else {
            return RowOutcome::Skipped(SkipReason::NotDataRow);
        };

        let Some(timestamp) = parse_alarm_timestamp(raw_ts) else {
            debug!("Skipping row with unparseable timestamp \"{}\"", raw_ts);
            return RowOutcome::Skipped(SkipReason::BadTimestamp);
        };

        let raw_message = row.message.unwrap_or_default();
        let actor = self.extract_actor(&raw_message);
        if self.require_actor && actor.is_none() {
            return RowOutcome::Skipped(SkipReason::NoActor);
        }

        RowOutcome::Kept(AlarmRecord {
            timestamp,
            alarm_type: row.alarm_type.unwrap_or_default(),
            alarm_code: row.alarm_code.unwrap_or_default(),
            message: self.strip_actor(&raw_message),
            actor,
        })
    }

    /// Normalize a whole export, preserving input order.
    pub fn normalize(&self, rows: Vec<RawAlarmRow>) -> Normalized {
        let mut stats = NormalizeStats::default();
        let mut records = Vec::with_capacity(rows.len());

        for row in rows {
            let outcome = self.normalize_row(row);
            stats.record(&outcome);
            if let RowOutcome::Kept(record) = outcome {
                records.push(record);
            }
        }

        info!(
            "Normalized {} rows: {} kept, {} not data, {} bad timestamp, {} without actor",
            stats.rows_read,
            stats.records_kept,
            stats.dropped_not_data,
            stats.dropped_bad_timestamp,
            stats.dropped_no_actor,
        );

        Normalized { records, stats }
    }
}

/// Trim `name`; `None` when it is blank or the no-actor literal.
fn usable_actor(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_ACTOR_LITERAL) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
