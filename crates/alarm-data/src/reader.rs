//! Alarm export decoding and positional field splitting.
//!
//! Turns the raw bytes of an export into [`RawAlarmRow`]s: decode as
//! ISO-8859-1, drop the fixed preamble, split each remaining line into the
//! four positional columns.

use alarm_core::error::{AlarmError, Result};
use alarm_core::models::RawAlarmRow;
use alarm_core::settings::DEFAULT_PREAMBLE_LINES;
use tracing::{debug, warn};

use crate::source::AlarmSource;

// ── IngestOptions ─────────────────────────────────────────────────────────────

/// Structural layout of the export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// Leading lines discarded regardless of content.
    pub preamble_lines: usize,
    /// Single-byte field delimiter.
    pub delimiter: u8,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            preamble_lines: DEFAULT_PREAMBLE_LINES,
            delimiter: b',',
        }
    }
}

impl IngestOptions {
    /// Build options from user input; the delimiter must be a single ASCII
    /// character other than a quote or line break.
    pub fn new(preamble_lines: usize, delimiter: char) -> Result<Self> {
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(AlarmError::Config(format!(
                "unsupported field delimiter {:?}",
                delimiter
            )));
        }
        Ok(Self {
            preamble_lines,
            delimiter: delimiter as u8,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Decode bytes as ISO-8859-1.
///
/// Every byte maps to the code point of the same value, so decoding is total:
/// bytes such as `0xF3` (`ó`) that are invalid UTF-8 never fail.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Return `text` without its first `lines` lines.
///
/// Lines are `\n`-terminated (a trailing `\r` is part of the line). Text with
/// fewer lines than the preamble yields an empty body.
pub fn skip_preamble(text: &str, lines: usize) -> &str {
    if lines == 0 {
        return text;
    }
    text.match_indices('\n')
        .nth(lines - 1)
        .map(|(idx, _)| &text[idx + 1..])
        .unwrap_or("")
}

/// Split the export body into positional rows.
///
/// Short lines are padded with absent fields; surplus fields are folded back
/// into the message. A record the CSV layer cannot read is logged and
/// skipped.
pub fn parse_rows(body: &str, options: &IngestOptions) -> Vec<RawAlarmRow> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(body.as_bytes());

    let delimiter = char::from(options.delimiter);
    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => rows.push(RawAlarmRow::from_fields(record.iter(), delimiter)),
            Err(e) => warn!("Skipping unreadable export line: {}", e),
        }
    }
    rows
}

/// Read, decode and split an export from `source`.
///
/// Fails only when the source itself cannot be read.
pub fn read_rows(
    source: &mut dyn AlarmSource,
    options: &IngestOptions,
) -> Result<Vec<RawAlarmRow>> {
    let bytes = source.read_bytes()?;
    Ok(rows_from_bytes(&bytes, options))
}

/// Decode, skip the preamble, and split already-loaded bytes.
pub fn rows_from_bytes(bytes: &[u8], options: &IngestOptions) -> Vec<RawAlarmRow> {
    let text = decode_latin1(bytes);
    let body = skip_preamble(&text, options.preamble_lines);
    let rows = parse_rows(body, options);
    debug!(
        "Decoded {} bytes, skipped {} preamble lines, split {} rows",
        bytes.len(),
        options.preamble_lines,
        rows.len()
    );
    rows
}

// ── Tests ─────────────────────────────────────────────────────────────────────
