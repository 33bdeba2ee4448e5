//! CSV export of normalized alarm records.

use std::io::Write;
use std::path::Path;

use alarm_core::error::Result;
use alarm_core::models::AlarmRecord;
use serde::Serialize;
use tracing::info;

/// Timestamp layout used in exported files.
/// Sub-second digits are written only when present.
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// One exported line. Column names and order are fixed.
#[derive(Serialize)]
struct ExportRow<'a> {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "AlarmType")]
    alarm_type: &'a str,
    #[serde(rename = "AlarmCode")]
    alarm_code: &'a str,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "Usuario")]
    actor: &'a str,
}

impl<'a> From<&'a AlarmRecord> for ExportRow<'a> {
    fn from(record: &'a AlarmRecord) -> Self {
        Self {
            timestamp: record.timestamp.format(EXPORT_TIMESTAMP_FORMAT).to_string(),
            alarm_type: &record.alarm_type,
            alarm_code: &record.alarm_code,
            message: &record.message,
            actor: record.actor.as_deref().unwrap_or(""),
        }
    }
}

/// Write `records` as UTF-8 CSV with a header row. Returns the number of
/// records written.
pub fn write_csv<W: Write>(records: &[AlarmRecord], writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ExportRow::from(record))?;
    }
    if records.is_empty() {
        csv_writer.write_record(["Timestamp", "AlarmType", "AlarmCode", "Message", "Usuario"])?;
    }
    csv_writer.flush()?;
    Ok(records.len())
}

/// Write `records` to a CSV file at `path`, replacing any existing file.
pub fn export_csv(records: &[AlarmRecord], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)?;
    let written = write_csv(records, file)?;
    info!("Exported {} records to {}", written, path.display());
    Ok(written)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
