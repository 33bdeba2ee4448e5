use chrono::NaiveDateTime;
use thiserror::Error;

/// Boxed cause carried by [`AlarmError::Ingestion`].
pub type IngestionCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors produced by the alarm pipeline.
///
/// Only [`AlarmError::Ingestion`] and [`AlarmError::EmptyDataset`] are raised
/// by the pipeline itself; per-row data problems are counted, never returned.
#[derive(Error, Debug)]
pub enum AlarmError {
    /// The byte source could not be opened, fetched or read.
    #[error("Failed to read alarm log from {origin}: {source}")]
    Ingestion {
        origin: String,
        #[source]
        source: IngestionCause,
    },

    /// Normalization left no records to aggregate.
    #[error("No alarm records remain after normalization")]
    EmptyDataset,

    /// A timestamp or date bound string did not match any recognised format.
    #[error("Invalid timestamp format: {0}")]
    TimestampParse(String),

    /// The requested date range has its start after its end.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Writing the CSV export failed.
    #[error("Failed to write CSV export: {0}")]
    Export(#[from] csv::Error),

    /// A report could not be serialised to JSON.
    #[error("Failed to serialise JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not belong to a source.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlarmError {
    /// Wrap `cause` as an ingestion failure for the source described by `origin`.
    pub fn ingestion<E>(origin: impl Into<String>, cause: E) -> Self
    where
        E: Into<IngestionCause>,
    {
        AlarmError::Ingestion {
            origin: origin.into(),
            source: cause.into(),
        }
    }
}

/// Convenience alias used throughout the alarm crates.
pub type Result<T> = std::result::Result<T, AlarmError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::error::Error as _;

    #[test]
    fn test_error_display_ingestion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = AlarmError::ingestion("/some/AlarmHistory.csv", io_err);
        let msg = err.to_string();
        assert!(msg.contains("Failed to read alarm log"));
        assert!(msg.contains("/some/AlarmHistory.csv"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_ingestion_keeps_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = AlarmError::ingestion("http://nas/alarms.csv", io_err);
        let source = err.source().expect("ingestion error must carry a cause");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn test_error_ingestion_from_string_cause() {
        let err = AlarmError::ingestion("stdin", "stream closed");
        assert_eq!(
            err.to_string(),
            "Failed to read alarm log from stdin: stream closed"
        );
    }

    #[test]
    fn test_error_display_empty_dataset() {
        let err = AlarmError::EmptyDataset;
        assert_eq!(
            err.to_string(),
            "No alarm records remain after normalization"
        );
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = AlarmError::TimestampParse("not-a-date".to_string());
        assert_eq!(err.to_string(), "Invalid timestamp format: not-a-date");
    }

    #[test]
    fn test_error_display_invalid_range() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let err = AlarmError::InvalidDateRange { start, end };
        assert_eq!(
            err.to_string(),
            "Invalid date range: 2025-03-02 00:00:00 is after 2025-03-01 00:00:00"
        );
    }

    #[test]
    fn test_error_display_config() {
        let err = AlarmError::Config("delimiter must be a single byte".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: delimiter must be a single byte"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AlarmError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: AlarmError = json_err.into();
        assert!(err.to_string().contains("Failed to serialise JSON"));
    }
}
