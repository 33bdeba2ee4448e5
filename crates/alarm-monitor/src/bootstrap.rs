use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use alarm_core::settings::Settings;
use alarm_core::time_utils::{parse_range_bound, RangeBound};
use alarm_data::analysis::AnalysisOptions;
use alarm_data::reader::IngestOptions;
use alarm_data::source::{open_source, AlarmSource};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map the CLI level names onto `tracing` filter directives.
///
/// Unknown strings pass through unchanged so that full `EnvFilter`
/// directives (`alarm_data=debug`) keep working.
pub fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so that reports on stdout stay machine-readable. When
/// `log_file` is given, the same events are also appended to that file
/// without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Pipeline bootstrap ─────────────────────────────────────────────────────────

/// Translate CLI settings into pipeline options.
///
/// Fails on an unsupported delimiter or an unparseable date bound.
pub fn analysis_options(settings: &Settings) -> anyhow::Result<AnalysisOptions> {
    let ingest = IngestOptions::new(settings.skip_lines, settings.delimiter)?;
    let start = settings
        .from
        .as_deref()
        .map(|s| parse_range_bound(s, RangeBound::Start))
        .transpose()?;
    let end = settings
        .to
        .as_deref()
        .map(|s| parse_range_bound(s, RangeBound::End))
        .transpose()?;

    Ok(AnalysisOptions {
        ingest,
        require_actor: settings.require_actor,
        start,
        end,
    })
}

/// Open the source named on the command line.
pub fn source_from_settings(settings: &Settings) -> Box<dyn AlarmSource> {
    open_source(
        &settings.source,
        Duration::from_secs(settings.timeout),
        settings.retries,
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
