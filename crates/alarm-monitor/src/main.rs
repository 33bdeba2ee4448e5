mod bootstrap;
mod report;

use alarm_core::error::AlarmError;
use alarm_core::settings::Settings;
use alarm_data::analysis::analyze_source;
use alarm_data::export::export_csv;
use anyhow::{Context, Result};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Alarm Monitor v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "Source: {}, format: {}, require actor: {}",
        settings.source,
        settings.format,
        settings.require_actor
    );

    let options = bootstrap::analysis_options(&settings)?;
    let mut source = bootstrap::source_from_settings(&settings);

    let result = match analyze_source(source.as_mut(), &options) {
        Ok(result) => result,
        Err(AlarmError::EmptyDataset) => {
            eprintln!(
                "No alarm data found in {}: every row was filtered out.",
                source.origin()
            );
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    match settings.format.as_str() {
        "json" => println!("{}", report::render_json(&result)?),
        _ => println!("{}", report::render_text(&result, settings.top)),
    }

    if let Some(path) = &settings.export {
        let written = export_csv(&result.summary.filtered_records, path)
            .with_context(|| format!("exporting filtered alarms to {}", path.display()))?;
        eprintln!("Wrote {} alarms to {}", written, path.display());
    }

    Ok(())
}
