//! Terminal rendering of an analysis result.

use alarm_core::formatting::{format_count, format_share, render_bar, truncate};
use alarm_core::models::{ActorCount, AlarmRecord, DateRange, HOURS_PER_DAY};
use alarm_data::analysis::{AnalysisMetadata, AnalysisResult};
use serde::Serialize;

/// Widest actor name shown in the text report.
const ACTOR_COLUMN_WIDTH: usize = 28;

/// Width of the histogram and actor bars.
const BAR_WIDTH: usize = 30;

const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── JSON ───────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a AnalysisMetadata,
    total_count: usize,
    unique_message_count: usize,
    unique_actor_count: usize,
    top_actor: Option<&'a ActorCount>,
    actor_frequency: &'a [ActorCount],
    range: &'a DateRange,
    filtered_count: usize,
    hour_histogram: &'a [u64; HOURS_PER_DAY],
    filtered_records: &'a [AlarmRecord],
}

/// Render `result` as pretty-printed JSON.
pub fn render_json(result: &AnalysisResult) -> serde_json::Result<String> {
    let summary = &result.summary;
    let report = JsonReport {
        metadata: &result.metadata,
        total_count: summary.total_count,
        unique_message_count: summary.unique_message_count(),
        unique_actor_count: summary.unique_actor_count(),
        top_actor: summary.top_actor(),
        actor_frequency: &summary.actor_frequency,
        range: &summary.range,
        filtered_count: summary.filtered_count(),
        hour_histogram: summary.hour_histogram.buckets(),
        filtered_records: &summary.filtered_records,
    };
    serde_json::to_string_pretty(&report)
}

// ── Text ───────────────────────────────────────────────────────────────────────

/// Render `result` as a plain-text report listing at most `top` actors.
pub fn render_text(result: &AnalysisResult, top: usize) -> String {
    let summary = &result.summary;
    let stats = &result.metadata.normalize;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("Alarm history: {}", result.metadata.origin));
    lines.push(format!(
        "Range: {} to {}",
        summary.range.start.format(DISPLAY_TIMESTAMP_FORMAT),
        summary.range.end.format(DISPLAY_TIMESTAMP_FORMAT)
    ));
    lines.push(String::new());

    let top_actor = summary
        .top_actor()
        .map(|a| format!("{} ({})", a.actor, format_count(a.count)))
        .unwrap_or_else(|| "-".to_string());
    let metrics = [
        ("Total alarms", format_count(summary.total_count as u64)),
        ("Unique messages", format_count(summary.unique_message_count() as u64)),
        ("Unique actors", format_count(summary.unique_actor_count() as u64)),
        ("Top actor", top_actor),
        ("Alarms in range", format_count(summary.filtered_count() as u64)),
    ];
    for (label, value) in metrics {
        lines.push(format!("  {:<18}{}", label, value));
    }
    lines.push(String::new());

    lines.push(format!(
        "Rows: {} read, {} dropped ({} not data, {} bad timestamp, {} without actor)",
        format_count(stats.rows_read as u64),
        format_count(stats.dropped() as u64),
        stats.dropped_not_data,
        stats.dropped_bad_timestamp,
        stats.dropped_no_actor,
    ));
    lines.push(String::new());

    lines.push("Alarms by actor".to_string());
    if summary.actor_frequency.is_empty() {
        lines.push("  (no attributed alarms)".to_string());
    }
    let with_actor: u64 = summary.actor_frequency.iter().map(|a| a.count).sum();
    let max_actor = summary.top_actor().map(|a| a.count).unwrap_or(0);
    for entry in summary.actor_frequency.iter().take(top) {
        lines.push(format!(
            "  {:<width$} {:>7} {:>7}  {}",
            truncate(&entry.actor, ACTOR_COLUMN_WIDTH),
            format_count(entry.count),
            format_share(entry.count, with_actor),
            render_bar(entry.count, max_actor, BAR_WIDTH),
            width = ACTOR_COLUMN_WIDTH,
        ));
    }
    let hidden = summary.actor_frequency.len().saturating_sub(top);
    if hidden > 0 {
        lines.push(format!("  ... {} more", hidden));
    }
    lines.push(String::new());

    lines.push("Alarms by hour (in range)".to_string());
    let buckets = summary.hour_histogram.buckets();
    let max_hour = buckets.iter().copied().max().unwrap_or(0);
    for (hour, &count) in buckets.iter().enumerate() {
        lines.push(format!(
            "  {:02}:00 {:>7}  {}",
            hour,
            format_count(count),
            render_bar(count, max_hour, BAR_WIDTH)
        ));
    }

    lines.join("\n")
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use alarm_data::analysis::{analyze_bytes, AnalysisOptions};

    const EXPORT: &[u8] = b"h1\nh2\nh3\nh4\nh5\n\
01-03-2025 14:22:10,Critical,E102,Low level - por John Smith\n\
01-03-2025 14:40:00,Warning,W201,Presi\xf3n alta - Por Ana\n\
02-03-2025 09:00:00,Critical,E102,Low level - por John Smith\n\
02-03-2025 09:05:00,Info,I001,Door open\n\
not-a-date,X,Y,Z\n";

    fn result() -> AnalysisResult {
        analyze_bytes("AlarmHistory.csv", EXPORT, &AnalysisOptions::default()).unwrap()
    }

    #[test]
    fn test_render_text_metrics() {
        let text = render_text(&result(), 10);
        assert!(text.starts_with("Alarm history: AlarmHistory.csv"));
        assert!(text.contains("Range: 2025-03-01 14:22:10 to 2025-03-02 09:05:00"));
        assert!(text.contains("Total alarms      4"));
        assert!(text.contains("Unique actors     2"));
        assert!(text.contains("Top actor         John Smith (2)"));
        assert!(text.contains(
            "Rows: 5 read, 1 dropped (1 not data, 0 bad timestamp, 0 without actor)"
        ));
    }

    #[test]
    fn test_render_text_actor_table() {
        let text = render_text(&result(), 10);
        let john = text
            .lines()
            .find(|l| l.trim_start().starts_with("John Smith"))
            .unwrap();
        assert!(john.contains("66.7%"));
        assert!(text.contains("Ana"));
    }

    #[test]
    fn test_render_text_limits_actor_rows() {
        let text = render_text(&result(), 1);
        assert!(!text.lines().any(|l| l.trim_start().starts_with("Ana ")));
        assert!(text.contains("... 1 more"));
    }

    #[test]
    fn test_render_text_hour_rows() {
        let text = render_text(&result(), 10);
        let hour_lines: Vec<&str> = text
            .lines()
            .skip_while(|l| *l != "Alarms by hour (in range)")
            .skip(1)
            .collect();
        assert_eq!(hour_lines.len(), HOURS_PER_DAY);
        assert!(hour_lines[14].starts_with("  14:00       2"));
        assert!(hour_lines[9].starts_with("  09:00       2"));
        assert!(hour_lines[0].trim_end().ends_with('0'));
    }

    #[test]
    fn test_render_json_shape() {
        let json = render_json(&result()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["total_count"], 4);
        assert_eq!(value["unique_actor_count"], 2);
        assert_eq!(value["top_actor"]["actor"], "John Smith");
        assert_eq!(value["hour_histogram"].as_array().unwrap().len(), 24);
        assert_eq!(value["hour_histogram"][14], 2);
        assert_eq!(value["filtered_records"].as_array().unwrap().len(), 4);
        assert_eq!(value["filtered_records"][1]["message"], "Presión alta");
        assert_eq!(value["metadata"]["normalize"]["dropped_not_data"], 1);
    }
}
