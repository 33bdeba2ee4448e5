use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Number of structural header lines at the top of every alarm export.
pub const DEFAULT_PREAMBLE_LINES: usize = 5;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Parse an equipment alarm-history export and summarise it
#[derive(Parser, Debug, Clone)]
#[command(
    name = "alarm-monitor",
    about = "Parse an equipment alarm-history export and summarise it",
    version
)]
pub struct Settings {
    /// Alarm log to load: a file path, `-` for stdin, or an http(s) URL
    pub source: String,

    /// Start of the date range (YYYY-MM-DD[ HH:MM:SS] or DD-MM-YYYY[ HH:MM:SS])
    #[arg(long)]
    pub from: Option<String>,

    /// End of the date range, inclusive; a bare date covers the whole day
    #[arg(long)]
    pub to: Option<String>,

    /// Drop alarms that carry no usable actor annotation
    #[arg(long)]
    pub require_actor: bool,

    /// Header lines to discard before the first data row
    #[arg(long, default_value_t = DEFAULT_PREAMBLE_LINES)]
    pub skip_lines: usize,

    /// Field delimiter of the export
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// Report format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// Number of actors listed in the text report
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Write the date-filtered records to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Timeout in seconds for URL sources (1-600)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=600))]
    pub timeout: u64,

    /// Fetch attempts for URL sources (1-10)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub retries: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.alarm-monitor/last_used.json`.
///
/// Only reporting and fetch knobs are remembered. Anything that changes how
/// an export is parsed or filtered (source, preamble, delimiter, date range,
/// actor filter) is always taken from the current command line.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".alarm-monitor").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("Could not clear {}: {}", config_path.display(), e);
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins. clap keys arg ids by field name, not flag spelling.
        if !is_arg_explicitly_set(&matches, "format") {
            if let Some(v) = last.format {
                settings.format = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "top") {
            if let Some(v) = last.top {
                settings.top = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timeout") {
            if let Some(v) = last.timeout {
                settings.timeout = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "retries") {
            if let Some(v) = last.retries {
                settings.retries = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!("Could not persist settings to {}: {}", config_path.display(), e);
        }

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            format: Some(s.format.clone()),
            top: Some(s.top),
            timeout: Some(s.timeout),
            retries: Some(s.retries),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| (*s).into()).collect()
    }

    // ── LastUsedParams ────────────────────────────────────────────────────────

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            format: Some("json".to_string()),
            top: Some(5),
            timeout: Some(60),
            retries: Some(2),
        };

        params.save_to(&path).expect("save");
        let loaded = LastUsedParams::load_from(&path);

        assert_eq!(loaded.format, Some("json".to_string()));
        assert_eq!(loaded.top, Some(5));
        assert_eq!(loaded.timeout, Some(60));
        assert_eq!(loaded.retries, Some(2));
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            format: Some("json".to_string()),
            ..Default::default()
        };
        params.save_to(&path).expect("save");
        assert!(path.exists(), "file must exist after save");

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists(), "file must be gone after clear");
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.format.is_none());
        assert!(loaded.top.is_none());
        assert!(loaded.timeout.is_none());
        assert!(loaded.retries.is_none());
    }

    #[test]
    fn test_last_used_params_default_when_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let loaded = LastUsedParams::load_from(&path);
        assert!(loaded.format.is_none());
    }

    // ── Settings parsing ──────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["alarm-monitor", "AlarmHistory.csv"]);

        assert_eq!(settings.source, "AlarmHistory.csv");
        assert!(settings.from.is_none());
        assert!(settings.to.is_none());
        assert!(!settings.require_actor);
        assert_eq!(settings.skip_lines, DEFAULT_PREAMBLE_LINES);
        assert_eq!(settings.delimiter, ',');
        assert_eq!(settings.format, "text");
        assert_eq!(settings.top, 10);
        assert!(settings.export.is_none());
        assert_eq!(settings.timeout, 30);
        assert_eq!(settings.retries, 3);
        assert_eq!(settings.log_level, "INFO");
        assert!(settings.log_file.is_none());
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_cli_date_range_and_filter() {
        let settings = Settings::parse_from([
            "alarm-monitor",
            "AlarmHistory.csv",
            "--from",
            "2025-03-01",
            "--to",
            "2025-03-02 12:00:00",
            "--require-actor",
        ]);
        assert_eq!(settings.from.as_deref(), Some("2025-03-01"));
        assert_eq!(settings.to.as_deref(), Some("2025-03-02 12:00:00"));
        assert!(settings.require_actor);
    }

    #[test]
    fn test_settings_cli_export_and_delimiter() {
        let settings = Settings::parse_from([
            "alarm-monitor",
            "-",
            "--export",
            "/tmp/filtered.csv",
            "--delimiter",
            ";",
        ]);
        assert_eq!(settings.source, "-");
        assert_eq!(settings.export, Some(PathBuf::from("/tmp/filtered.csv")));
        assert_eq!(settings.delimiter, ';');
    }

    #[test]
    fn test_settings_rejects_out_of_range_retries() {
        let result = Settings::try_parse_from(["alarm-monitor", "a.csv", "--retries", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_rejects_unknown_format() {
        let result = Settings::try_parse_from(["alarm-monitor", "a.csv", "--format", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_requires_source() {
        assert!(Settings::try_parse_from(["alarm-monitor"]).is_err());
    }

    // ── load_with_last_used ───────────────────────────────────────────────────

    #[test]
    fn test_load_with_last_used_merges_persisted_format() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            format: Some("json".to_string()),
            top: Some(3),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["alarm-monitor", "a.csv"]), &config_path);
        assert_eq!(settings.format, "json");
        assert_eq!(settings.top, 3);
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            format: Some("json".to_string()),
            timeout: Some(90),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["alarm-monitor", "a.csv", "--format", "text", "--timeout", "5"]),
            &config_path,
        );
        assert_eq!(settings.format, "text");
        assert_eq!(settings.timeout, 5);
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            format: Some("json".to_string()),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");
        assert!(config_path.exists(), "file must exist before clear");

        Settings::load_with_last_used_impl(
            args(&["alarm-monitor", "a.csv", "--clear"]),
            &config_path,
        );

        assert!(!config_path.exists(), "file must be gone after --clear");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings = Settings::load_with_last_used_impl(
            args(&["alarm-monitor", "a.csv", "--debug"]),
            &config_path,
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&["alarm-monitor", "a.csv", "--top", "4", "--retries", "5"]),
            &config_path,
        );

        assert!(
            config_path.exists(),
            "config file must be persisted after run"
        );
        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.top, Some(4));
        assert_eq!(loaded.retries, Some(5));
    }

    #[test]
    fn test_load_with_last_used_never_persists_actor_filter() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&["alarm-monitor", "a.csv", "--require-actor"]),
            &config_path,
        );
        let settings =
            Settings::load_with_last_used_impl(args(&["alarm-monitor", "a.csv"]), &config_path);
        assert!(!settings.require_actor);
    }

    #[test]
    fn test_load_with_last_used_never_persists_export_layout() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&[
                "alarm-monitor",
                "other.csv",
                "--skip-lines",
                "0",
                "--delimiter",
                ";",
            ]),
            &config_path,
        );
        let settings = Settings::load_with_last_used_impl(
            args(&["alarm-monitor", "AlarmHistory.csv"]),
            &config_path,
        );
        assert_eq!(settings.skip_lines, DEFAULT_PREAMBLE_LINES);
        assert_eq!(settings.delimiter, ',');

        let saved = std::fs::read_to_string(&config_path).expect("read");
        assert!(!saved.contains("skip_lines"));
        assert!(!saved.contains("delimiter"));
    }
}
