//! Byte sources for alarm exports.
//!
//! A local file, an uploaded stream and a remote URL all satisfy the same
//! [`AlarmSource`] contract: hand back the complete raw bytes of one export or
//! fail with [`AlarmError::Ingestion`].

use std::io::Read;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use alarm_core::error::{AlarmError, Result};
use tracing::{debug, info, warn};

/// Default per-request timeout for [`UrlSource`].
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default number of fetch attempts for [`UrlSource`].
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Initial back-off between failed fetch attempts; doubled after each failure.
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

// ── AlarmSource ───────────────────────────────────────────────────────────────

/// Something an alarm export can be read from.
pub trait AlarmSource {
    /// Human-readable origin used in logs and error messages.
    fn origin(&self) -> String;

    /// Read the whole export.
    fn read_bytes(&mut self) -> Result<Vec<u8>>;
}

// ── FileSource ────────────────────────────────────────────────────────────────

/// An export on the local (or mounted network) filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AlarmSource for FileSource {
    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let bytes =
            std::fs::read(&self.path).map_err(|e| AlarmError::ingestion(self.origin(), e))?;
        debug!("Read {} bytes from {}", bytes.len(), self.path.display());
        Ok(bytes)
    }
}

// ── StreamSource ──────────────────────────────────────────────────────────────

/// An uploaded byte stream: stdin, an HTTP request body, an in-memory buffer.
pub struct StreamSource<R> {
    label: String,
    reader: R,
}

impl<R: Read> StreamSource<R> {
    pub fn new(label: impl Into<String>, reader: R) -> Self {
        Self {
            label: label.into(),
            reader,
        }
    }
}

impl StreamSource<std::io::Stdin> {
    /// Read the export from standard input.
    pub fn stdin() -> Self {
        Self::new("stdin", std::io::stdin())
    }
}

impl<R: Read> AlarmSource for StreamSource<R> {
    fn origin(&self) -> String {
        self.label.clone()
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.reader
            .read_to_end(&mut bytes)
            .map_err(|e| AlarmError::ingestion(self.origin(), e))?;
        debug!("Read {} bytes from {}", bytes.len(), self.label);
        Ok(bytes)
    }
}

// ── UrlSource ─────────────────────────────────────────────────────────────────

/// An export served over HTTP(S), fetched with a blocking client.
///
/// Transport failures and non-success statuses are retried with exponential
/// back-off; the last failure is surfaced once every attempt is spent.
#[derive(Debug, Clone)]
pub struct UrlSource {
    url: String,
    timeout: Duration,
    attempts: u32,
}

impl UrlSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            attempts: DEFAULT_FETCH_ATTEMPTS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total number of attempts, at least one.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn fetch_once(&self, client: &reqwest::blocking::Client) -> reqwest::Result<Vec<u8>> {
        let response = client.get(&self.url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

impl AlarmSource for UrlSource {
    fn origin(&self) -> String {
        self.url.clone()
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| AlarmError::ingestion(self.origin(), e))?;

        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.fetch_once(&client) {
                Ok(bytes) => {
                    info!("Fetched {} bytes from {}", bytes.len(), self.url);
                    return Ok(bytes);
                }
                Err(e) if attempt < self.attempts => {
                    warn!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt, self.attempts, self.url, e
                    );
                    thread::sleep(backoff);
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(AlarmError::ingestion(self.origin(), e)),
            }
        }
    }
}

// ── Source selection ──────────────────────────────────────────────────────────

/// Pick the source adapter for a command-line source string.
///
/// * `-` reads standard input.
/// * `http://` and `https://` prefixes fetch a URL.
/// * anything else is a filesystem path.
pub fn open_source(spec: &str, timeout: Duration, attempts: u32) -> Box<dyn AlarmSource> {
    let lowered = spec.to_ascii_lowercase();
    if spec == "-" {
        Box::new(StreamSource::stdin())
    } else if lowered.starts_with("http://") || lowered.starts_with("https://") {
        Box::new(
            UrlSource::new(spec)
                .with_timeout(timeout)
                .with_attempts(attempts),
        )
    } else {
        Box::new(FileSource::new(spec))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    /// A reader that fails like a closed upload stream.
    struct BrokenPipe;

    impl Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stream closed",
            ))
        }
    }

    // ── FileSource ────────────────────────────────────────────────────────────

    #[test]
    fn test_file_source_reads_raw_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("AlarmHistory.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"Presi\xf3n alta").unwrap();

        let bytes = FileSource::new(&path).read_bytes().unwrap();
        assert_eq!(bytes, b"Presi\xf3n alta");
    }

    #[test]
    fn test_file_source_missing_file_is_ingestion_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.csv");

        let err = FileSource::new(&path).read_bytes().unwrap_err();
        match err {
            AlarmError::Ingestion { origin, source } => {
                assert!(origin.ends_with("missing.csv"));
                let io = source.downcast_ref::<std::io::Error>().unwrap();
                assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected ingestion error, got {other:?}"),
        }
    }

    // ── StreamSource ──────────────────────────────────────────────────────────

    #[test]
    fn test_stream_source_reads_buffer() {
        let mut source = StreamSource::new("upload", &b"line one\nline two\n"[..]);
        assert_eq!(source.origin(), "upload");
        assert_eq!(source.read_bytes().unwrap(), b"line one\nline two\n");
    }

    #[test]
    fn test_stream_source_closed_stream_is_ingestion_error() {
        let mut source = StreamSource::new("upload", BrokenPipe);
        let err = source.read_bytes().unwrap_err();
        assert!(matches!(err, AlarmError::Ingestion { .. }));
        assert!(err.to_string().contains("stream closed"));
    }

    // ── UrlSource ─────────────────────────────────────────────────────────────

    #[test]
    fn test_url_source_attempts_clamped() {
        let source = UrlSource::new("http://nas/AlarmHistory.csv").with_attempts(0);
        assert_eq!(source.attempts(), 1);
        assert_eq!(source.origin(), "http://nas/AlarmHistory.csv");
    }

    #[test]
    fn test_url_source_unreachable_is_ingestion_error() {
        let url = "http://127.0.0.1:1/AlarmHistory.csv";
        let mut source = UrlSource::new(url)
            .with_timeout(Duration::from_secs(2))
            .with_attempts(2);

        let started = std::time::Instant::now();
        let err = source.read_bytes().unwrap_err();

        // One back-off sleep between the two attempts.
        assert!(started.elapsed() >= INITIAL_BACKOFF);
        match err {
            AlarmError::Ingestion { origin, .. } => assert_eq!(origin, url),
            other => panic!("expected ingestion error, got {other:?}"),
        }
    }

    // ── open_source ───────────────────────────────────────────────────────────

    #[test]
    fn test_open_source_selects_adapter() {
        let timeout = Duration::from_secs(5);
        assert_eq!(open_source("-", timeout, 1).origin(), "stdin");
        assert_eq!(
            open_source("HTTPS://nas/alarms.csv", timeout, 1).origin(),
            "HTTPS://nas/alarms.csv"
        );
        assert_eq!(
            open_source("/data/AlarmHistory.csv", timeout, 1).origin(),
            "/data/AlarmHistory.csv"
        );
    }

    #[test]
    fn test_open_source_path_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "x").unwrap();

        let mut source = open_source(path.to_str().unwrap(), Duration::from_secs(1), 1);
        assert_eq!(source.read_bytes().unwrap(), b"x");
    }
}
