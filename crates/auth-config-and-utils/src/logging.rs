//! Logging initialization.
//!
//! Everything in the workspace logs through `tracing` macros; binaries call
//! [`init_logging`] once at startup. Console output goes to stderr so stdout
//! stays free for command results. When a log file is given, every event is
//! also appended to it as one JSON object per line.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const ENV_LOG_FORMAT: &str = "SIGNER_AUTH_LOG_FORMAT";

/// Append-only writer for the JSONL log file.
///
/// Flushes after every write so concurrent CLI invocations interleave whole
/// lines.
#[derive(Clone)]
pub struct LogFileWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl LogFileWriter {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Initialize the global tracing subscriber.
///
/// - Log level from `RUST_LOG` or the provided default
/// - stderr as JSON lines when `SIGNER_AUTH_LOG_FORMAT=json`, compact text otherwise
/// - JSON lines appended to `log_file` when one is given
///
/// A log file that cannot be opened is reported on stderr and skipped.
/// Calling this more than once is a no-op.
///
/// ```ignore
/// init_logging("info", Some(&paths.log_file()));
/// tracing::info!("ready");
/// ```
pub fn init_logging(level: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_level(level).to_string().to_ascii_lowercase()));

    let json = std::env::var(ENV_LOG_FORMAT)
        .map(|value| value.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut open_error = None;
    let file_layer = log_file.and_then(|path| match LogFileWriter::open(path) {
        Ok(writer) => Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer),
        ),
        Err(e) => {
            open_error = Some((path.to_path_buf(), e));
            None
        }
    });

    let stderr_json = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_writer(io::stderr)
    });
    let stderr_text = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(io::stderr)
    });

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_json)
        .with(stderr_text)
        .try_init();

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
        return;
    }

    match (open_error, log_file) {
        (Some((path, e)), _) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to open log file");
        }
        (None, Some(path)) => {
            tracing::debug!(path = %path.display(), "Logging to file");
        }
        (None, None) => {}
    }
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
