//! Log output for the test driver and relaunched children.
//!
//! stdout belongs to the application under test and is compared against
//! golden files, so logs only ever go to stderr or a file.

use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Returned by [`init_tracing`]. Flushes the file writer on drop.
#[derive(Debug)]
pub struct TelemetryGuard {
    _writer: Option<WorkerGuard>,
    installed: bool,
}

impl TelemetryGuard {
    /// False when another subscriber was already in place.
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `default_level`. With `log_file` set, output is
/// appended there through a non-blocking writer; if the file cannot be opened
/// logs fall back to stderr. Only the first call in a process installs
/// anything.
pub fn init_tracing(default_level: &str, log_file: Option<&Path>) -> TelemetryGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let (writer, guard) = log_writer(log_file);
    let ansi = guard.is_none() && std::io::stderr().is_terminal();

    let installed = tracing::subscriber::set_global_default(build_subscriber(filter, writer, ansi))
        .is_ok();
    TelemetryGuard {
        _writer: guard.filter(|_| installed),
        installed,
    }
}

fn log_writer(log_file: Option<&Path>) -> (BoxMakeWriter, Option<WorkerGuard>) {
    let Some(path) = log_file else {
        return (BoxMakeWriter::new(std::io::stderr), None);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        Err(err) => {
            // No subscriber yet to report through.
            eprintln!("warning: cannot open log file {}: {err}", path.display());
            (BoxMakeWriter::new(std::io::stderr), None)
        }
    }
}

fn build_subscriber(
    filter: EnvFilter,
    writer: BoxMakeWriter,
    ansi: bool,
) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .finish()
}
