//! Tracing subscriber setup.
//!
//! Logs go to stderr; with a log directory they are also written to
//! `neurofetch.log` there through a non-blocking writer. `RUST_LOG`
//! overrides the verbosity-derived filter.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{FetchError, FetchResult};

/// File name used inside the log directory.
pub const LOG_FILE_NAME: &str = "neurofetch.log";

/// Keeps the file writer alive; drop it last to flush buffered lines.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Level for our own crates at the given `-v` count.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn build_env_filter(verbosity: u8) -> EnvFilter {
    let level = level_for_verbosity(verbosity);
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,neurofetch={0},neurofetch_cli={0}", level))
    })
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(verbosity: u8, log_dir: Option<&Path>) -> FetchResult<LoggingGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).map_err(|e| FetchError::CreateDirFailed {
                path: dir.to_path_buf(),
                source: e,
            })?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(build_env_filter(verbosity))
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| FetchError::Logging(e.to_string()))?;

    Ok(LoggingGuard { _file: guard })
}
