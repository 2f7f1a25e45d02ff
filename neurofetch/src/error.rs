//! Error types for fetch, archive and catalog operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for neurofetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while staging remote resources.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A fetch request was constructed with out-of-range parameters.
    #[error("invalid fetch request: {0}")]
    InvalidRequest(String),

    /// The HTTP client could not be built.
    #[error("failed to create HTTP client: {0}")]
    ClientBuild(String),

    /// The request could not be sent or the body could not be read.
    #[error("failed to download {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("GET {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    /// The connection stayed silent for longer than the idle timeout.
    #[error("request to {url} timed out after {timeout_secs}s without data")]
    Timeout { url: String, timeout_secs: u64 },

    /// The body ended before the advertised content length.
    #[error("download of {url} truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        url: String,
        expected: u64,
        actual: u64,
    },

    /// Checksum verification failed.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// Atomic rename of a staged download onto its target failed.
    #[error("failed to move staged download into {}: {source}", path.display())]
    PersistFailed { path: PathBuf, source: io::Error },

    /// Archive could not be read or extracted.
    #[error("failed to extract {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tracing subscriber could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

impl FetchError {
    /// Whether another attempt at the same download could succeed.
    ///
    /// Client errors (4xx other than 408/429) and local filesystem failures
    /// are still retried by the fetcher; this only informs log levels.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::DownloadFailed { .. }
            | Self::Timeout { .. }
            | Self::Truncated { .. }
            | Self::ChecksumMismatch { .. } => true,
            Self::HttpStatus { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }
}
