//! CLI error type and exit codes.

use std::path::PathBuf;

use neurofetch::FetchError;
use thiserror::Error;

/// Exit code for invocation errors (bad arguments, unreadable inputs, bad config).
pub const EXIT_USAGE: u8 = 1;

/// Exit code when the batch finished but some items were not installed.
pub const EXIT_PARTIAL: u8 = 2;

/// Errors that end a CLI invocation.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing OUTPUT_DIR argument")]
    MissingOutputDir,

    #[error("cannot create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot read list file {}: {source}", path.display())]
    ListFile { path: PathBuf, source: FetchError },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{failed} of {total} items were not installed")]
    Incomplete { failed: usize, total: usize },

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Incomplete { .. } => EXIT_PARTIAL,
            _ => EXIT_USAGE,
        }
    }
}
