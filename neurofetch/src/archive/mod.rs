//! Archive validation and extraction.
//!
//! An archive is checked in full before anything is written: every member
//! is read to the end so its CRC is verified, and member paths must stay
//! inside the destination. A single bad member rejects the whole archive,
//! leaves the destination untouched and keeps the archive on disk.

mod zipfile;

use std::fmt;
use std::path::Path;

use crate::error::FetchResult;

pub use zipfile::ZipExtractor;

/// Outcome of validating (and possibly extracting) an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveValidation {
    /// Every member passed; `files` regular files were (or would be) extracted.
    Valid { files: usize },
    /// The named member failed its integrity check. Nothing was extracted.
    Corrupt(String),
}

impl ArchiveValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

impl fmt::Display for ArchiveValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid { files } => write!(f, "valid ({} files)", files),
            Self::Corrupt(member) => write!(f, "corrupt member '{}'", member),
        }
    }
}

/// Archive format handler.
pub trait ArchiveExtractor {
    /// Check every member without writing anything.
    fn validate(&self, archive_path: &Path) -> FetchResult<ArchiveValidation>;

    /// Validate, then extract all members into `dest_dir`.
    ///
    /// Returns `Corrupt` without touching `dest_dir` when validation fails.
    /// Deleting the archive afterwards is the caller's job.
    fn validate_and_extract(
        &self,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> FetchResult<ArchiveValidation>;

    /// Member names in archive order.
    fn list_contents(&self, archive_path: &Path) -> FetchResult<Vec<String>>;
}
