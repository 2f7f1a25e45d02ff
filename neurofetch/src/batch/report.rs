//! Per-item results of a batch run.

use std::fmt;

use crate::catalog::ResourceGroup;

/// What happened to one selected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// A plain file was downloaded.
    Downloaded { bytes: u64 },
    /// The file (or the extraction marker of an archive) already existed.
    AlreadyPresent,
    /// An archive was downloaded, validated and extracted.
    Extracted { files: usize },
    /// An archive member failed validation; the archive was kept.
    Corrupt { member: String },
    /// Download or extraction failed.
    Failed { reason: String },
    /// The name is not in the catalog for its group.
    Unknown,
}

impl ItemStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Downloaded { .. } | Self::AlreadyPresent | Self::Extracted { .. }
        )
    }

    /// Short label for tabular output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Downloaded { .. } => "downloaded",
            Self::AlreadyPresent => "present",
            Self::Extracted { .. } => "extracted",
            Self::Corrupt { .. } => "corrupt",
            Self::Failed { .. } => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloaded { bytes } => write!(f, "downloaded {} bytes", bytes),
            Self::AlreadyPresent => write!(f, "already present"),
            Self::Extracted { files } => write!(f, "extracted {} files", files),
            Self::Corrupt { member } => write!(f, "corrupt archive member '{}'", member),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            Self::Unknown => write!(f, "not in catalog"),
        }
    }
}

/// Result for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub name: String,
    pub group: ResourceGroup,
    pub status: ItemStatus,
}

/// Ordered results of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    entries: Vec<BatchEntry>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: BatchEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&BatchEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|e| e.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Entries that did not succeed, in run order.
    pub fn failures(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter().filter(|e| !e.status.is_success())
    }

    /// Bytes downloaded during this run.
    pub fn bytes_downloaded(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| match e.status {
                ItemStatus::Downloaded { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }
}
