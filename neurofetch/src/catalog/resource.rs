//! Resource descriptors.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use crate::error::{FetchError, FetchResult};

/// Sub-directory of the output root that ANTsXNet data and networks live in.
pub const ANTSXNET_SUBDIR: &str = "ANTsXNet";

/// Resource groups, in the order a full run processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceGroup {
    /// Model archives (PyMM, SIQ super-resolution).
    Models,
    /// ANTsXNet templates and data files.
    Data,
    /// ANTsXNet pretrained network weights.
    Networks,
}

impl ResourceGroup {
    /// All groups in run order.
    pub const ALL: [ResourceGroup; 3] = [Self::Models, Self::Data, Self::Networks];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Models => "models",
            Self::Data => "data",
            Self::Networks => "networks",
        }
    }

    /// Sub-directory used when a resource does not set one.
    pub fn default_subdir(&self) -> &'static str {
        match self {
            Self::Models => "",
            Self::Data | Self::Networks => ANTSXNET_SUBDIR,
        }
    }
}

impl fmt::Display for ResourceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for ResourceGroup {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "models" => Ok(Self::Models),
            "data" => Ok(Self::Data),
            "networks" => Ok(Self::Networks),
            other => Err(FetchError::InvalidConfig(format!(
                "unknown resource group '{}' (expected models, data or networks)",
                other
            ))),
        }
    }
}

/// Directory a resource's `subdir` is resolved against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResourceRoot {
    /// The run's output directory.
    #[default]
    Output,
    /// The PyMM model directory (`~/.antspymm` unless configured).
    Pymm,
}

impl ResourceRoot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Pymm => "pymm",
        }
    }
}

impl fmt::Display for ResourceRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for ResourceRoot {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "output" => Ok(Self::Output),
            "pymm" => Ok(Self::Pymm),
            other => Err(FetchError::InvalidConfig(format!(
                "unknown resource root '{}' (expected output or pymm)",
                other
            ))),
        }
    }
}

/// A named remote resource and where it lands under its root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub name: String,
    pub group: ResourceGroup,
    pub url: String,
    /// File name of the download inside the destination directory.
    pub file_name: String,
    /// Directory `subdir` is relative to.
    pub root: ResourceRoot,
    /// Destination directory relative to the root ("" for the root itself).
    pub subdir: String,
    /// Whether the download is a zip archive to validate and extract.
    pub archive: bool,
    /// Expected lowercase hex SHA-256 of the download.
    pub sha256: Option<String>,
}

impl Resource {
    /// A plain file resource named after itself.
    pub fn file(name: impl Into<String>, group: ResourceGroup, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            file_name: name.clone(),
            name,
            group,
            url: url.into(),
            root: ResourceRoot::Output,
            subdir: group.default_subdir().to_string(),
            archive: false,
            sha256: None,
        }
    }

    /// An archive resource downloaded as `<name>.zip`.
    pub fn archive(name: impl Into<String>, group: ResourceGroup, url: impl Into<String>) -> Self {
        let mut resource = Self::file(name, group, url);
        resource.file_name = format!("{}.zip", resource.name);
        resource.archive = true;
        resource
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn with_root(mut self, root: ResourceRoot) -> Self {
        self.root = root;
        self
    }

    pub fn with_subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = subdir.into();
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into().to_lowercase());
        self
    }

    /// Directory the download (and, for archives, its contents) lands in.
    ///
    /// `root` is the directory [`root`](Self::root) resolves to for this run.
    pub fn dest_dir(&self, root: &Path) -> PathBuf {
        if self.subdir.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.subdir)
        }
    }

    /// Full path of the downloaded file.
    pub fn target_path(&self, root: &Path) -> PathBuf {
        self.dest_dir(root).join(&self.file_name)
    }

    /// Marker recording a completed extraction of this archive.
    pub fn marker_path(&self, root: &Path) -> PathBuf {
        self.dest_dir(root).join(format!(".{}.extracted", self.name))
    }

    /// Reject names and paths that would land outside the resource's root.
    pub fn validate(&self) -> FetchResult<()> {
        let invalid = |what: &str| {
            Err(FetchError::InvalidConfig(format!(
                "resource '{}': {}",
                self.name, what
            )))
        };

        if self.name.trim().is_empty() {
            return invalid("name is empty");
        }
        // The name also forms the extraction marker's file name.
        if !is_plain_file_name(&self.name) {
            return invalid("name must not contain path separators");
        }
        if self.url.trim().is_empty() {
            return invalid("url is empty");
        }
        if !is_plain_file_name(&self.file_name) {
            return invalid("file_name must be a plain file name");
        }
        if !is_relative_subdir(&self.subdir) {
            return invalid("subdir must be a relative path without '..'");
        }
        if let Some(sha) = &self.sha256 {
            if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
                return invalid("sha256 must be 64 hex characters");
            }
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn is_relative_subdir(subdir: &str) -> bool {
    Path::new(subdir)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
