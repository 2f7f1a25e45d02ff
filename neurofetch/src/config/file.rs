//! INI configuration file.
//!
//! ```ini
//! [fetch]
//! max_retries = 3
//! timeout_secs = 60
//! backoff = linear
//! backoff_base_secs = 5
//!
//! [paths]
//! pymm_dir = ~/.antspymm
//!
//! [exclude]
//! networks = allen_sr_weights, allen_cerebellum_coronal_mask_weights
//!
//! [resource.mni152]
//! group = data
//! url = https://data.example.org/templates/mni152.nii.gz
//! file_name = mni152.nii.gz
//! ```
//!
//! `[resource.<name>]` sections are layered over the built-in model archives
//! and the bundled ANTsXNet table (`data/antsxnet.ini`), replacing entries
//! of the same name.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use tracing::{debug, warn};

use crate::catalog::{Catalog, Resource, ResourceGroup, DEFAULT_NETWORK_EXCLUSIONS};
use crate::error::{FetchError, FetchResult};
use crate::fetch::{Backoff, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};

const FETCH_SECTION: &str = "fetch";
const PATHS_SECTION: &str = "paths";
const EXCLUDE_SECTION: &str = "exclude";
const RESOURCE_PREFIX: &str = "resource.";

/// ANTsXNet data and network entries shipped with the crate.
const BUNDLED_RESOURCES: &str = include_str!("../../data/antsxnet.ini");

/// Resources from the bundled ANTsXNet table.
pub fn bundled_resources() -> FetchResult<Vec<Resource>> {
    Ok(ConfigFile::parse(BUNDLED_RESOURCES)?.resources)
}

/// Directory holding the config file (`<config dir>/neurofetch`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neurofetch")
}

/// Default config file location.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// `[fetch]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSettings {
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub backoff: Backoff,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backoff: Backoff::default(),
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSettings {
    /// Where the PyMM model archives extract; `None` uses the default.
    pub pymm_dir: Option<PathBuf>,
}

/// `[exclude]` section: names skipped by a run without a list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeSettings {
    pub models: Vec<String>,
    pub data: Vec<String>,
    pub networks: Vec<String>,
}

impl Default for ExcludeSettings {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            data: Vec::new(),
            networks: DEFAULT_NETWORK_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ExcludeSettings {
    pub fn for_group(&self, group: ResourceGroup) -> &[String] {
        match group {
            ResourceGroup::Models => &self.models,
            ResourceGroup::Data => &self.data,
            ResourceGroup::Networks => &self.networks,
        }
    }

    fn for_group_mut(&mut self, group: ResourceGroup) -> &mut Vec<String> {
        match group {
            ResourceGroup::Models => &mut self.models,
            ResourceGroup::Data => &mut self.data,
            ResourceGroup::Networks => &mut self.networks,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub fetch: FetchSettings,
    pub paths: PathSettings,
    pub exclude: ExcludeSettings,
    /// Extra catalog entries from `[resource.<name>]` sections.
    pub resources: Vec<Resource>,
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> FetchResult<Self> {
        let path = config_file_path();
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load from an explicit path, which must exist.
    pub fn load_from(path: &Path) -> FetchResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| FetchError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            resources = config.resources.len(),
            "Loaded config file"
        );
        Ok(config)
    }

    /// Parse INI text.
    pub fn parse(content: &str) -> FetchResult<Self> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        let mut config = Self::default();
        let mut backoff_base = None;

        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };

            if section == FETCH_SECTION {
                for (key, value) in properties.iter() {
                    match key {
                        "max_retries" => {
                            config.fetch.max_retries = parse_positive(key, value)? as u32
                        }
                        "timeout_secs" => config.fetch.timeout_secs = parse_positive(key, value)?,
                        "backoff" => {
                            config.fetch.backoff =
                                value.parse().map_err(FetchError::InvalidConfig)?
                        }
                        "backoff_base_secs" => {
                            backoff_base = Some(parse_number(key, value)?);
                        }
                        other => warn!(key = other, "Ignoring unknown [fetch] key"),
                    }
                }
            } else if section == PATHS_SECTION {
                for (key, value) in properties.iter() {
                    match key {
                        "pymm_dir" => config.paths.pymm_dir = parse_dir(key, value)?,
                        other => warn!(key = other, "Ignoring unknown [paths] key"),
                    }
                }
            } else if section == EXCLUDE_SECTION {
                for (key, value) in properties.iter() {
                    let group: ResourceGroup = key.parse()?;
                    *config.exclude.for_group_mut(group) = split_list(value);
                }
            } else if let Some(name) = section.strip_prefix(RESOURCE_PREFIX) {
                config.resources.push(parse_resource(name, properties)?);
            } else {
                warn!(section, "Ignoring unknown config section");
            }
        }

        if let Some(secs) = backoff_base {
            config.fetch.backoff = config.fetch.backoff.with_base(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Write to `path`, creating its directory.
    pub fn save_to(&self, path: &Path) -> FetchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        self.to_ini()
            .write_to_file(path)
            .map_err(|e| FetchError::WriteFailed {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some(FETCH_SECTION))
            .set("max_retries", self.fetch.max_retries.to_string())
            .set("timeout_secs", self.fetch.timeout_secs.to_string())
            .set("backoff", self.fetch.backoff.name())
            .set(
                "backoff_base_secs",
                self.fetch.backoff.base().as_secs().to_string(),
            );

        if let Some(dir) = &self.paths.pymm_dir {
            ini.with_section(Some(PATHS_SECTION))
                .set("pymm_dir", dir.to_string_lossy());
        }

        for group in ResourceGroup::ALL {
            ini.with_section(Some(EXCLUDE_SECTION))
                .set(group.name(), self.exclude.for_group(group).join(", "));
        }

        for resource in &self.resources {
            let section = format!("{}{}", RESOURCE_PREFIX, resource.name);
            let mut setter = ini.with_section(Some(section));
            setter
                .set("group", resource.group.name())
                .set("url", resource.url.as_str())
                .set("file_name", resource.file_name.as_str())
                .set("root", resource.root.name())
                .set("subdir", resource.subdir.as_str())
                .set("archive", resource.archive.to_string());
            if let Some(sha) = &resource.sha256 {
                setter.set("sha256", sha.as_str());
            }
        }

        ini
    }

    /// Built-in model archives, then the bundled ANTsXNet table, then this
    /// file's resources, each layer replacing same-named entries.
    pub fn catalog(&self) -> FetchResult<Catalog> {
        let mut catalog = Catalog::builtin();
        for resource in bundled_resources()? {
            catalog.insert(resource);
        }
        for resource in &self.resources {
            catalog.insert(resource.clone());
        }
        Ok(catalog)
    }
}

fn parse_resource(name: &str, properties: &ini::Properties) -> FetchResult<Resource> {
    let missing = |key: &str| {
        FetchError::InvalidConfig(format!("resource '{}' is missing '{}'", name, key))
    };

    let group: ResourceGroup = properties.get("group").ok_or_else(|| missing("group"))?.parse()?;
    let url = properties.get("url").ok_or_else(|| missing("url"))?;
    let archive = match properties.get("archive") {
        Some(value) => parse_bool("archive", value)?,
        None => false,
    };

    let mut resource = if archive {
        Resource::archive(name, group, url)
    } else {
        Resource::file(name, group, url)
    };
    if let Some(file_name) = properties.get("file_name") {
        resource = resource.with_file_name(file_name.trim());
    }
    if let Some(root) = properties.get("root") {
        resource = resource.with_root(root.parse()?);
    }
    if let Some(subdir) = properties.get("subdir") {
        resource = resource.with_subdir(subdir.trim());
    }
    if let Some(sha) = properties.get("sha256") {
        resource = resource.with_sha256(sha.trim());
    }

    resource.validate()?;
    Ok(resource)
}

fn parse_number(key: &str, value: &str) -> FetchResult<u64> {
    value.trim().parse().map_err(|_| {
        FetchError::InvalidConfig(format!("'{}' must be a whole number, got '{}'", key, value))
    })
}

fn parse_positive(key: &str, value: &str) -> FetchResult<u64> {
    match parse_number(key, value)? {
        0 => Err(FetchError::InvalidConfig(format!("'{}' must be at least 1", key))),
        n if key == "max_retries" && n > u32::MAX as u64 => Err(FetchError::InvalidConfig(
            format!("'{}' is too large", key),
        )),
        n => Ok(n),
    }
}

/// A directory value; a leading `~/` is the home directory.
fn parse_dir(key: &str, value: &str) -> FetchResult<Option<PathBuf>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| Some(home.join(rest)))
            .ok_or_else(|| {
                FetchError::InvalidConfig(format!("'{}': no home directory to expand '~'", key))
            }),
        None => Ok(Some(PathBuf::from(value))),
    }
}

fn parse_bool(key: &str, value: &str) -> FetchResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(FetchError::InvalidConfig(format!(
            "'{}' must be true or false, got '{}'",
            key, value
        ))),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
