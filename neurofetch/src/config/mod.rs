//! Configuration: the INI file and the resolved runtime settings.
//!
//! Precedence is CLI flags, then the config file, then built-in defaults.

mod file;

use std::path::{Path, PathBuf};

use crate::catalog::{Resource, ResourceRoot};
use crate::error::{FetchError, FetchResult};
use crate::fetch::{Backoff, FetchRequest, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};

pub use file::{
    bundled_resources, config_directory, config_file_path, ConfigFile, ExcludeSettings,
    FetchSettings, PathSettings,
};

/// Directory name the PyMM toolkit reads its models from, under the home directory.
pub const PYMM_DIR_NAME: &str = ".antspymm";

/// `~/.antspymm`, or `<output_dir>/antspymm` when there is no home directory.
pub fn default_pymm_dir(output_dir: &Path) -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(PYMM_DIR_NAME))
        .unwrap_or_else(|| output_dir.join("antspymm"))
}

/// Resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    /// Root for resources placed under the output directory.
    pub output_dir: PathBuf,
    /// Root for resources placed in the PyMM model directory.
    pub pymm_dir: PathBuf,
    /// Attempts per resource (at least 1).
    pub max_retries: u32,
    /// Longest a connection may stay silent, in seconds.
    pub timeout_secs: u64,
    /// Delay policy between attempts.
    pub backoff: Backoff,
}

impl FetchConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            pymm_dir: default_pymm_dir(&output_dir),
            output_dir,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backoff: Backoff::default(),
        }
    }

    /// Start from the `[fetch]` section of a config file.
    pub fn from_settings(output_dir: impl Into<PathBuf>, settings: &FetchSettings) -> Self {
        Self::new(output_dir)
            .with_max_retries(settings.max_retries)
            .with_timeout_secs(settings.timeout_secs)
            .with_backoff(settings.backoff.clone())
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_pymm_dir(mut self, pymm_dir: impl Into<PathBuf>) -> Self {
        self.pymm_dir = pymm_dir.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn pymm_dir(&self) -> &Path {
        &self.pymm_dir
    }

    /// Directory `resource.subdir` is relative to for this run.
    pub fn root_for(&self, resource: &Resource) -> &Path {
        match resource.root {
            ResourceRoot::Output => &self.output_dir,
            ResourceRoot::Pymm => &self.pymm_dir,
        }
    }

    pub fn validate(&self) -> FetchResult<()> {
        if self.max_retries == 0 {
            return Err(FetchError::InvalidConfig(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(FetchError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the fetch request for a resource under the output root.
    pub fn request_for(&self, resource: &Resource) -> FetchResult<FetchRequest> {
        let request = FetchRequest::new(
            resource.url.as_str(),
            resource.target_path(self.root_for(resource)),
            self.max_retries,
            self.timeout_secs,
        )?;
        Ok(match &resource.sha256 {
            Some(sha) => request.with_expected_sha256(sha.as_str()),
            None => request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ResourceGroup};
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::new("/out");
        assert_eq!(config.output_dir(), Path::new("/out"));
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.pymm_dir(), default_pymm_dir(Path::new("/out")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_pymm_dir_is_under_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(default_pymm_dir(Path::new("/out")), home.join(".antspymm"));
        }
    }

    #[test]
    fn test_pymm_archives_land_in_pymm_dir() {
        let catalog = Catalog::builtin();
        let config = FetchConfig::new("/out").with_pymm_dir("/home/user/.antspymm");

        let pymm = catalog.get("pymm_models_1").unwrap();
        assert_eq!(config.root_for(pymm), Path::new("/home/user/.antspymm"));
        assert_eq!(
            config.request_for(pymm).unwrap().target_path(),
            Path::new("/home/user/.antspymm/pymm_models_1.zip")
        );

        let siq = catalog.get("siq_superres_models").unwrap();
        assert_eq!(
            config.request_for(siq).unwrap().target_path(),
            Path::new("/out/siq_superres_models.zip")
        );
    }

    #[test]
    fn test_from_settings_then_override() {
        let settings = FetchSettings {
            max_retries: 7,
            timeout_secs: 20,
            backoff: Backoff::fixed(Duration::from_secs(1)),
        };
        let config = FetchConfig::from_settings("/out", &settings).with_max_retries(2);

        assert_eq!(config.max_retries, 2);
        assert_eq!(config.timeout_secs, 20);
        assert_eq!(config.backoff.name(), "fixed");
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(FetchConfig::new("/out").with_max_retries(0).validate().is_err());
        assert!(FetchConfig::new("/out").with_timeout_secs(0).validate().is_err());
    }

    #[test]
    fn test_request_for_resource() {
        let resource = Resource::file("mni152", ResourceGroup::Data, "https://example/mni")
            .with_file_name("mni152.nii.gz")
            .with_sha256("CD".repeat(32));
        let request = FetchConfig::new("/out")
            .with_timeout_secs(10)
            .request_for(&resource)
            .unwrap();

        assert_eq!(request.url(), "https://example/mni");
        assert_eq!(request.target_path(), Path::new("/out/ANTsXNet/mni152.nii.gz"));
        assert_eq!(request.timeout_secs(), 10);
        assert_eq!(request.expected_sha256(), Some("cd".repeat(32).as_str()));
    }
}
