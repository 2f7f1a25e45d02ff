//! Catalog of fetchable resources.
//!
//! This module provides:
//! - Resource descriptors and groups (`resource`)
//! - The built-in catalog of model archives
//! - Per-group selection from a name list or the catalog minus exclusions
//! - Newline-delimited name list files
//!
//! [`Catalog::builtin`] holds only the model archives. ANTsXNet data and
//! network entries are data: a bundled table and the user's config file,
//! both read as `[resource.<name>]` sections (see `config::ConfigFile::catalog`).

mod resource;

use std::fs;
use std::path::Path;

use crate::error::{FetchError, FetchResult};

pub use resource::{Resource, ResourceGroup, ResourceRoot, ANTSXNET_SUBDIR};

/// Networks skipped by a full run unless listed explicitly.
pub const DEFAULT_NETWORK_EXCLUSIONS: [&str; 4] = [
    "allen_brain_leftright_coronal_mask_weights",
    "allen_cerebellum_coronal_mask_weights",
    "allen_cerebellum_sagittal_mask_weights",
    "allen_sr_weights",
];

/// A resource picked for a run, or a requested name the catalog lacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Known(Resource),
    Unknown { name: String, group: ResourceGroup },
}

impl Selection {
    pub fn name(&self) -> &str {
        match self {
            Self::Known(resource) => &resource.name,
            Self::Unknown { name, .. } => name,
        }
    }

    pub fn group(&self) -> ResourceGroup {
        match self {
            Self::Known(resource) => resource.group,
            Self::Unknown { group, .. } => *group,
        }
    }
}

/// Ordered set of resources, unique by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    resources: Vec<Resource>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The model archives every full run installs.
    ///
    /// The PyMM archives extract into the PyMM directory, where the PyMM
    /// toolkit looks for them; the SIQ models into the output root.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.insert(
            Resource::archive(
                "pymm_models_1",
                ResourceGroup::Models,
                "https://ndownloader.figshare.com/articles/14766102/versions/46",
            )
            .with_root(ResourceRoot::Pymm),
        );
        catalog.insert(
            Resource::archive(
                "pymm_models_2",
                ResourceGroup::Models,
                "https://figshare.com/ndownloader/articles/16912366/versions/25",
            )
            .with_root(ResourceRoot::Pymm),
        );
        catalog.insert(Resource::archive(
            "siq_superres_models",
            ResourceGroup::Models,
            "https://figshare.com/ndownloader/articles/27079987/versions/1",
        ));
        catalog
    }

    /// Add a resource, replacing any existing one with the same name in place.
    pub fn insert(&mut self, resource: Resource) {
        match self.resources.iter_mut().find(|r| r.name == resource.name) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources of one group in catalog order.
    pub fn in_group(&self, group: ResourceGroup) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.group == group)
    }

    /// Pick the resources of `group` to fetch.
    ///
    /// With `requested` names, those names in the given order; a name not in
    /// the catalog (or in another group) becomes `Selection::Unknown`.
    /// Without, every resource of the group not named in `exclude`.
    pub fn select(
        &self,
        group: ResourceGroup,
        requested: Option<&[String]>,
        exclude: &[String],
    ) -> Vec<Selection> {
        match requested {
            Some(names) => names
                .iter()
                .map(|name| match self.get(name) {
                    Some(resource) if resource.group == group => {
                        Selection::Known(resource.clone())
                    }
                    _ => Selection::Unknown {
                        name: name.clone(),
                        group,
                    },
                })
                .collect(),
            None => self
                .in_group(group)
                .filter(|r| !exclude.iter().any(|e| e == &r.name))
                .cloned()
                .map(Selection::Known)
                .collect(),
        }
    }
}

/// Parse a name list: one name per line, trimmed, blank and `#` lines skipped.
pub fn parse_name_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Read a name list file.
pub fn read_name_list(path: &Path) -> FetchResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| FetchError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_name_list(&content))
}
