//! Batch orchestration over selected catalog resources.
//!
//! # Architecture
//!
//! ```text
//! plan(catalog, exclusions, lists) ──► [Selection]
//!                                          │
//!                                    BatchRunner::run
//!                                          │
//!              ┌───────────────────────────┼──────────────────────────┐
//!              ▼                           ▼                          ▼
//!      ResilientFetcher           ArchiveExtractor              BatchReport
//!      (download, retry)    (validate, extract, marker)      (status per item)
//! ```

mod report;
mod runner;

use std::collections::HashMap;

use crate::catalog::{Catalog, ResourceGroup, Selection};
use crate::config::ExcludeSettings;

pub use report::{BatchEntry, BatchReport, ItemStatus};
pub use runner::{BatchObserver, BatchRunner, ItemStage, NoopObserver};

/// Selections for a full run: models, then data, then networks.
///
/// Groups with an entry in `requested` use those names verbatim; the others
/// take every catalog resource of the group minus its exclusions.
pub fn plan(
    catalog: &Catalog,
    exclude: &ExcludeSettings,
    requested: &HashMap<ResourceGroup, Vec<String>>,
) -> Vec<Selection> {
    ResourceGroup::ALL
        .into_iter()
        .flat_map(|group| {
            catalog.select(
                group,
                requested.get(&group).map(Vec::as_slice),
                exclude.for_group(group),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Resource;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::builtin();
        catalog.insert(Resource::file("brainExtraction", ResourceGroup::Networks, "https://e/be"));
        catalog.insert(Resource::file("allen_sr_weights", ResourceGroup::Networks, "https://e/as"));
        catalog.insert(Resource::file("mni152", ResourceGroup::Data, "https://e/mni"));
        catalog
    }

    #[test]
    fn test_plan_order_and_exclusions() {
        let selections = plan(&catalog(), &ExcludeSettings::default(), &HashMap::new());
        let names: Vec<_> = selections.iter().map(Selection::name).collect();

        assert_eq!(
            names,
            vec![
                "pymm_models_1",
                "pymm_models_2",
                "siq_superres_models",
                "mni152",
                "brainExtraction",
            ]
        );
    }

    #[test]
    fn test_plan_with_data_list() {
        let mut requested = HashMap::new();
        requested.insert(
            ResourceGroup::Data,
            vec!["missing".to_string(), "mni152".to_string()],
        );

        let selections = plan(&catalog(), &ExcludeSettings::default(), &requested);
        let data: Vec<_> = selections
            .iter()
            .filter(|s| s.group() == ResourceGroup::Data)
            .collect();

        assert_eq!(data.len(), 2);
        assert!(matches!(data[0], Selection::Unknown { .. }));
        assert_eq!(data[1].name(), "mni152");
        // Models still come first.
        assert_eq!(selections[0].name(), "pymm_models_1");
    }
}
