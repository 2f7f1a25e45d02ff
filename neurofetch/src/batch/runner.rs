//! Sequential batch runner.

use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use super::report::{BatchEntry, BatchReport, ItemStatus};
use crate::archive::{ArchiveExtractor, ArchiveValidation, ZipExtractor};
use crate::catalog::{Resource, Selection};
use crate::config::FetchConfig;
use crate::error::FetchResult;
use crate::fetch::{FetchOutcome, HttpClient, ReqwestClient, ResilientFetcher};

/// Stage of the item currently being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    /// Fetching the resource.
    Downloading,
    /// Validating and extracting an archive.
    Extracting,
}

impl ItemStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Downloading => "Downloading",
            Self::Extracting => "Extracting",
        }
    }
}

/// Receives progress from a running batch.
///
/// All methods default to no-ops.
pub trait BatchObserver: Send + Sync {
    /// An item is about to be processed (`index` is 0-based).
    fn item_started(&self, _index: usize, _total: usize, _selection: &Selection) {}

    /// The current item entered `stage`.
    fn stage(&self, _stage: ItemStage) {}

    /// Bytes of the current download streamed so far.
    fn bytes(&self, _downloaded: u64, _total: Option<u64>) {}

    /// An item finished with `entry`.
    fn item_finished(&self, _entry: &BatchEntry) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// Fetches (and for archives, validates and extracts) each selected item.
///
/// A failing item is recorded and the run moves on to the next one.
pub struct BatchRunner<C = ReqwestClient, E = ZipExtractor> {
    fetcher: ResilientFetcher<C>,
    extractor: E,
    config: FetchConfig,
}

impl BatchRunner<ReqwestClient, ZipExtractor> {
    /// Runner using the real HTTP client and zip extraction.
    pub fn from_config(config: FetchConfig) -> FetchResult<Self> {
        config.validate()?;
        let fetcher = ResilientFetcher::new(config.backoff.clone())?;
        Ok(Self::new(fetcher, ZipExtractor::new(), config))
    }
}

impl<C: HttpClient, E: ArchiveExtractor> BatchRunner<C, E> {
    pub fn new(fetcher: ResilientFetcher<C>, extractor: E, config: FetchConfig) -> Self {
        Self {
            fetcher,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &ResilientFetcher<C> {
        &self.fetcher
    }

    /// Process every item in order.
    pub fn run(&self, items: &[Selection]) -> BatchReport {
        self.run_with_observer(items, &NoopObserver)
    }

    /// Process every item in order, reporting progress to `observer`.
    pub fn run_with_observer(
        &self,
        items: &[Selection],
        observer: &dyn BatchObserver,
    ) -> BatchReport {
        let mut report = BatchReport::new();
        let total = items.len();

        info!(
            items = total,
            output_dir = %self.config.output_dir().display(),
            pymm_dir = %self.config.pymm_dir().display(),
            "Starting batch"
        );

        for (index, selection) in items.iter().enumerate() {
            observer.item_started(index, total, selection);

            let status = match selection {
                Selection::Known(resource) => self.process(resource, observer),
                Selection::Unknown { name, group } => {
                    warn!(resource = %name, %group, "Resource not in catalog");
                    ItemStatus::Unknown
                }
            };

            if status.is_success() {
                info!(
                    resource = %selection.name(),
                    group = %selection.group(),
                    %status,
                    "Resource ready"
                );
            } else {
                warn!(
                    resource = %selection.name(),
                    group = %selection.group(),
                    %status,
                    "Resource not installed"
                );
            }

            let entry = BatchEntry {
                name: selection.name().to_string(),
                group: selection.group(),
                status,
            };
            observer.item_finished(&entry);
            report.push(entry);
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Batch complete"
        );
        report
    }

    fn process(&self, resource: &Resource, observer: &dyn BatchObserver) -> ItemStatus {
        let root = self.config.root_for(resource);

        if resource.archive && resource.marker_path(root).exists() {
            debug!(resource = %resource.name, "Extraction marker present, skipping");
            return ItemStatus::AlreadyPresent;
        }

        let request = match self.config.request_for(resource) {
            Ok(request) => request,
            Err(e) => {
                return ItemStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        observer.stage(ItemStage::Downloading);
        let on_bytes = |downloaded: u64, total: Option<u64>| observer.bytes(downloaded, total);
        let outcome = self.fetcher.fetch_with_progress(&request, Some(&on_bytes));

        let downloaded = match outcome {
            FetchOutcome::Success { bytes } => Some(bytes),
            FetchOutcome::AlreadyPresent => None,
            FetchOutcome::Failed { reason, .. } => return ItemStatus::Failed { reason },
        };

        if !resource.archive {
            return match downloaded {
                Some(bytes) => ItemStatus::Downloaded { bytes },
                None => ItemStatus::AlreadyPresent,
            };
        }

        observer.stage(ItemStage::Extracting);
        self.extract(resource, request.target_path())
    }

    fn extract(&self, resource: &Resource, archive_path: &Path) -> ItemStatus {
        let root = self.config.root_for(resource);
        let dest = resource.dest_dir(root);

        match self.extractor.validate_and_extract(archive_path, &dest) {
            Ok(ArchiveValidation::Valid { files }) => {
                if let Err(e) = fs::remove_file(archive_path) {
                    warn!(
                        resource = %resource.name,
                        archive = %archive_path.display(),
                        error = %e,
                        "Failed to remove extracted archive"
                    );
                }
                let marker = resource.marker_path(root);
                if let Err(e) = fs::write(&marker, resource.url.as_bytes()) {
                    warn!(
                        resource = %resource.name,
                        marker = %marker.display(),
                        error = %e,
                        "Failed to write extraction marker"
                    );
                }
                ItemStatus::Extracted { files }
            }
            Ok(ArchiveValidation::Corrupt(member)) => {
                warn!(
                    resource = %resource.name,
                    archive = %archive_path.display(),
                    %member,
                    "Archive is corrupt, keeping it for inspection"
                );
                ItemStatus::Corrupt { member }
            }
            Err(e) => ItemStatus::Failed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::testing::{corrupt, zip_bytes};
    use crate::catalog::{ResourceGroup, ResourceRoot};
    use crate::fetch::http::tests::{Reply, ScriptedClient};
    use crate::fetch::Backoff;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn runner(client: ScriptedClient, root: &Path) -> BatchRunner<ScriptedClient, ZipExtractor> {
        let config = FetchConfig::new(root)
            .with_pymm_dir(root.join("home").join(".antspymm"))
            .with_max_retries(2)
            .with_timeout_secs(5);
        BatchRunner::new(
            ResilientFetcher::with_client(client, Backoff::None),
            ZipExtractor::new(),
            config,
        )
    }

    fn data(name: &str) -> Selection {
        Selection::Known(Resource::file(
            name,
            ResourceGroup::Data,
            format!("https://example/{}", name),
        ))
    }

    fn archive(name: &str, subdir: &str) -> Selection {
        Selection::Known(
            Resource::archive(name, ResourceGroup::Models, format!("https://example/{}", name))
                .with_subdir(subdir),
        )
    }

    #[test]
    fn test_failed_item_does_not_block_others() {
        let temp = TempDir::new().unwrap();
        let client = ScriptedClient::new()
            .script("https://example/first", vec![Reply::Body(b"one".to_vec())])
            .script(
                "https://example/second",
                vec![Reply::Status(500), Reply::Status(500)],
            )
            .script("https://example/third", vec![Reply::Body(b"three".to_vec())]);
        let runner = runner(client, temp.path());

        let report = runner.run(&[data("first"), data("second"), data("third")]);

        assert_eq!(report.len(), 3);
        assert_eq!(report.entries()[0].status, ItemStatus::Downloaded { bytes: 3 });
        assert!(matches!(report.entries()[1].status, ItemStatus::Failed { .. }));
        assert_eq!(report.entries()[2].status, ItemStatus::Downloaded { bytes: 5 });
        assert_eq!(report.failed(), 1);

        let dir = temp.path().join("ANTsXNet");
        assert!(dir.join("first").exists());
        assert!(!dir.join("second").exists());
        assert!(dir.join("third").exists());
        assert_eq!(runner.fetcher().client().calls_for("https://example/second"), 2);
    }

    #[test]
    fn test_present_file_is_not_downloaded() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("ANTsXNet");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("mni152"), b"cached").unwrap();
        let runner = runner(ScriptedClient::new(), temp.path());

        let report = runner.run(&[data("mni152")]);

        assert_eq!(report.entries()[0].status, ItemStatus::AlreadyPresent);
        assert_eq!(runner.fetcher().client().total_calls(), 0);
    }

    #[test]
    fn test_unknown_item_is_reported() {
        let temp = TempDir::new().unwrap();
        let client =
            ScriptedClient::new().script("https://example/known", vec![Reply::Body(b"k".to_vec())]);
        let runner = runner(client, temp.path());
        let unknown = Selection::Unknown {
            name: "mystery".to_string(),
            group: ResourceGroup::Networks,
        };

        let report = runner.run(&[unknown, data("known")]);

        assert_eq!(report.get("mystery").unwrap().status, ItemStatus::Unknown);
        assert_eq!(report.get("mystery").unwrap().group, ResourceGroup::Networks);
        assert!(report.get("known").unwrap().status.is_success());
    }

    #[test]
    fn test_archive_is_extracted_removed_and_marked() {
        let temp = TempDir::new().unwrap();
        let body = zip_bytes(&[("model.h5", b"weights"), ("readme.txt", b"hello")]);
        let client =
            ScriptedClient::new().script("https://example/pymm_models_1", vec![Reply::Body(body)]);
        let runner = runner(client, temp.path());
        let item = archive("pymm_models_1", "antspymm");

        let report = runner.run(std::slice::from_ref(&item));

        assert_eq!(report.entries()[0].status, ItemStatus::Extracted { files: 2 });
        let dest = temp.path().join("antspymm");
        assert_eq!(fs::read(dest.join("model.h5")).unwrap(), b"weights");
        assert!(!dest.join("pymm_models_1.zip").exists());
        assert!(dest.join(".pymm_models_1.extracted").exists());

        // A re-run is satisfied by the marker without touching the network.
        let again = runner.run(&[item]);
        assert_eq!(again.entries()[0].status, ItemStatus::AlreadyPresent);
        assert_eq!(runner.fetcher().client().total_calls(), 1);
    }

    #[test]
    fn test_pymm_archive_extracts_into_pymm_dir() {
        let temp = TempDir::new().unwrap();
        let body = zip_bytes(&[("PPMI_template0.nii.gz", b"template")]);
        let client =
            ScriptedClient::new().script("https://example/pymm_models_2", vec![Reply::Body(body)]);
        let runner = runner(client, temp.path());
        let item = Selection::Known(
            Resource::archive("pymm_models_2", ResourceGroup::Models, "https://example/pymm_models_2")
                .with_root(ResourceRoot::Pymm),
        );

        let report = runner.run(&[item]);

        assert_eq!(report.entries()[0].status, ItemStatus::Extracted { files: 1 });
        let pymm = temp.path().join("home").join(".antspymm");
        assert_eq!(fs::read(pymm.join("PPMI_template0.nii.gz")).unwrap(), b"template");
        assert!(pymm.join(".pymm_models_2.extracted").exists());
        assert!(!temp.path().join("PPMI_template0.nii.gz").exists());
    }

    #[test]
    fn test_corrupt_archive_is_kept_and_batch_continues() {
        let temp = TempDir::new().unwrap();
        let body = corrupt(
            zip_bytes(&[("a.txt", b"alpha member"), ("b.txt", b"bravo member")]),
            b"bravo member",
        );
        let client = ScriptedClient::new()
            .script("https://example/siq_superres_models", vec![Reply::Body(body)])
            .script("https://example/after", vec![Reply::Body(b"ok".to_vec())]);
        let runner = runner(client, temp.path());

        let report = runner.run(&[archive("siq_superres_models", ""), data("after")]);

        assert_eq!(
            report.entries()[0].status,
            ItemStatus::Corrupt {
                member: "b.txt".to_string()
            }
        );
        assert!(temp.path().join("siq_superres_models.zip").exists());
        assert!(!temp.path().join("a.txt").exists());
        assert!(!temp.path().join(".siq_superres_models.extracted").exists());
        assert!(report.get("after").unwrap().status.is_success());
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl BatchObserver for Recorder {
        fn item_started(&self, index: usize, total: usize, selection: &Selection) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {}/{} {}", index + 1, total, selection.name()));
        }

        fn stage(&self, stage: ItemStage) {
            self.events.lock().unwrap().push(stage.name().to_string());
        }

        fn item_finished(&self, entry: &BatchEntry) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} {}", entry.name, entry.status.label()));
        }
    }

    #[test]
    fn test_observer_sees_each_stage() {
        let temp = TempDir::new().unwrap();
        let body = zip_bytes(&[("x", b"x-body")]);
        let client = ScriptedClient::new()
            .script("https://example/m", vec![Reply::Body(body)])
            .script("https://example/d", vec![Reply::Body(b"d".to_vec())]);
        let runner = runner(client, temp.path());
        let recorder = Recorder::default();

        runner.run_with_observer(&[archive("m", "models"), data("d")], &recorder);

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![
                "start 1/2 m",
                "Downloading",
                "Extracting",
                "done m extracted",
                "start 2/2 d",
                "Downloading",
                "done d downloaded",
            ]
        );
    }
}
