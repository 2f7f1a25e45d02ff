//! The install run: resolve inputs, then fetch everything selected.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use console::Term;
use neurofetch::batch::{self, BatchReport, BatchRunner};
use neurofetch::catalog::{read_name_list, ResourceGroup, Selection};
use neurofetch::config::{ConfigFile, FetchConfig};
use tracing::{debug, info};

use crate::cli::Args;
use crate::error::CliError;
use crate::output::ProgressDisplay;

/// How a run ended without an invocation error.
#[derive(Debug)]
pub enum RunOutcome {
    /// `DO_INSTALL` was 0; only the output directory was created.
    Skipped,
    /// The batch ran; some items may still have failed.
    Completed {
        report: BatchReport,
        /// Per-item lines were already printed above the progress bars.
        progress_shown: bool,
    },
}

/// Everything resolved from arguments and files before any download starts.
#[derive(Debug)]
pub struct Plan {
    pub config: FetchConfig,
    pub items: Vec<Selection>,
}

/// Run the install described by `args`.
pub fn run(args: &Args) -> Result<RunOutcome, CliError> {
    let output_dir = ensure_output_dir(args)?;

    if !args.install_requested() {
        info!(output_dir = %output_dir.display(), "Install skipped (DO_INSTALL=0)");
        return Ok(RunOutcome::Skipped);
    }

    let plan = prepare(args, &output_dir)?;
    let runner = BatchRunner::from_config(plan.config)?;

    let show_progress = !args.no_progress && Term::stderr().is_term();
    let report = if show_progress {
        let display = ProgressDisplay::new(plan.items.len());
        let report = runner.run_with_observer(&plan.items, &display);
        display.finish();
        report
    } else {
        runner.run(&plan.items)
    };

    Ok(RunOutcome::Completed {
        report,
        progress_shown: show_progress,
    })
}

fn ensure_output_dir(args: &Args) -> Result<PathBuf, CliError> {
    let output_dir = args.output_dir.clone().ok_or(CliError::MissingOutputDir)?;
    fs::create_dir_all(&output_dir).map_err(|e| CliError::OutputDir {
        path: output_dir.clone(),
        source: e,
    })?;
    Ok(output_dir)
}

/// Load config and list files and build the selection.
pub fn prepare(args: &Args, output_dir: &Path) -> Result<Plan, CliError> {
    let config_file = load_config(args.config.as_deref())?;
    let requested = read_lists(args)?;
    let config = resolve_fetch_config(args, output_dir, &config_file)?;
    let catalog = config_file
        .catalog()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let items = batch::plan(&catalog, &config_file.exclude, &requested);
    debug!(
        items = items.len(),
        catalog = catalog.len(),
        pymm_dir = %config.pymm_dir().display(),
        max_retries = config.max_retries,
        timeout_secs = config.timeout_secs,
        backoff = config.backoff.name(),
        "Run planned"
    );

    Ok(Plan { config, items })
}

fn load_config(explicit: Option<&Path>) -> Result<ConfigFile, CliError> {
    let loaded = match explicit {
        Some(path) => ConfigFile::load_from(path),
        None => ConfigFile::load(),
    };
    loaded.map_err(|e| CliError::Config(e.to_string()))
}

fn read_lists(args: &Args) -> Result<HashMap<ResourceGroup, Vec<String>>, CliError> {
    let mut requested = HashMap::new();
    let lists = [
        (ResourceGroup::Data, &args.data_list),
        (ResourceGroup::Networks, &args.network_list),
    ];

    for (group, path) in lists {
        if let Some(path) = path {
            let names = read_name_list(path).map_err(|e| CliError::ListFile {
                path: path.clone(),
                source: e,
            })?;
            debug!(%group, path = %path.display(), names = names.len(), "Read name list");
            requested.insert(group, names);
        }
    }

    Ok(requested)
}

/// CLI flags over config file values over defaults.
fn resolve_fetch_config(
    args: &Args,
    output_dir: &Path,
    config_file: &ConfigFile,
) -> Result<FetchConfig, CliError> {
    let mut config = FetchConfig::from_settings(output_dir, &config_file.fetch);

    if let Some(dir) = args.pymm_dir.as_ref().or(config_file.paths.pymm_dir.as_ref()) {
        config = config.with_pymm_dir(dir);
    }
    if let Some(max_retries) = args.max_retries {
        config = config.with_max_retries(max_retries);
    }
    if let Some(timeout) = args.timeout {
        config = config.with_timeout_secs(timeout);
    }
    if let Some(base) = args.backoff_base {
        let backoff = config.backoff.with_base(Duration::from_secs(base));
        config = config.with_backoff(backoff);
    }

    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    /// Config that removes the model archives; runs pass empty lists for the
    /// data and network groups so nothing touches the network.
    const OFFLINE_CONFIG: &str = "[exclude]\nmodels = pymm_models_1, pymm_models_2, siq_superres_models\n";

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["neurofetch"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn write(dir: &Path, name: &str, content: &str) -> String {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    #[test]
    fn test_missing_output_dir() {
        let err = run(&args(&[])).unwrap_err();
        assert!(matches!(err, CliError::MissingOutputDir));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_skip_install_creates_dir_only() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("a").join("b");
        let out_arg = out.to_string_lossy().to_string();

        let outcome = run(&args(&[&out_arg, "0"])).unwrap();

        assert!(matches!(outcome, RunOutcome::Skipped));
        assert!(out.is_dir());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_uncreatable_output_dir() {
        let temp = TempDir::new().unwrap();
        let blocker = write(temp.path(), "file", "not a dir");
        let out_arg = format!("{}/sub", blocker);

        let err = run(&args(&[&out_arg, "0"])).unwrap_err();
        assert!(matches!(err, CliError::OutputDir { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_unreadable_list_file() {
        let temp = TempDir::new().unwrap();
        let config = write(temp.path(), "config.ini", OFFLINE_CONFIG);
        let out_arg = temp.path().join("out").to_string_lossy().to_string();
        let missing = temp.path().join("nope.txt").to_string_lossy().to_string();

        let err = run(&args(&["--config", &config, &out_arg, "1", &missing])).unwrap_err();
        assert!(matches!(err, CliError::ListFile { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_explicit_config() {
        let temp = TempDir::new().unwrap();
        let out_arg = temp.path().to_string_lossy().to_string();
        let config = temp.path().join("absent.ini").to_string_lossy().to_string();

        let err = run(&args(&["--config", &config, &out_arg])).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_invalid_config() {
        let temp = TempDir::new().unwrap();
        let config = write(temp.path(), "config.ini", "[fetch]\nmax_retries = 0\n");
        let out_arg = temp.path().to_string_lossy().to_string();

        let err = run(&args(&["--config", &config, &out_arg])).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_flags_override_config() {
        let temp = TempDir::new().unwrap();
        let config = write(
            temp.path(),
            "config.ini",
            "[fetch]\nmax_retries = 7\ntimeout_secs = 90\nbackoff = fixed\nbackoff_base_secs = 3\n",
        );
        let a = args(&["--config", &config, "--max-retries", "2", "--backoff-base", "1", "/out"]);

        let plan = prepare(&a, Path::new("/out")).unwrap();

        assert_eq!(plan.config.max_retries, 2);
        assert_eq!(plan.config.timeout_secs, 90);
        assert_eq!(plan.config.backoff.name(), "fixed");
        assert_eq!(plan.config.backoff.base(), Duration::from_secs(1));
    }

    #[test]
    fn test_pymm_dir_resolution() {
        let temp = TempDir::new().unwrap();
        let config = write(temp.path(), "config.ini", "[paths]\npymm_dir = /models/from-file\n");

        let from_file = prepare(&args(&["--config", &config, "/out"]), Path::new("/out")).unwrap();
        assert_eq!(from_file.config.pymm_dir(), Path::new("/models/from-file"));

        let from_flag = prepare(
            &args(&["--config", &config, "--pymm-dir", "/models/from-flag", "/out"]),
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(from_flag.config.pymm_dir(), Path::new("/models/from-flag"));
    }

    #[test]
    fn test_default_lists_resolve_against_bundled_table() {
        let temp = TempDir::new().unwrap();
        let config = write(temp.path(), "config.ini", OFFLINE_CONFIG);
        let data = write(temp.path(), "data.txt", "biobank\nmni152\n");
        let networks = write(temp.path(), "networks.txt", "brainExtraction\n");
        let a = args(&["--config", &config, "/out", "1", &data, &networks]);

        let plan = prepare(&a, Path::new("/out")).unwrap();
        let names: Vec<_> = plan.items.iter().map(Selection::name).collect();

        assert_eq!(names, vec!["biobank", "mni152", "brainExtraction"]);
        assert!(plan.items.iter().all(|item| matches!(item, Selection::Known(_))));
    }

    #[test]
    fn test_plan_uses_lists_and_reports_unknown() {
        let temp = TempDir::new().unwrap();
        let config = write(
            temp.path(),
            "config.ini",
            &format!(
                "{}\n[resource.mni152]\ngroup = data\nurl = https://example/mni\n",
                OFFLINE_CONFIG
            ),
        );
        let data = write(temp.path(), "data.txt", "# templates\nmni152\nnot_a_thing\n");
        let networks = write(temp.path(), "networks.txt", "\n");
        let a = args(&["--config", &config, "/out", "1", &data, &networks]);

        let plan = prepare(&a, Path::new("/out")).unwrap();
        let names: Vec<_> = plan.items.iter().map(Selection::name).collect();

        assert_eq!(names, vec!["mni152", "not_a_thing"]);
        assert!(matches!(plan.items[1], Selection::Unknown { .. }));
    }

    #[test]
    fn test_empty_selection_completes() {
        let temp = TempDir::new().unwrap();
        let config = write(temp.path(), "config.ini", OFFLINE_CONFIG);
        let empty = write(temp.path(), "empty.txt", "");
        let out_arg = temp.path().join("out").to_string_lossy().to_string();

        let outcome = run(&args(&[
            "--config",
            &config,
            "--no-progress",
            &out_arg,
            "1",
            &empty,
            &empty,
        ]))
        .unwrap();

        match outcome {
            RunOutcome::Completed {
                report,
                progress_shown,
            } => {
                assert!(report.is_empty());
                assert!(!progress_shown);
            }
            other => panic!("Expected Completed, got {:?}", other),
        }
    }
}
