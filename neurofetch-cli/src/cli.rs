//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Stage pretrained neuroimaging models, templates and network weights on disk.
///
/// Downloads the PyMM model archives into the PyMM directory (~/.antspymm),
/// then the SIQ models, ANTsXNet data and pretrained networks into OUTPUT_DIR. Items already present are skipped,
/// so the command can be re-run after a partial failure.
#[derive(Debug, Parser)]
#[command(name = "neurofetch", version)]
pub struct Args {
    /// Directory to install into (created if missing)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Set to 0 to only create OUTPUT_DIR and exit
    #[arg(value_name = "DO_INSTALL", default_value_t = 1)]
    pub do_install: i64,

    /// File listing the data items to fetch, one name per line
    #[arg(value_name = "DATA_LIST")]
    pub data_list: Option<PathBuf>,

    /// File listing the pretrained networks to fetch, one name per line
    #[arg(value_name = "NETWORK_LIST")]
    pub network_list: Option<PathBuf>,

    /// Config file (default: <config dir>/neurofetch/config.ini)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Download attempts per resource
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub max_retries: Option<u32>,

    /// Seconds a connection may stay silent before the attempt fails
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Base delay in seconds between attempts
    #[arg(long, value_name = "SECS")]
    pub backoff_base: Option<u64>,

    /// Where the PyMM model archives are extracted (default: ~/.antspymm)
    #[arg(long, value_name = "DIR")]
    pub pymm_dir: Option<PathBuf>,

    /// Also write logs to neurofetch.log in this directory
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

impl Args {
    /// Whether installation was requested (`DO_INSTALL` other than 0).
    pub fn install_requested(&self) -> bool {
        self.do_install != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_positional_arguments() {
        let args = Args::try_parse_from([
            "neurofetch",
            "/data/antsxnet",
            "1",
            "data.txt",
            "networks.txt",
        ])
        .unwrap();

        assert_eq!(args.output_dir, Some(PathBuf::from("/data/antsxnet")));
        assert!(args.install_requested());
        assert_eq!(args.data_list, Some(PathBuf::from("data.txt")));
        assert_eq!(args.network_list, Some(PathBuf::from("networks.txt")));
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["neurofetch", "/out"]).unwrap();
        assert_eq!(args.do_install, 1);
        assert!(args.data_list.is_none());
        assert!(args.config.is_none());
        assert_eq!(args.verbose, 0);
        assert!(!args.no_progress);
    }

    #[test]
    fn test_output_dir_optional_at_parse_time() {
        let args = Args::try_parse_from(["neurofetch"]).unwrap();
        assert!(args.output_dir.is_none());
    }

    #[test]
    fn test_skip_install() {
        let args = Args::try_parse_from(["neurofetch", "/out", "0"]).unwrap();
        assert!(!args.install_requested());
    }

    #[test]
    fn test_options() {
        let args = Args::try_parse_from([
            "neurofetch",
            "--max-retries",
            "5",
            "--timeout",
            "60",
            "--backoff-base",
            "2",
            "--pymm-dir",
            "/models/pymm",
            "-vv",
            "--no-progress",
            "/out",
        ])
        .unwrap();

        assert_eq!(args.max_retries, Some(5));
        assert_eq!(args.timeout, Some(60));
        assert_eq!(args.backoff_base, Some(2));
        assert_eq!(args.pymm_dir, Some(PathBuf::from("/models/pymm")));
        assert_eq!(args.verbose, 2);
        assert!(args.no_progress);
    }

    #[test]
    fn test_zero_retries_rejected() {
        assert!(Args::try_parse_from(["neurofetch", "--max-retries", "0", "/out"]).is_err());
        assert!(Args::try_parse_from(["neurofetch", "--timeout", "0", "/out"]).is_err());
    }

    #[test]
    fn test_non_numeric_do_install_rejected() {
        assert!(Args::try_parse_from(["neurofetch", "/out", "yes"]).is_err());
    }
}
