//! neurofetch CLI - Command-line interface
//!
//! Usage: `neurofetch [OPTIONS] <OUTPUT_DIR> [DO_INSTALL] [DATA_LIST] [NETWORK_LIST]`
//!
//! Exit codes: 0 when everything is installed (or `DO_INSTALL` is 0),
//! 1 for invocation errors, 2 when some items could not be installed.

mod cli;
mod error;
mod output;
mod run;

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use console::style;
use neurofetch::logging;

use cli::Args;
use error::{CliError, EXIT_USAGE};
use run::RunOutcome;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if !e.use_stderr() {
                // --help / --version
                e.exit();
            }
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if args.output_dir.is_none() {
        let _ = Args::command().print_help();
        return ExitCode::from(EXIT_USAGE);
    }

    let _logging = match logging::init_logging(args.verbose, args.log_dir.as_deref()) {
        Ok(guard) => guard,
        Err(e) => return report_error(&CliError::from(e)),
    };

    match run::run(&args).and_then(finish) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn finish(outcome: RunOutcome) -> Result<(), CliError> {
    match outcome {
        RunOutcome::Skipped => Ok(()),
        RunOutcome::Completed {
            report,
            progress_shown,
        } => {
            output::print_report(&report, !progress_shown);
            if report.has_failures() {
                return Err(CliError::Incomplete {
                    failed: report.failed(),
                    total: report.len(),
                });
            }
            Ok(())
        }
    }
}

fn report_error(error: &CliError) -> ExitCode {
    eprintln!("{} {}", style("error:").red().bold(), error);
    ExitCode::from(error.exit_code())
}
