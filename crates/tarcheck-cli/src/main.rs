//! tarcheck CLI - Unwraps tar packages from an ingest folder and verifies
//! their contents against the embedded MD5 manifest.

mod cli;
mod error;
mod logging;
mod output;

use anyhow::Result;
use clap::Parser;
use output::OutputFormatter;
use std::process::ExitCode;
use tarcheck_core::Pipeline;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let formatter = output::create_formatter(cli.json, cli.verbose, cli.quiet);

    match run(&cli, &*formatter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            formatter.format_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &cli::Cli, formatter: &dyn OutputFormatter) -> Result<()> {
    let _guard = logging::init(cli.log_path.as_deref(), cli.verbose, cli.quiet)?;

    let report = Pipeline::from_config(cli.pipeline_config())
        .run()
        .map_err(error::convert_batch_error)?;
    formatter.format_batch_report(&report)
}
