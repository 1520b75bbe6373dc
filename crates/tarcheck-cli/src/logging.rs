//! Operational logging setup.

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// File name of the operational log inside the log directory.
pub const LOG_FILE_NAME: &str = "unwrap_tar_checksum.log";

fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "tarcheck=debug"
    } else if quiet {
        "tarcheck=warn"
    } else {
        "tarcheck=info"
    }
}

/// Installs the global subscriber: stderr always, plus an appending log file
/// when `log_dir` is given. `RUST_LOG` overrides the level.
///
/// The returned guard must be held until exit so buffered lines reach the
/// file.
pub fn init(log_dir: Option<&Path>, verbose: bool, quiet: bool) -> Result<Option<WorkerGuard>> {
    let directive = default_directive(verbose, quiet);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(LOG_FILE_NAME)
                .build(dir)
                .with_context(|| format!("cannot open log file in {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("cannot install log subscriber")?;

    Ok(guard)
}
