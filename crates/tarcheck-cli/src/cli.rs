//! CLI argument parsing using clap.

use clap::Parser;
use std::path::PathBuf;
use tarcheck_core::PipelineConfig;

#[derive(Parser)]
#[command(name = "tarcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Storage root that holds the unwrap folder
    #[arg(value_name = "TARGET")]
    pub target: PathBuf,

    /// Unwrap folder, relative to TARGET
    #[arg(long, env = "UNWRAP_TAR", value_name = "DIR")]
    pub unwrap_dir: PathBuf,

    /// Directory for the operational log file (stderr only when unset)
    #[arg(long, env = "LOG_PATH", value_name = "DIR")]
    pub log_path: Option<PathBuf>,

    /// Destination for extracted archives (default: <unwrap dir>/completed)
    #[arg(long, value_name = "DIR")]
    pub completed_dir: Option<PathBuf>,

    /// Destination for failed archives and error records (default: <unwrap dir>/failed)
    #[arg(long, value_name = "DIR")]
    pub failed_dir: Option<PathBuf>,

    /// External tar program used before the built-in reader
    #[arg(long, value_name = "PROGRAM", default_value = tarcheck_core::config::DEFAULT_TAR_PROGRAM)]
    pub tar_program: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

impl Cli {
    /// Directory scanned for archives.
    pub fn input_dir(&self) -> PathBuf {
        self.target.join(&self.unwrap_dir)
    }

    /// Pipeline configuration assembled from the arguments.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config =
            PipelineConfig::new(self.input_dir()).with_tar_program(self.tar_program.clone());
        if let Some(dir) = &self.completed_dir {
            config = config.with_completed_dir(dir.clone());
        }
        if let Some(dir) = &self.failed_dir {
            config = config.with_failed_dir(dir.clone());
        }
        config
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_input_dir_joins_target() {
        let cli = Cli::try_parse_from(["tarcheck", "/mnt/qnap", "--unwrap-dir", "unwrap_tar"])
            .unwrap();
        assert_eq!(cli.input_dir(), PathBuf::from("/mnt/qnap/unwrap_tar"));
        let config = cli.pipeline_config();
        assert_eq!(
            config.completed_dir(),
            PathBuf::from("/mnt/qnap/unwrap_tar/completed")
        );
        assert_eq!(config.tar_program, PathBuf::from("tar"));
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "tarcheck",
            "/mnt/qnap",
            "--unwrap-dir",
            "unwrap_tar",
            "--failed-dir",
            "/review",
            "--tar-program",
            "/usr/bin/gtar",
        ])
        .unwrap();
        let config = cli.pipeline_config();
        assert_eq!(config.failed_dir(), PathBuf::from("/review"));
        assert_eq!(config.tar_program, PathBuf::from("/usr/bin/gtar"));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result =
            Cli::try_parse_from(["tarcheck", "/t", "--unwrap-dir", "u", "--quiet", "--verbose"]);
        assert!(result.is_err());
    }
}
