//! External extraction tool capability.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

/// Exit status of an external extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    /// The tool exited with status zero.
    Success,
    /// The tool exited with a non-zero status, or was killed by a signal
    /// (`code` is `None`).
    Failed {
        /// Exit code, if the process exited normally.
        code: Option<i32>,
    },
}

impl ToolStatus {
    /// Returns `true` for a zero exit status.
    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Runs an extraction of one archive into a target directory.
///
/// Implementations report only the exit status. Whether the target
/// directory received any content is judged by the caller.
pub trait ExtractTool {
    /// Extracts `archive` into the existing directory `target`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool could not be started at all.
    fn run(&self, archive: &Path, target: &Path) -> io::Result<ToolStatus>;

    /// Short human-readable name used in the audit trail.
    fn name(&self) -> String;
}

/// Extracts with the platform `tar` program (`tar -xf <archive> -C <target>`).
#[derive(Debug, Clone)]
pub struct SystemTar {
    program: PathBuf,
}

impl SystemTar {
    /// Uses the given program instead of `tar` from `PATH`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The program that will be invoked.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for SystemTar {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TAR_PROGRAM)
    }
}

impl ExtractTool for SystemTar {
    fn run(&self, archive: &Path, target: &Path) -> io::Result<ToolStatus> {
        let output = Command::new(&self.program)
            .arg("-xf")
            .arg(archive)
            .arg("-C")
            .arg(target)
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{} stderr: {}", self.program.display(), stderr.trim());
        }

        if output.status.success() {
            Ok(ToolStatus::Success)
        } else {
            Ok(ToolStatus::Failed {
                code: output.status.code(),
            })
        }
    }

    fn name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(
                || self.program.display().to_string(),
                |name| name.to_string_lossy().into_owned(),
            )
            .to_uppercase()
    }
}
