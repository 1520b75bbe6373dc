//! Dual-strategy extraction engine.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use tracing::info;
use tracing::warn;

use crate::Result;
use crate::UnwrapError;
use crate::extraction::permissions::create_open_dir;
use crate::extraction::permissions::is_empty_dir;
use crate::extraction::tool::ExtractTool;

/// Which strategy produced an extraction result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// External tool.
    Primary,
    /// In-process tar reader.
    Fallback,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Outcome of one extraction attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Populated extraction directory; `None` when the attempt failed.
    pub target: Option<PathBuf>,
    /// Strategy used for this attempt.
    pub method: ExtractionMethod,
    /// Wall-clock time spent in the attempt.
    pub elapsed: Duration,
    /// Whether the attempt succeeded.
    pub success: bool,
}

impl ExtractionResult {
    fn succeeded(target: PathBuf, method: ExtractionMethod, elapsed: Duration) -> Self {
        Self {
            target: Some(target),
            method,
            elapsed,
            success: true,
        }
    }

    fn failed(method: ExtractionMethod, elapsed: Duration) -> Self {
        Self {
            target: None,
            method,
            elapsed,
            success: false,
        }
    }

    /// Elapsed time in whole minutes, rounded down.
    #[must_use]
    pub const fn elapsed_minutes(&self) -> u64 {
        self.elapsed.as_secs() / 60
    }
}

/// Returns the extraction directory for `archive`: a sibling of the archive
/// named after it without its extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tarcheck_core::extraction::target_dir_for;
///
/// assert_eq!(
///     target_dir_for(Path::new("/in/reel01.tar")),
///     Path::new("/in/reel01")
/// );
/// ```
#[must_use]
pub fn target_dir_for(archive: &Path) -> PathBuf {
    archive.with_extension("")
}

/// Unpacks `archive` into `target` with the in-process tar reader.
///
/// # Errors
///
/// Returns [`UnwrapError::FallbackExtraction`] if the archive is unreadable
/// or truncated. Entries unpacked before the fault remain in `target`.
pub fn unpack_in_process(archive: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut reader = tar::Archive::new(BufReader::new(file));
    reader
        .unpack(target)
        .map_err(|source| UnwrapError::FallbackExtraction {
            archive: archive.to_path_buf(),
            source,
        })
}

/// Extracts archives with an external tool first and the in-process tar
/// reader second.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use tarcheck_core::extraction::ExtractionEngine;
/// use tarcheck_core::extraction::SystemTar;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = ExtractionEngine::new(SystemTar::default());
/// let result = engine.extract(Path::new("/in/reel01.tar"))?;
/// if let Some(dir) = result.target {
///     println!("extracted to {} via {}", dir.display(), result.method);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExtractionEngine<T> {
    tool: T,
}

impl<T: ExtractTool> ExtractionEngine<T> {
    /// Creates an engine around the given primary tool.
    #[must_use]
    pub fn new(tool: T) -> Self {
        Self { tool }
    }

    /// Name of the primary tool, for the audit trail.
    #[must_use]
    pub fn tool_name(&self) -> String {
        self.tool.name()
    }

    /// Runs the external tool into a freshly created target directory.
    ///
    /// A non-zero exit status, or a tool that cannot be started, yields a
    /// failed result rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error only if the target directory cannot be created.
    pub fn extract_primary(&self, archive: &Path) -> Result<ExtractionResult> {
        let target = target_dir_for(archive);
        create_open_dir(&target)?;

        let started = Instant::now();
        let status = self.tool.run(archive, &target);
        let elapsed = started.elapsed();

        match status {
            Ok(status) if status.success() => {
                info!(
                    "{} extracted {} to {}",
                    self.tool.name(),
                    archive.display(),
                    target.display()
                );
                Ok(ExtractionResult::succeeded(
                    target,
                    ExtractionMethod::Primary,
                    elapsed,
                ))
            }
            Ok(status) => {
                warn!(
                    "{} failed on {}: {status:?}",
                    self.tool.name(),
                    archive.display()
                );
                Ok(ExtractionResult::failed(ExtractionMethod::Primary, elapsed))
            }
            Err(e) => {
                warn!("{} could not be started: {e}", self.tool.name());
                Ok(ExtractionResult::failed(ExtractionMethod::Primary, elapsed))
            }
        }
    }

    /// Unpacks with the in-process tar reader. Succeeds when the target
    /// directory is non-empty afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`UnwrapError::FallbackExtraction`] if the reader faults, and
    /// an I/O error if the target directory cannot be created or listed.
    pub fn extract_fallback(&self, archive: &Path) -> Result<ExtractionResult> {
        let target = target_dir_for(archive);
        create_open_dir(&target)?;

        let started = Instant::now();
        unpack_in_process(archive, &target)?;
        let elapsed = started.elapsed();

        if is_empty_dir(&target)? {
            warn!("in-process tar reader produced no content for {}", archive.display());
            Ok(ExtractionResult::failed(ExtractionMethod::Fallback, elapsed))
        } else {
            info!(
                "in-process tar reader extracted {} to {}",
                archive.display(),
                target.display()
            );
            Ok(ExtractionResult::succeeded(
                target,
                ExtractionMethod::Fallback,
                elapsed,
            ))
        }
    }

    /// Tries the primary strategy, then the fallback if the primary gave no
    /// result.
    ///
    /// # Errors
    ///
    /// See [`Self::extract_primary`] and [`Self::extract_fallback`].
    pub fn extract(&self, archive: &Path) -> Result<ExtractionResult> {
        let primary = self.extract_primary(archive)?;
        if primary.success {
            return Ok(primary);
        }
        self.extract_fallback(archive)
    }
}
