//! Configuration for a batch unwrap run.

use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use crate::Result;
use crate::UnwrapError;

/// Default name of the batch audit log written into the input directory.
pub const DEFAULT_AUDIT_LOG_NAME: &str = "unwrapped_tar_checksum.log";

/// Default external extraction program.
pub const DEFAULT_TAR_PROGRAM: &str = "tar";

/// Configuration for one pipeline run.
///
/// Paths for the completed and failed locations default to subdirectories
/// of the input directory.
///
/// # Examples
///
/// ```
/// use tarcheck_core::PipelineConfig;
///
/// let config = PipelineConfig::new("/mnt/qnap/unwrap_tar")
///     .with_failed_dir("/mnt/qnap/review/failed")
///     .with_tar_program("/usr/bin/gtar");
///
/// assert!(config.completed_dir().ends_with("completed"));
/// assert!(config.is_archive_name("reel01.TAR"));
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory scanned for archives.
    pub input_dir: PathBuf,

    /// Where archives land after a successful extraction.
    ///
    /// Default: `<input_dir>/completed`.
    pub completed_dir: Option<PathBuf>,

    /// Where archives land after a failed extraction, and where error
    /// records are written.
    ///
    /// Default: `<input_dir>/failed`.
    pub failed_dir: Option<PathBuf>,

    /// File name of the append-only audit log inside the input directory.
    ///
    /// Default: `unwrapped_tar_checksum.log`.
    pub audit_log_name: String,

    /// Recognized archive extensions, compared case-sensitively.
    ///
    /// Default: `["tar", "TAR"]`.
    pub archive_extensions: Vec<String>,

    /// Extension of manifest files that are never treated as archives.
    ///
    /// Default: `md5`.
    pub manifest_extension: String,

    /// Program used for the primary extraction strategy.
    ///
    /// Default: `tar`.
    pub tar_program: PathBuf,
}

impl PipelineConfig {
    /// Creates a configuration with defaults for the given input directory.
    #[must_use]
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            completed_dir: None,
            failed_dir: None,
            audit_log_name: DEFAULT_AUDIT_LOG_NAME.to_string(),
            archive_extensions: vec!["tar".to_string(), "TAR".to_string()],
            manifest_extension: "md5".to_string(),
            tar_program: PathBuf::from(DEFAULT_TAR_PROGRAM),
        }
    }

    /// Sets the completed location.
    #[must_use]
    pub fn with_completed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.completed_dir = Some(dir.into());
        self
    }

    /// Sets the failed location.
    #[must_use]
    pub fn with_failed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.failed_dir = Some(dir.into());
        self
    }

    /// Sets the audit log file name.
    #[must_use]
    pub fn with_audit_log_name(mut self, name: impl Into<String>) -> Self {
        self.audit_log_name = name.into();
        self
    }

    /// Replaces the recognized archive extensions.
    #[must_use]
    pub fn with_archive_extensions(mut self, extensions: Vec<String>) -> Self {
        self.archive_extensions = extensions;
        self
    }

    /// Sets the manifest extension.
    #[must_use]
    pub fn with_manifest_extension(mut self, extension: impl Into<String>) -> Self {
        self.manifest_extension = extension.into();
        self
    }

    /// Sets the external extraction program.
    #[must_use]
    pub fn with_tar_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.tar_program = program.into();
        self
    }

    /// Resolved completed location.
    #[must_use]
    pub fn completed_dir(&self) -> PathBuf {
        self.completed_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join("completed"))
    }

    /// Resolved failed location.
    #[must_use]
    pub fn failed_dir(&self) -> PathBuf {
        self.failed_dir
            .clone()
            .unwrap_or_else(|| self.input_dir.join("failed"))
    }

    /// Full path of the audit log.
    #[must_use]
    pub fn audit_log_path(&self) -> PathBuf {
        self.input_dir.join(&self.audit_log_name)
    }

    /// Returns `true` if `name` carries a recognized archive extension.
    #[must_use]
    pub fn is_archive_name(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.archive_extensions.iter().any(|known| known == ext))
    }

    /// Returns `true` if `name` is the audit log or a manifest, which the
    /// listing ignores without comment.
    #[must_use]
    pub fn is_ignored_name(&self, name: &str) -> bool {
        name.contains(&self.audit_log_name)
            || name.ends_with(&format!(".{}", self.manifest_extension))
    }

    /// Checks the configuration before any archive is touched.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the input directory is missing, or
    /// if a required setting is empty.
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            return Err(UnwrapError::InputDirMissing {
                path: self.input_dir.clone(),
            });
        }
        if self.archive_extensions.is_empty() {
            return Err(UnwrapError::InvalidConfig {
                reason: "no archive extensions configured".to_string(),
            });
        }
        if self.audit_log_name.is_empty() {
            return Err(UnwrapError::InvalidConfig {
                reason: "audit log name is empty".to_string(),
            });
        }
        if self.manifest_extension.is_empty() {
            return Err(UnwrapError::InvalidConfig {
                reason: "manifest extension is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_locations() {
        let config = PipelineConfig::new("/data/unwrap_tar");
        assert_eq!(config.completed_dir(), PathBuf::from("/data/unwrap_tar/completed"));
        assert_eq!(config.failed_dir(), PathBuf::from("/data/unwrap_tar/failed"));
        assert_eq!(
            config.audit_log_path(),
            PathBuf::from("/data/unwrap_tar/unwrapped_tar_checksum.log")
        );
    }

    #[test]
    fn test_overridden_locations() {
        let config = PipelineConfig::new("/in")
            .with_completed_dir("/out/done")
            .with_failed_dir("/out/bad");
        assert_eq!(config.completed_dir(), PathBuf::from("/out/done"));
        assert_eq!(config.failed_dir(), PathBuf::from("/out/bad"));
    }

    #[test]
    fn test_archive_name_detection() {
        let config = PipelineConfig::new("/in");
        assert!(config.is_archive_name("reel01.tar"));
        assert!(config.is_archive_name("REEL01.TAR"));
        assert!(!config.is_archive_name("reel01.Tar"));
        assert!(!config.is_archive_name("readme.txt"));
        assert!(!config.is_archive_name("tar"));
    }

    #[test]
    fn test_ignored_names() {
        let config = PipelineConfig::new("/in");
        assert!(config.is_ignored_name("unwrapped_tar_checksum.log"));
        assert!(config.is_ignored_name("reel01_unwrap_manifest.md5"));
        assert!(!config.is_ignored_name("reel01.tar"));
    }

    #[test]
    fn test_validate_missing_input() {
        let config = PipelineConfig::new("/definitely/not/here");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, UnwrapError::InputDirMissing { .. }));
    }

    #[test]
    fn test_validate_empty_extensions() {
        let temp = TempDir::new().unwrap();
        let config = PipelineConfig::new(temp.path()).with_archive_extensions(Vec::new());
        let err = config.validate().unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_validate_ok() {
        let temp = TempDir::new().unwrap();
        assert!(PipelineConfig::new(temp.path()).validate().is_ok());
    }
}
