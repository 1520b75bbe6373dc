//! Error types for tar unwrapping and manifest verification.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `UnwrapError`.
pub type Result<T> = std::result::Result<T, UnwrapError>;

/// Errors that can occur while unwrapping and verifying a batch of archives.
///
/// Only the configuration variants abort a whole batch. Every other variant
/// is scoped to a single archive and is contained by the pipeline driver.
#[derive(Error, Debug)]
pub enum UnwrapError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The input directory does not exist or is not a directory.
    #[error("input directory not found: {path}")]
    InputDirMissing {
        /// The configured input directory.
        path: PathBuf,
    },

    /// The input directory contains no regular files.
    #[error("input directory is empty: {path}")]
    InputDirEmpty {
        /// The configured input directory.
        path: PathBuf,
    },

    /// Configuration is invalid for some other reason.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// A digest manifest file could not be parsed.
    #[error("malformed manifest {path}: {reason}")]
    ManifestFormat {
        /// Path of the manifest file.
        path: PathBuf,
        /// Description of the format problem.
        reason: String,
    },

    /// The in-process tar reader failed part way through unpacking.
    #[error("in-process extraction of {archive} failed: {source}")]
    FallbackExtraction {
        /// Archive being unpacked.
        archive: PathBuf,
        /// Underlying error from the tar reader.
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed while computing digests.
    #[error("cannot walk {path}: {reason}")]
    Walk {
        /// Directory being walked.
        path: PathBuf,
        /// Description of the walk failure.
        reason: String,
    },

    /// Relocation target already exists.
    #[error("destination already exists: {path}")]
    DestinationExists {
        /// The occupied destination.
        path: PathBuf,
    },
}

impl UnwrapError {
    /// Returns `true` if this error must abort the whole batch.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use tarcheck_core::UnwrapError;
    ///
    /// let err = UnwrapError::InputDirMissing {
    ///     path: PathBuf::from("/storage/unwrap_tar"),
    /// };
    /// assert!(err.is_configuration_error());
    ///
    /// let err = UnwrapError::DestinationExists {
    ///     path: PathBuf::from("completed/reel01.tar"),
    /// };
    /// assert!(!err.is_configuration_error());
    /// ```
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InputDirMissing { .. } | Self::InputDirEmpty { .. } | Self::InvalidConfig { .. }
        )
    }

    /// Returns `true` if this error concerns a single archive only.
    #[must_use]
    pub const fn is_archive_scoped(&self) -> bool {
        !self.is_configuration_error()
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use tarcheck_core::UnwrapError;
    ///
    /// let err = UnwrapError::InvalidConfig {
    ///     reason: "no archive extensions".to_string(),
    /// };
    /// assert_eq!(err.context(), Some("no archive extensions"));
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidConfig { reason }
            | Self::ManifestFormat { reason, .. }
            | Self::Walk { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
