//! Error conversion utilities for CLI.
//!
//! Converts tarcheck-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use tarcheck_core::UnwrapError;

/// Converts a batch-level `UnwrapError` to an anyhow error with a hint.
pub fn convert_batch_error(err: UnwrapError) -> anyhow::Error {
    match err {
        UnwrapError::InputDirMissing { path } => {
            anyhow!(
                "Unwrap folder not found: '{}'\n\
                 HINT: Check TARGET and --unwrap-dir (or the UNWRAP_TAR variable).",
                path.display()
            )
        }
        UnwrapError::InputDirEmpty { path } => {
            anyhow!(
                "Unwrap folder '{}' holds no files\n\
                 HINT: Nothing to process. Place TAR packages in the folder and run again.",
                path.display()
            )
        }
        UnwrapError::InvalidConfig { reason } => {
            anyhow!("Invalid configuration: {reason}")
        }
        UnwrapError::Io(io_err) => {
            anyhow!(
                "I/O error while preparing the batch: {io_err}\n\
                 HINT: Check that the completed and failed folders are writable."
            )
        }
        _ => anyhow::Error::from(err).context("Batch run failed"),
    }
}
