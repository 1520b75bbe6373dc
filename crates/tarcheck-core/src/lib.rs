//! Tar package unwrapping with MD5 manifest verification.
//!
//! `tarcheck-core` unwraps tar packages delivered to a preservation ingest
//! folder, recomputes the MD5 digest of every extracted file, compares the
//! result with the manifest shipped inside the package, and moves each
//! package to a completed or failed location with a human-readable audit
//! trail.
//!
//! # Examples
//!
//! ```no_run
//! use tarcheck_core::PipelineConfig;
//! use tarcheck_core::run_batch;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new("/mnt/qnap/unwrap_tar");
//! let report = run_batch(config)?;
//! println!("{} packages completed", report.completed());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod audit;
pub mod config;
pub mod digest;
pub mod error;
pub mod extraction;
pub mod manifest;
pub mod pipeline;
pub mod report;
pub mod routing;
pub mod test_utils;
pub mod verification;

// Re-export main API types
pub use audit::AuditLog;
pub use audit::AuditSink;
pub use audit::ErrorRecords;
pub use audit::MemoryAudit;
pub use config::PipelineConfig;
pub use digest::compute_digests;
pub use error::Result;
pub use error::UnwrapError;
pub use manifest::DigestManifest;
pub use manifest::read_manifest;
pub use manifest::write_manifest;
pub use pipeline::Pipeline;
pub use pipeline::run_batch;
pub use report::ArchiveOutcome;
pub use report::ArchiveReport;
pub use report::BatchReport;
pub use routing::OutcomeRouter;
pub use verification::ComparisonResult;
pub use verification::Verification;
pub use verification::verify;
