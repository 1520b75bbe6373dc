//! Audit trail and per-archive error records.
//!
//! The audit log is a human-readable narrative of a batch run. It is only
//! ever appended to. Error records are separate files, one per archive,
//! kept in the failed location until the archive completes.

use std::fs;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use chrono::Local;

use crate::Result;

/// Timestamp format used by the audit log and error records.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Prefix written before every error record paragraph.
const ERROR_RECORD_PREFIX: &str = "unwrap_tar";

/// Separator line closing each archive's narrative.
pub const SEPARATOR: &str =
    "-------------------------------------------------------------------";

/// Destination for audit narrative lines.
///
/// The pipeline owns its sink for the duration of one batch run.
pub trait AuditSink {
    /// Appends one narrative line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line cannot be persisted.
    fn record(&mut self, message: &str) -> Result<()>;
}

/// Formats one audit line: `<timestamp>\t<message>`.
#[must_use]
pub fn audit_line(message: &str) -> String {
    format!("{}\t{message}", Local::now().format(TIMESTAMP_FORMAT))
}

/// Append-only audit log file.
///
/// Every line is flushed to disk as it is recorded; the file is created on
/// first use and never truncated.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    /// Creates a sink appending to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for AuditLog {
    fn record(&mut self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", audit_line(message))?;
        Ok(())
    }
}

/// In-memory sink, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryAudit {
    /// Recorded lines, without timestamps.
    pub lines: Vec<String>,
}

impl MemoryAudit {
    /// Returns `true` if any recorded line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

impl AuditSink for MemoryAudit {
    fn record(&mut self, message: &str) -> Result<()> {
        self.lines.push(message.to_string());
        Ok(())
    }
}

/// Per-archive error record files in the failed location.
#[derive(Debug, Clone)]
pub struct ErrorRecords {
    dir: PathBuf,
}

impl ErrorRecords {
    /// Error records live in `failed_dir`.
    #[must_use]
    pub fn new(failed_dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: failed_dir.into(),
        }
    }

    /// Path of the error record for `stem`: `<failed>/<stem>_errors.log`.
    #[must_use]
    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}_errors.log"))
    }

    /// Returns `true` if an error record exists for `stem`.
    #[must_use]
    pub fn exists(&self, stem: &str) -> bool {
        self.path_for(stem).is_file()
    }

    /// Appends a timestamped paragraph to the record for `stem`, creating
    /// the record if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be opened or written.
    pub fn append(&self, stem: &str, message: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(stem);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(
            file,
            "{ERROR_RECORD_PREFIX} {}: {message}.\n",
            Local::now().format(TIMESTAMP_FORMAT)
        )?;
        Ok(path)
    }
}

/// File name an error record takes once its archive completes.
#[must_use]
pub fn completed_log_name(stem: &str) -> String {
    format!("{stem}.log")
}
