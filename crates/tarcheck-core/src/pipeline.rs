//! Batch driver: lists the input directory once and unwraps, verifies and
//! routes every archive in turn.

use std::fs;
use std::path::Path;
use std::time::Instant;

use tracing::info;
use tracing::warn;

use crate::PipelineConfig;
use crate::Result;
use crate::UnwrapError;
use crate::audit::AuditLog;
use crate::audit::AuditSink;
use crate::audit::ErrorRecords;
use crate::audit::SEPARATOR;
use crate::extraction::ExtractTool;
use crate::extraction::ExtractionEngine;
use crate::extraction::ExtractionResult;
use crate::extraction::SystemTar;
use crate::extraction::permissions::open_permissions;
use crate::extraction::target_dir_for;
use crate::report::ArchiveOutcome;
use crate::report::ArchiveReport;
use crate::report::BatchReport;
use crate::routing::Leftover;
use crate::routing::OutcomeRouter;
use crate::verification::EmbeddedCheck;
use crate::verification::verify;

/// Name used for error record files: the item's file stem.
fn record_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map_or_else(|| name.to_string(), |s| s.to_string_lossy().into_owned())
}

/// Sequential unwrap-and-verify pipeline for one batch run.
///
/// The audit sink is owned by the pipeline for the duration of the run.
/// Every archive is processed behind its own error boundary, so a failure
/// never stops the rest of the listing.
///
/// # Examples
///
/// ```no_run
/// use tarcheck_core::AuditLog;
/// use tarcheck_core::Pipeline;
/// use tarcheck_core::PipelineConfig;
/// use tarcheck_core::extraction::SystemTar;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = PipelineConfig::new("/mnt/qnap/unwrap_tar");
/// let audit = AuditLog::new(config.audit_log_path());
/// let mut pipeline = Pipeline::new(config, SystemTar::default(), audit);
/// let report = pipeline.run()?;
/// println!("{} completed, {} failed", report.completed(), report.failed());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pipeline<T, A> {
    config: PipelineConfig,
    engine: ExtractionEngine<T>,
    router: OutcomeRouter,
    records: ErrorRecords,
    audit: A,
}

impl Pipeline<SystemTar, AuditLog> {
    /// Pipeline using the configured tar program and the audit log inside
    /// the input directory.
    #[must_use]
    pub fn from_config(config: PipelineConfig) -> Self {
        let tool = SystemTar::new(config.tar_program.clone());
        let audit = AuditLog::new(config.audit_log_path());
        Self::new(config, tool, audit)
    }
}

impl<T: ExtractTool, A: AuditSink> Pipeline<T, A> {
    /// Creates a pipeline with an explicit extraction tool and audit sink.
    pub fn new(config: PipelineConfig, tool: T, audit: A) -> Self {
        let router = OutcomeRouter::new(config.completed_dir(), config.failed_dir());
        let records = ErrorRecords::new(config.failed_dir());
        Self {
            config,
            engine: ExtractionEngine::new(tool),
            router,
            records,
            audit,
        }
    }

    /// The audit sink.
    pub fn audit(&self) -> &A {
        &self.audit
    }

    /// Consumes the pipeline, returning the audit sink.
    pub fn into_audit(self) -> A {
        self.audit
    }

    /// Processes every item of the input directory once.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the input directory is missing or
    /// holds no files, or an I/O error if the output locations cannot be
    /// created. Per-archive failures are reported in the [`BatchReport`].
    pub fn run(&mut self) -> Result<BatchReport> {
        let started = Instant::now();
        self.config.validate()?;

        let names = self.list_files()?;
        if names.is_empty() {
            return Err(UnwrapError::InputDirEmpty {
                path: self.config.input_dir.clone(),
            });
        }
        self.router.ensure_dirs()?;

        info!(
            "========= UNWRAP TAR START {} =========",
            self.config.input_dir.display()
        );

        let mut report = BatchReport::new();
        for name in names {
            if self.config.is_ignored_name(&name) {
                continue;
            }
            let item = if self.config.is_archive_name(&name) {
                self.process_isolated(&name)
            } else {
                self.skip_non_archive(&name)
            };
            report.archives.push(item);
        }

        info!("========= UNWRAP TAR END =========");
        report.duration = started.elapsed();
        Ok(report)
    }

    /// Regular files directly inside the input directory, sorted by name.
    fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.config.input_dir)? {
            let entry = entry?;
            if entry.path().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn process_isolated(&mut self, name: &str) -> ArchiveReport {
        let path = self.config.input_dir.join(name);
        match self.process_archive(&path, name) {
            Ok(report) => report,
            Err(err) => self.contain_fault(&path, name, &err),
        }
    }

    fn process_archive(&mut self, path: &Path, name: &str) -> Result<ArchiveReport> {
        let stem = record_stem(name);
        let tool = self.engine.tool_name();

        self.note(&format!("New file found: {}", path.display()));
        info!("File found to process: {name}");
        self.note(&format!("Attempting extraction using {tool} programme..."));

        let primary = self.engine.extract_primary(path)?;
        let extraction = if primary.success {
            primary
        } else {
            warn!("Unwrapping failed with {tool}, retrying with in-process tar reader");
            self.note(&format!(
                "{tool} extraction failed... trying with in-process tar reader"
            ));
            let fallback = self.engine.extract_fallback(path)?;
            if !fallback.success {
                return self.fail_extraction(path, name, &stem, &tool);
            }
            fallback
        };

        let Some(target) = extraction.target.clone() else {
            return self.fail_extraction(path, name, &stem, &tool);
        };
        self.finish_extracted(path, name, &stem, &target, &extraction)
    }

    fn finish_extracted(
        &mut self,
        path: &Path,
        name: &str,
        stem: &str,
        target: &Path,
        extraction: &ExtractionResult,
    ) -> Result<ArchiveReport> {
        open_permissions(target)?;
        let minutes = extraction.elapsed_minutes();
        self.note(&format!("Extracted TAR file successful: {}", target.display()));
        self.note(&format!("Extraction took {minutes} minutes to complete"));
        info!("It took {minutes} minutes to perform this extraction.");

        let verification = verify(target, name)?;
        let local_manifest = if let Some(local) = &verification.local_manifest_path {
            self.note(&format!(
                "Generating local MD5 manifest for extracted data: {}",
                local.display()
            ));
            local.display().to_string()
        } else {
            self.note(&format!(
                "Local MD5 manifest could not be written for {}",
                target.display()
            ));
            target.display().to_string()
        };

        let outcome = match &verification.embedded {
            EmbeddedCheck::Absent => {
                self.note("No MD5 manifest extracted from TAR file. No comparison possible.");
                ArchiveOutcome::NoManifest
            }
            EmbeddedCheck::Unreadable { path: manifest, error } => {
                warn!("embedded manifest {} unreadable: {error}", manifest.display());
                self.note(&format!(
                    "MD5 manifest extracted from TAR file could not be read: {error}"
                ));
                self.record_error(
                    stem,
                    &format!(
                        "MD5 manifest in TAR file could not be read ({error}), no comparison made against {local_manifest}"
                    ),
                );
                ArchiveOutcome::ManifestUnreadable
            }
            EmbeddedCheck::Compared { comparison, .. } => {
                self.note("MD5 manifest extracted from TAR file for comparison");
                if comparison.all_matched() {
                    info!("MD5 manifest matches local MD5 manifest. Bit perfect restoration of {name}.");
                    self.note(
                        "Local manifest matches extracted MD5 manifest. Bit perfect restoration, file identical to preservation original.",
                    );
                    ArchiveOutcome::Verified
                } else {
                    let mismatches = comparison.mismatch_count();
                    info!("MD5 manifest does not match all items. See manifest for details: {local_manifest}");
                    self.note(&format!(
                        "MD5 manifests do not fully match: {mismatches} of {} entries differ",
                        comparison.verdicts.len()
                    ));
                    let keys: Vec<&str> = comparison.mismatches().map(|v| v.key.as_str()).collect();
                    self.record_error(
                        stem,
                        &format!(
                            "MD5 manifests do not match from TAR file, and unwrapped TAR folder contents: {local_manifest} (differing: {})",
                            keys.join(", ")
                        ),
                    );
                    ArchiveOutcome::Mismatched { mismatches }
                }
            }
        };

        let placement = self.router.route_completed(path, stem, &self.records)?;
        info!("{name} file moved to completed path: {}", self.router.completed_dir().display());
        self.note("Moved TAR to completed/ folder for manual deletion.");
        if let Some(log) = &placement.log {
            self.note(&format!("Error log moved alongside TAR: {}", log.display()));
        }
        self.note(SEPARATOR);

        Ok(ArchiveReport {
            name: name.to_string(),
            outcome,
            method: Some(extraction.method),
            elapsed: Some(extraction.elapsed),
            location: Some(placement.archive),
        })
    }

    fn fail_extraction(
        &mut self,
        path: &Path,
        name: &str,
        stem: &str,
        tool: &str,
    ) -> Result<ArchiveReport> {
        warn!("{tool} and in-process tar reader failed on {name}; TAR needs manual assistance");
        let target = target_dir_for(path);
        let placement = self.router.route_failure(path, &target)?;
        self.record_error(
            stem,
            &format!(
                "{tool} and in-process tar reader cannot extract data. Please try alternative software. File location: {}",
                path.display()
            ),
        );
        self.note_leftover(&placement.leftover, &target);
        self.note(&format!(
            "Skipping further actions for {name}. Manual assistance needed"
        ));
        self.note(SEPARATOR);

        Ok(ArchiveReport::failed(
            name,
            ArchiveOutcome::ExtractionFailed,
            Some(placement.archive),
        ))
    }

    fn note_leftover(&mut self, leftover: &Leftover, target: &Path) {
        let folder = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match leftover {
            Leftover::Absent => self.note("Moved TAR to failed/ folder."),
            Leftover::Removed => self.note(&format!(
                "Moved TAR to failed/ folder. Deleted empty extraction folder: {folder}"
            )),
            Leftover::Relocated(_) => self.note(&format!(
                "Moved TAR to failed/ folder. Folder {folder} has contents. Moving to failed/ folder for review"
            )),
        }
    }

    /// Turns an unexpected error into a failure outcome. The archive and its
    /// extraction directory are routed to the failed location if the archive
    /// is still in the input directory.
    fn contain_fault(&mut self, path: &Path, name: &str, err: &UnwrapError) -> ArchiveReport {
        warn!("processing of {name} stopped: {err}");
        let stem = record_stem(name);
        self.record_error(
            &stem,
            &format!("Processing of {name} stopped unexpectedly: {err}"),
        );

        let mut location = None;
        if path.exists() {
            let target = target_dir_for(path);
            match self.router.route_failure(path, &target) {
                Ok(placement) => {
                    self.note_leftover(&placement.leftover, &target);
                    location = Some(placement.archive);
                }
                Err(route_err) => {
                    warn!("could not move {name} to failed location: {route_err}");
                    self.note(&format!(
                        "Could not move {name} to failed/ folder: {route_err}"
                    ));
                }
            }
        }
        self.note(&format!(
            "Processing of {name} stopped: {err}. Manual assistance needed"
        ));
        self.note(SEPARATOR);

        ArchiveReport::failed(
            name,
            ArchiveOutcome::Faulted {
                reason: err.to_string(),
            },
            location,
        )
    }

    fn skip_non_archive(&mut self, name: &str) -> ArchiveReport {
        let folder = self
            .config
            .input_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.note(&format!("SKIPPING - File is not a TAR file: {name}."));
        self.note(&format!("Please remove non TAR files from '{folder}' folder."));
        info!("Skipping file, not a TAR: {name}");
        self.record_error(
            &record_stem(name),
            &format!(
                "File/folder placed in {folder}/ folder is not a TAR file. Please remove this item from this path"
            ),
        );
        ArchiveReport::skipped(name)
    }

    /// Appends to the audit trail; a sink failure is logged, not fatal.
    fn note(&mut self, message: &str) {
        if let Err(e) = self.audit.record(message) {
            warn!("audit log write failed ({e}): {message}");
        }
    }

    fn record_error(&self, stem: &str, message: &str) {
        if let Err(e) = self.records.append(stem, message) {
            warn!("error record for {stem} could not be written ({e}): {message}");
        }
    }
}

/// Convenience wrapper: runs the pipeline with the system tar program and
/// the default audit log.
///
/// # Errors
///
/// See [`Pipeline::run`].
pub fn run_batch(config: PipelineConfig) -> Result<BatchReport> {
    Pipeline::from_config(config).run()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::audit::MemoryAudit;
    use crate::test_utils::FailingTool;
    use crate::test_utils::TarTestBuilder;
    use crate::test_utils::UnpackingTool;
    use tempfile::TempDir;

    fn pipeline<T: ExtractTool>(dir: &Path, tool: T) -> Pipeline<T, MemoryAudit> {
        Pipeline::new(PipelineConfig::new(dir), tool, MemoryAudit::default())
    }

    #[test]
    fn test_record_stem() {
        assert_eq!(record_stem("reel01.tar"), "reel01");
        assert_eq!(record_stem("readme.txt"), "readme");
        assert_eq!(record_stem("noext"), "noext");
    }

    #[test]
    fn test_missing_input_dir_is_fatal() {
        let temp = TempDir::new().unwrap();
        let mut p = pipeline(&temp.path().join("absent"), UnpackingTool);
        let err = p.run().unwrap_err();
        assert!(err.is_configuration_error());
        assert!(p.audit().lines.is_empty());
    }

    #[test]
    fn test_empty_input_dir_is_fatal() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("subdir_only")).unwrap();
        let mut p = pipeline(temp.path(), UnpackingTool);
        let err = p.run().unwrap_err();
        assert!(matches!(err, UnwrapError::InputDirEmpty { .. }));
        assert!(!temp.path().join("completed").exists());
    }

    #[test]
    fn test_manifest_files_are_ignored() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("old_unwrap_manifest.md5"), "{}").unwrap();
        let mut p = pipeline(temp.path(), UnpackingTool);
        let report = p.run().unwrap();
        assert!(report.archives.is_empty());
        assert!(temp.path().join("old_unwrap_manifest.md5").exists());
    }

    #[test]
    fn test_no_manifest_archive_completes() {
        let temp = TempDir::new().unwrap();
        let data = TarTestBuilder::new().add_file("a.dpx", b"a").build();
        fs::write(temp.path().join("reel01.tar"), data).unwrap();

        let mut p = pipeline(temp.path(), UnpackingTool);
        let report = p.run().unwrap();
        assert_eq!(report.archives.len(), 1);
        assert_eq!(report.archives[0].outcome, ArchiveOutcome::NoManifest);
        assert!(temp.path().join("completed").join("reel01.tar").exists());
        assert!(temp.path().join("reel01_unwrap_manifest.md5").exists());
        assert!(p.audit().contains("No comparison possible"));
    }

    #[test]
    fn test_fallback_fault_is_contained() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a_garbage.tar"), [0xAB; 1024]).unwrap();
        let data = TarTestBuilder::new().add_file("a.dpx", b"a").build();
        fs::write(temp.path().join("b_good.tar"), data).unwrap();

        let mut p = pipeline(temp.path(), FailingTool);
        let report = p.run().unwrap();
        assert_eq!(report.archives.len(), 2);
        assert!(matches!(
            report.archives[0].outcome,
            ArchiveOutcome::Faulted { .. }
        ));
        assert_eq!(report.archives[1].outcome, ArchiveOutcome::NoManifest);
        assert!(temp.path().join("failed").join("a_garbage.tar").exists());
        assert!(!temp.path().join("a_garbage").exists());
        assert!(temp.path().join("failed").join("a_garbage_errors.log").exists());
        assert!(temp.path().join("completed").join("b_good.tar").exists());
    }
}
