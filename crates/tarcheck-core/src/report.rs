//! Batch run reporting.

use std::path::PathBuf;
use std::time::Duration;

use crate::extraction::ExtractionMethod;

/// Final outcome for one item of the input listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Not an archive; left in place.
    Skipped,
    /// Extracted and every embedded digest matched.
    Verified,
    /// Extracted, but some embedded digests did not match.
    Mismatched {
        /// Number of mismatched entries.
        mismatches: usize,
    },
    /// Extracted; the archive carried no manifest.
    NoManifest,
    /// Extracted; the embedded manifest could not be parsed.
    ManifestUnreadable,
    /// Neither extraction strategy produced content.
    ExtractionFailed,
    /// Processing stopped on an unexpected error.
    Faulted {
        /// Error text.
        reason: String,
    },
}

impl ArchiveOutcome {
    /// Returns `true` if the archive ended in the completed location.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Verified | Self::Mismatched { .. } | Self::NoManifest | Self::ManifestUnreadable
        )
    }

    /// Returns `true` if the archive needs manual attention.
    #[must_use]
    pub const fn needs_review(&self) -> bool {
        !matches!(self, Self::Verified | Self::NoManifest)
    }

    /// Short label for summaries.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Verified => "verified",
            Self::Mismatched { .. } => "mismatched",
            Self::NoManifest => "no-manifest",
            Self::ManifestUnreadable => "manifest-unreadable",
            Self::ExtractionFailed => "extraction-failed",
            Self::Faulted { .. } => "faulted",
        }
    }
}

/// Report for one item of the input listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// File name in the input directory.
    pub name: String,
    /// Final outcome.
    pub outcome: ArchiveOutcome,
    /// Strategy that produced the extraction, if any did.
    pub method: Option<ExtractionMethod>,
    /// Time spent extracting.
    pub elapsed: Option<Duration>,
    /// Where the archive ended up; `None` if it was left in place.
    pub location: Option<PathBuf>,
}

impl ArchiveReport {
    /// Report for an item that was not touched.
    #[must_use]
    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ArchiveOutcome::Skipped,
            method: None,
            elapsed: None,
            location: None,
        }
    }

    /// Report for an archive that was routed without an extraction result.
    #[must_use]
    pub fn failed(
        name: impl Into<String>,
        outcome: ArchiveOutcome,
        location: Option<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            outcome,
            method: None,
            elapsed: None,
            location,
        }
    }
}

/// Report of a whole batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Per-item reports in listing order.
    pub archives: Vec<ArchiveReport>,
    /// Duration of the run.
    pub duration: Duration,
}

impl BatchReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of archives relocated to the completed location.
    #[must_use]
    pub fn completed(&self) -> usize {
        self.count(ArchiveOutcome::is_completed)
    }

    /// Number of archives relocated to the failed location.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                ArchiveOutcome::ExtractionFailed | ArchiveOutcome::Faulted { .. }
            )
        })
    }

    /// Number of non-archive items left in place.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ArchiveOutcome::Skipped))
    }

    /// Number of items that need manual attention.
    #[must_use]
    pub fn needs_review(&self) -> usize {
        self.count(ArchiveOutcome::needs_review)
    }

    fn count(&self, pred: impl Fn(&ArchiveOutcome) -> bool) -> usize {
        self.archives.iter().filter(|a| pred(&a.outcome)).count()
    }
}
