//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use tarcheck_core::ArchiveOutcome;
use tarcheck_core::ArchiveReport;
use tarcheck_core::BatchReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    fn outcome_text(outcome: &ArchiveOutcome) -> String {
        match outcome {
            ArchiveOutcome::Mismatched { mismatches } => {
                format!("{} ({mismatches} differing)", outcome.label())
            }
            ArchiveOutcome::Faulted { reason } => format!("{} ({reason})", outcome.label()),
            _ => outcome.label().to_string(),
        }
    }

    fn styled_outcome(&self, outcome: &ArchiveOutcome) -> String {
        let text = Self::outcome_text(outcome);
        if !self.use_colors {
            return format!("[{text}]");
        }
        match outcome {
            ArchiveOutcome::Verified | ArchiveOutcome::NoManifest => {
                style(text).green().to_string()
            }
            ArchiveOutcome::Skipped | ArchiveOutcome::ManifestUnreadable => {
                style(text).yellow().to_string()
            }
            ArchiveOutcome::Mismatched { .. }
            | ArchiveOutcome::ExtractionFailed
            | ArchiveOutcome::Faulted { .. } => style(text).red().bold().to_string(),
        }
    }

    fn write_archive_line(&self, archive: &ArchiveReport) {
        let mut line = format!("  {} {}", self.styled_outcome(&archive.outcome), archive.name);
        if self.verbose {
            if let Some(method) = archive.method {
                line.push_str(&format!(" via {method}"));
            }
            if let Some(elapsed) = archive.elapsed {
                line.push_str(&format!(" in {elapsed:?}"));
            }
        }
        if let Some(location) = &archive.location {
            line.push_str(&format!(" -> {}", location.display()));
        }
        let _ = self.term.write_line(&line);
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_batch_report(&self, report: &BatchReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} Batch complete", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line("Batch complete");
        }

        let _ = self
            .term
            .write_line(&format!("  Completed: {}", report.completed()));
        let _ = self
            .term
            .write_line(&format!("  Failed: {}", report.failed()));
        let _ = self
            .term
            .write_line(&format!("  Skipped: {}", report.skipped()));

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Duration: {:?}", report.duration));
        }

        let shown: Vec<&ArchiveReport> = report
            .archives
            .iter()
            .filter(|a| self.verbose || a.outcome.needs_review())
            .collect();
        if !shown.is_empty() {
            let _ = self.term.write_line("");
            if self.verbose {
                let _ = self.term.write_line("Items:");
            } else if self.use_colors {
                let _ = self
                    .term
                    .write_line(&format!("{}", style("Needs review:").yellow().bold()));
            } else {
                let _ = self.term.write_line("Needs review:");
            }
            for archive in shown {
                self.write_archive_line(archive);
            }
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("ERROR: {error:?}"));
        }
    }
}
