//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use tarcheck_core::ArchiveOutcome;
use tarcheck_core::ArchiveReport;
use tarcheck_core::BatchReport;

pub struct JsonFormatter;

#[derive(Debug, Serialize)]
struct ArchiveOutput {
    name: String,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mismatches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    elapsed_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

impl From<&ArchiveReport> for ArchiveOutput {
    fn from(report: &ArchiveReport) -> Self {
        let (mismatches, reason) = match &report.outcome {
            ArchiveOutcome::Mismatched { mismatches } => (Some(*mismatches), None),
            ArchiveOutcome::Faulted { reason } => (None, Some(reason.clone())),
            _ => (None, None),
        };
        Self {
            name: report.name.clone(),
            outcome: report.outcome.label(),
            mismatches,
            reason,
            method: report.method.map(|m| m.to_string()),
            elapsed_ms: report.elapsed.map(|d| d.as_millis()),
            location: report.location.as_ref().map(|p| p.display().to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    completed: usize,
    failed: usize,
    skipped: usize,
    needs_review: usize,
    duration_ms: u128,
    archives: Vec<ArchiveOutput>,
}

impl From<&BatchReport> for BatchOutput {
    fn from(report: &BatchReport) -> Self {
        Self {
            completed: report.completed(),
            failed: report.failed(),
            skipped: report.skipped(),
            needs_review: report.needs_review(),
            duration_ms: report.duration.as_millis(),
            archives: report.archives.iter().map(ArchiveOutput::from).collect(),
        }
    }
}

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_batch_report(&self, report: &BatchReport) -> Result<()> {
        let output = JsonOutput::success("unwrap", BatchOutput::from(report));
        Self::output(&output)
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("unwrap", format!("{error:?}"));
        let _ = Self::output(&output);
    }
}
