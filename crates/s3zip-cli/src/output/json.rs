//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use crate::cli::OutputTarget;
use anyhow::Result;
use console::Term;
use s3zip_core::ArchiveReport;
use serde::Serialize;

pub struct JsonFormatter {
    term: Term,
}

impl JsonFormatter {
    pub const fn new(term: Term) -> Self {
        Self { term }
    }

    fn output<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.term.write_line(&json)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CreationOutput {
    output: String,
    entries_added: usize,
    entries_skipped: usize,
    bytes_read: u64,
    bytes_written: u64,
    compression_ratio: f64,
    prefixes_visited: usize,
    listing_calls: usize,
    keys_excluded: usize,
    prefixes_excluded: usize,
    prefixes_forbidden: usize,
    prefixes_failed: usize,
    complete: bool,
    duration_ms: u128,
    warnings: Vec<String>,
}

impl CreationOutput {
    fn new(target: &OutputTarget, report: &ArchiveReport) -> Self {
        Self {
            output: match target {
                OutputTarget::Stdout => "-".to_string(),
                OutputTarget::File(path) => path.display().to_string(),
            },
            entries_added: report.entries_added,
            entries_skipped: report.entries_skipped(),
            bytes_read: report.bytes_read,
            bytes_written: report.bytes_written,
            compression_ratio: report.compression_ratio(),
            prefixes_visited: report.prefixes_visited,
            listing_calls: report.listing_calls,
            keys_excluded: report.keys_excluded,
            prefixes_excluded: report.prefixes_excluded,
            prefixes_forbidden: report.prefixes_forbidden,
            prefixes_failed: report.prefixes_failed,
            complete: report.is_complete(),
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_creation_result(&self, target: &OutputTarget, report: &ArchiveReport) -> Result<()> {
        let output = JsonOutput::success("create", CreationOutput::new(target, report));
        self.output(&output)
    }

    fn format_plan(&self, bucket: &str, prefix: &str, entries: &[String]) -> Result<()> {
        #[derive(Serialize)]
        struct PlanOutput<'a> {
            bucket: &'a str,
            prefix: &'a str,
            total_entries: usize,
            entries: &'a [String],
        }

        let data = PlanOutput {
            bucket,
            prefix,
            total_entries: entries.len(),
            entries,
        };

        self.output(&JsonOutput::success("list", data))
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::<()>::error("error", format!("{error:#}"));
        let _ = self.output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = self.output(&output);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_creation_output_structure() {
        let mut report = ArchiveReport::new();
        report.entries_added = 2;
        report.objects_unavailable = 1;
        report.add_warning("'a/2.txt' skipped");

        let data = CreationOutput::new(&OutputTarget::File(PathBuf::from("out.zip")), &report);
        let json = serde_json::to_string(&JsonOutput::success("create", data)).unwrap();

        assert!(json.contains("\"operation\":\"create\""));
        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"output\":\"out.zip\""));
        assert!(json.contains("\"entries_skipped\":1"));
        assert!(json.contains("\"complete\":false"));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_error_output_structure() {
        let json = serde_json::to_string(&JsonOutput::<()>::error("error", "boom")).unwrap();
        assert!(json.contains("\"status\":\"error\""));
        assert!(json.contains("\"error\":\"boom\""));
        assert!(!json.contains("\"data\""));
    }
}
