//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use crate::cli::OutputTarget;
use anyhow::Result;
use console::Term;
use console::style;
use s3zip_core::ArchiveReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool, term: Term) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled() && term.is_term(),
            term,
        }
    }

    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_creation_result(&self, target: &OutputTarget, report: &ArchiveReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let destination = match target {
            OutputTarget::Stdout => "stdout".to_string(),
            OutputTarget::File(path) => path.display().to_string(),
        };

        if self.use_colors {
            self.line(&format!(
                "{} Archive written to {destination}",
                style("✓").green().bold()
            ));
        } else {
            self.line(&format!("Archive written to {destination}"));
        }

        self.line("");
        self.line(&format!(
            "  Objects added:    {}",
            Self::format_number(report.entries_added)
        ));
        self.line(&format!(
            "  Content size:     {}",
            Self::format_size(report.bytes_read)
        ));
        self.line(&format!(
            "  Archive size:     {}",
            Self::format_size(report.bytes_written)
        ));

        if report.entries_skipped() > 0 {
            self.line(&format!(
                "  Objects skipped:  {}",
                Self::format_number(report.entries_skipped())
            ));
        }

        if self.verbose {
            self.line(&format!(
                "  Folders visited:  {}",
                Self::format_number(report.prefixes_visited)
            ));
            self.line(&format!(
                "  Listing calls:    {}",
                Self::format_number(report.listing_calls)
            ));
            self.line(&format!(
                "  Excluded:         {} objects, {} folders",
                report.keys_excluded, report.prefixes_excluded
            ));
            self.line(&format!("  Duration:         {:?}", report.duration));
        }

        if report.has_warnings() {
            self.line("");
            if self.use_colors {
                self.line(&format!("{}", style("Warnings:").yellow().bold()));
            } else {
                self.line("Warnings:");
            }
            for warning in &report.warnings {
                self.line(&format!("  - {warning}"));
            }
        }

        Ok(())
    }

    fn format_plan(&self, bucket: &str, prefix: &str, entries: &[String]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        for entry in entries {
            self.line(entry);
        }

        if self.verbose {
            self.line("");
            self.line(&format!(
                "Total: {} objects in s3://{bucket}/{prefix}",
                Self::format_number(entries.len())
            ));
        }

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        let term = Term::stderr();
        if self.use_colors {
            let _ = term.write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            self.line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            self.line(&format!("WARNING: {message}"));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_bytes() {
        assert_eq!(HumanFormatter::format_size(0), "0 B");
        assert_eq!(HumanFormatter::format_size(512), "512 B");
        assert_eq!(HumanFormatter::format_size(1023), "1023 B");
    }

    #[test]
    fn test_format_size_units() {
        assert_eq!(HumanFormatter::format_size(1536), "1.5 KB");
        assert_eq!(HumanFormatter::format_size(1536 * 1024), "1.5 MB");
        assert_eq!(HumanFormatter::format_size(2 * 1024 * 1024 * 1024), "2.0 GB");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(HumanFormatter::format_number(0), "0");
        assert_eq!(HumanFormatter::format_number(999), "999");
        assert_eq!(HumanFormatter::format_number(1000), "1,000");
        assert_eq!(HumanFormatter::format_number(1_234_567), "1,234,567");
    }
}
