//! Progress spinner for archive production.

use console::Term;
use indicatif::ProgressBar;
use indicatif::ProgressState;
use indicatif::ProgressStyle;
use s3zip_core::ProgressCallback;
use s3zip_core::SkipReason;
use std::fmt::Write;
use std::time::Duration;

/// CLI spinner implementing `ProgressCallback`.
///
/// The number of objects is unknown until the walk ends, so this shows a
/// spinner with the entry count, bytes streamed and throughput instead of a
/// bar. Draws to stderr and cleans up on drop.
pub struct CliProgress {
    bar: ProgressBar,
    message: String,
    entries: usize,
    skipped: usize,
    bytes_read: u64,
}

impl CliProgress {
    /// Creates a new spinner.
    ///
    /// # Arguments
    ///
    /// * `message` - Prefix shown before the counters (e.g., "Archiving")
    #[must_use]
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();

        // Template: "⠋ Archiving 42 objects (15.2 MB, 5.1 MB/s, 12s) a/b/c.txt"
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix} {pos} objects ({bytes}, {bytes_per_sec}, {took}) {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .with_key("bytes", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_bytes(state.len().unwrap_or(0))).unwrap_or(());
                })
                .with_key("bytes_per_sec", |state: &ProgressState, w: &mut dyn Write| {
                    let secs = state.elapsed().as_secs_f64();
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let per_sec = if secs > 0.0 {
                        (state.len().unwrap_or(0) as f64 / secs) as u64
                    } else {
                        0
                    };
                    write!(w, "{}/s", humanize_bytes(per_sec)).unwrap_or(());
                })
                .with_key("took", |state: &ProgressState, w: &mut dyn Write| {
                    write!(w, "{}", humanize_duration(state.elapsed())).unwrap_or(());
                }),
        );

        bar.set_prefix(message.to_string());
        bar.set_length(0);
        bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            bar,
            message: message.to_string(),
            entries: 0,
            skipped: 0,
            bytes_read: 0,
        }
    }

    /// Checks if we should show progress (TTY detection on stderr).
    #[must_use]
    pub fn should_show() -> bool {
        Term::stderr().is_term()
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for CliProgress {
    fn on_entry_start(&mut self, name: &str, _current: usize) {
        self.bar.set_message(name.to_string());
    }

    fn on_bytes_written(&mut self, bytes: u64) {
        // Byte count rides on the bar length; position counts objects.
        self.bytes_read += bytes;
        self.bar.set_length(self.bytes_read);
    }

    fn on_entry_complete(&mut self, _name: &str) {
        self.entries += 1;
        self.bar.set_position(self.entries as u64);
    }

    fn on_entry_skipped(&mut self, _key: &str, reason: SkipReason) {
        if reason == SkipReason::Unavailable {
            self.skipped += 1;
            self.bar
                .set_prefix(format!("{} [{} unavailable]", self.message, self.skipped));
        }
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

/// Converts bytes to human-readable format (KB, MB, GB, TB).
fn humanize_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Converts duration to human-readable format.
fn humanize_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h{}m", secs / 3600, (secs % 3600) / 60)
    } else if secs >= 60 {
        format!("{}m{}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}
