//! Archive production reporting.

use std::fmt;
use std::time::Duration;

/// Report of an archive production run.
///
/// Every condition the engine swallows (excluded paths, unavailable objects,
/// denied or failed child listings) is counted here so callers can tell a
/// complete archive from a best-effort one.
///
/// # Examples
///
/// ```
/// use s3zip_core::ArchiveReport;
///
/// let mut report = ArchiveReport::new();
/// report.entries_added = 3;
/// report.objects_unavailable = 1;
///
/// assert!(!report.is_complete());
/// assert_eq!(report.entries_skipped(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ArchiveReport {
    /// Entries written to the archive.
    pub entries_added: usize,

    /// Object bytes read from the store (uncompressed entry content).
    pub bytes_read: u64,

    /// Archive bytes accepted by the sink.
    pub bytes_written: u64,

    /// Prefixes that were listed.
    pub prefixes_visited: usize,

    /// Listing calls issued, including follow-up pages.
    pub listing_calls: usize,

    /// Keys skipped by an exclusion rule.
    pub keys_excluded: usize,

    /// Child prefixes pruned by an exclusion rule.
    pub prefixes_excluded: usize,

    /// Directory marker keys skipped.
    pub markers_skipped: usize,

    /// Objects that could not be opened.
    pub objects_unavailable: usize,

    /// Child prefixes whose listing was denied.
    pub prefixes_forbidden: usize,

    /// Child prefixes whose listing failed or came back empty.
    pub prefixes_failed: usize,

    /// Duration of the run.
    pub duration: Duration,

    /// Human-readable description of every swallowed condition.
    pub warnings: Vec<String>,
}

impl ArchiveReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a warning message.
    pub fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Returns whether any warnings were generated.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Returns the number of keys that were listed but not archived because
    /// of a failure.
    #[must_use]
    pub fn entries_skipped(&self) -> usize {
        self.objects_unavailable
    }

    /// Returns `true` if nothing below the root was lost to a failure.
    ///
    /// Exclusions and directory markers are intentional and do not count.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.objects_unavailable == 0 && self.prefixes_forbidden == 0 && self.prefixes_failed == 0
    }

    /// Returns the compression ratio (bytes read / archive bytes).
    ///
    /// Returns 0.0 if either side is zero.
    #[must_use]
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_written == 0 || self.bytes_read == 0 {
            return 0.0;
        }
        self.bytes_read as f64 / self.bytes_written as f64
    }
}

/// Why a listed key did not become an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The key matched an exclusion rule.
    Excluded,
    /// The key is the directory marker of its own prefix.
    DirectoryMarker,
    /// The object could not be opened.
    Unavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excluded => f.write_str("excluded"),
            Self::DirectoryMarker => f.write_str("directory marker"),
            Self::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Callback trait for progress reporting during archive production.
///
/// The total number of entries is unknown while streaming, so callbacks only
/// receive the running entry number.
///
/// # Examples
///
/// ```
/// use s3zip_core::ProgressCallback;
/// use s3zip_core::SkipReason;
///
/// struct Printer;
///
/// impl ProgressCallback for Printer {
///     fn on_entry_start(&mut self, name: &str, current: usize) {
///         eprintln!("[{current}] {name}");
///     }
///
///     fn on_bytes_written(&mut self, _bytes: u64) {}
///
///     fn on_entry_complete(&mut self, _name: &str) {}
///
///     fn on_entry_skipped(&mut self, key: &str, reason: SkipReason) {
///         eprintln!("skipped {key}: {reason}");
///     }
///
///     fn on_complete(&mut self) {}
/// }
/// ```
pub trait ProgressCallback: Send {
    /// Called before an entry starts streaming.
    ///
    /// # Arguments
    ///
    /// * `name` - Entry name inside the archive
    /// * `current` - Entry number (1-indexed)
    fn on_entry_start(&mut self, name: &str, current: usize);

    /// Called for each chunk of object content forwarded to the encoder.
    fn on_bytes_written(&mut self, bytes: u64);

    /// Called after an entry has been fully written.
    fn on_entry_complete(&mut self, name: &str);

    /// Called when a listed key is not archived.
    fn on_entry_skipped(&mut self, key: &str, reason: SkipReason);

    /// Called once after the archive has been finalized.
    fn on_complete(&mut self);
}

/// No-op implementation of `ProgressCallback`.
#[derive(Debug, Default)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {
    fn on_entry_start(&mut self, _name: &str, _current: usize) {}

    fn on_bytes_written(&mut self, _bytes: u64) {}

    fn on_entry_complete(&mut self, _name: &str) {}

    fn on_entry_skipped(&mut self, _key: &str, _reason: SkipReason) {}

    fn on_complete(&mut self) {}
}
