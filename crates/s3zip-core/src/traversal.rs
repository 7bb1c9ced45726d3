//! Depth-first traversal of a prefix tree into an archive.
//!
//! The walk is pre-order with keys before subfolders at each level and
//! subfolders in listing order. It uses an explicit stack, so arbitrarily
//! deep prefix chains cannot exhaust the call stack.
//!
//! Failure handling:
//!
//! | Condition                         | At the root           | Below the root           |
//! |-----------------------------------|-----------------------|--------------------------|
//! | prefix excluded                   | empty archive         | subtree pruned           |
//! | listing empty or bucket missing   | `InvalidPrefix`       | branch skipped           |
//! | listing denied                    | `Forbidden`           | [`ForbiddenPolicy`]      |
//! | listing failed                    | `Listing`             | branch skipped           |
//! | object cannot be opened           | n/a                   | entry skipped            |
//! | object stream fails mid-entry     | n/a                   | `EntryInterrupted`       |
//! | sink fails                        | `Sink`                | `Sink`                   |
//!
//! The root listing completes before the archive writer is created, so
//! every root-level failure leaves the sink untouched.

use crate::ArchiveConfig;
use crate::ArchiveError;
use crate::ArchiveWriter;
use crate::CancellationToken;
use crate::ExclusionMatcher;
use crate::ForbiddenPolicy;
use crate::Result;
use crate::listing::ListingError;
use crate::listing::PageFetcher;
use crate::listing::PrefixListing;
use crate::report::ArchiveReport;
use crate::report::NoopProgress;
use crate::report::ProgressCallback;
use crate::report::SkipReason;
use crate::store::ObjectStore;
use crate::store::StoreError;
use std::io::Seek;
use std::io::Write;
use std::time::Instant;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Result of visiting one archivable key.
enum Visited {
    Added,
    Unavailable(StoreError),
}

/// Produces archives of one bucket prefix.
///
/// Construction validates the configuration and compiles the exclusion
/// rules, so every configuration error is reported before any storage call.
///
/// # Examples
///
/// ```
/// use s3zip_core::ArchiveConfig;
/// use s3zip_core::ArchiveProducer;
/// use s3zip_core::MemoryStore;
///
/// let store = MemoryStore::new("b")
///     .with_object("a/1.txt", "1")
///     .with_object("a/2.txt", "2")
///     .with_object("b/3.txt", "3");
/// let config = ArchiveConfig::new("b").with_exclude_patterns(vec!["^a/".into()]);
///
/// let producer = ArchiveProducer::new(&store, &config)?;
/// assert_eq!(producer.plan()?, vec!["b/3.txt"]);
///
/// let mut archive = Vec::new();
/// let report = producer.produce_stream(&mut archive)?;
/// assert_eq!(report.entries_added, 1);
/// assert_eq!(report.bytes_written, archive.len() as u64);
/// # Ok::<(), s3zip_core::ArchiveError>(())
/// ```
#[derive(Debug)]
pub struct ArchiveProducer<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    config: &'a ArchiveConfig,
    matcher: ExclusionMatcher,
    root: String,
    cancel: Option<CancellationToken>,
}

impl<'a, S: ObjectStore + ?Sized> ArchiveProducer<'a, S> {
    /// Creates a producer.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Configuration`] if the configuration is invalid
    /// - [`ArchiveError::InvalidPattern`] if an exclusion rule does not compile
    pub fn new(store: &'a S, config: &'a ArchiveConfig) -> Result<Self> {
        config.validate()?;
        let matcher = ExclusionMatcher::new(&config.exclude_patterns)?;

        Ok(Self {
            store,
            config,
            matcher,
            root: config.root_prefix(),
            cancel: None,
        })
    }

    /// Stops production once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Returns the normalized root prefix.
    pub fn root_prefix(&self) -> &str {
        &self.root
    }

    /// Writes the archive to a seekable sink.
    ///
    /// # Errors
    ///
    /// See [`ArchiveProducer::produce_with_progress`].
    pub fn produce<W: Write + Seek>(&self, sink: W) -> Result<ArchiveReport> {
        self.produce_with_progress(sink, &mut NoopProgress)
    }

    /// Writes the archive to a seekable sink, reporting progress.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::InvalidPrefix`] if the root prefix has no keys and
    ///   no child prefixes, or the bucket does not exist
    /// - [`ArchiveError::Forbidden`] if listing the root, or a child prefix
    ///   under [`ForbiddenPolicy::Fail`], was denied
    /// - [`ArchiveError::Listing`] if listing the root failed
    /// - [`ArchiveError::Sink`] if the sink failed
    /// - [`ArchiveError::EntryInterrupted`] if an object stream failed
    ///   mid-entry
    /// - [`ArchiveError::Cancelled`] if the cancellation token fired
    ///
    /// On error the sink holds either nothing or an incomplete archive
    /// without a central directory.
    pub fn produce_with_progress<W: Write + Seek>(
        &self,
        sink: W,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ArchiveReport> {
        let level = self.config.compression_level;
        self.run(move || ArchiveWriter::new(sink, level), progress)
    }

    /// Writes the archive to a forward-only sink.
    ///
    /// # Errors
    ///
    /// See [`ArchiveProducer::produce_with_progress`].
    pub fn produce_stream<W: Write>(&self, sink: W) -> Result<ArchiveReport> {
        self.produce_stream_with_progress(sink, &mut NoopProgress)
    }

    /// Writes the archive to a forward-only sink, reporting progress.
    ///
    /// # Errors
    ///
    /// See [`ArchiveProducer::produce_with_progress`].
    pub fn produce_stream_with_progress<W: Write>(
        &self,
        sink: W,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ArchiveReport> {
        let level = self.config.compression_level;
        self.run(move || ArchiveWriter::new_stream(sink, level), progress)
    }

    /// Returns the entry names an archive would contain, in archive order,
    /// without opening any object.
    ///
    /// Objects that would fail to open are still listed.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveProducer::produce_with_progress`], minus the sink and
    /// stream errors.
    pub fn plan(&self) -> Result<Vec<String>> {
        let fetcher = PageFetcher::new(self.store, &self.config.bucket);
        let mut report = ArchiveReport::new();
        let mut names = Vec::new();

        let Some(root) = self.list_root(&fetcher, &mut report)? else {
            return Ok(names);
        };

        self.walk(
            &fetcher,
            root,
            &mut report,
            &mut NoopProgress,
            |_key, name, _progress| {
                names.push(name.to_string());
                Ok(Visited::Added)
            },
        )?;

        Ok(names)
    }

    fn run<W: Write + Seek>(
        &self,
        make_writer: impl FnOnce() -> ArchiveWriter<W>,
        progress: &mut dyn ProgressCallback,
    ) -> Result<ArchiveReport> {
        let start = Instant::now();
        let fetcher = PageFetcher::new(self.store, &self.config.bucket);
        let mut report = ArchiveReport::new();

        info!(
            bucket = %self.config.bucket,
            prefix = %self.root,
            archive = %self.config.archive_name,
            rules = self.matcher.len(),
            "producing archive"
        );

        let root = self.list_root(&fetcher, &mut report)?;
        let mut writer = make_writer();

        if let Some(root) = root {
            let cancel = self.cancel.as_ref();
            let bucket = self.config.bucket.as_str();
            self.walk(&fetcher, root, &mut report, progress, |key, name, progress| {
                let object = match self.store.open(bucket, key) {
                    Ok(object) => object,
                    Err(e) => return Ok(Visited::Unavailable(e)),
                };
                progress.on_entry_start(name, writer.entries() + 1);
                writer.append_entry_with_progress(name, object, progress, cancel)?;
                progress.on_entry_complete(name);
                Ok(Visited::Added)
            })?;
        }

        let summary = writer.finish()?;
        progress.on_complete();

        report.entries_added = summary.entries;
        report.bytes_read = summary.bytes_read;
        report.bytes_written = summary.bytes_written;
        report.listing_calls = fetcher.calls();
        report.duration = start.elapsed();

        info!(
            entries = report.entries_added,
            bytes_read = report.bytes_read,
            bytes_written = report.bytes_written,
            listing_calls = report.listing_calls,
            skipped = report.entries_skipped(),
            complete = report.is_complete(),
            "archive finished"
        );

        Ok(report)
    }

    /// Lists the root prefix; `None` if the root itself is excluded.
    fn list_root(
        &self,
        fetcher: &PageFetcher<'_, S>,
        report: &mut ArchiveReport,
    ) -> Result<Option<PrefixListing>> {
        if self.matcher.is_excluded(&self.root) {
            debug!(prefix = %self.root, "root prefix excluded");
            report.prefixes_excluded += 1;
            return Ok(None);
        }

        self.check_cancelled()?;
        match fetcher.fetch_all(&self.root) {
            Ok(listing) => Ok(Some(listing)),
            Err(ListingError::NotFound { .. }) => Err(ArchiveError::InvalidPrefix {
                bucket: self.config.bucket.clone(),
                prefix: self.root.clone(),
            }),
            Err(ListingError::Forbidden { prefix }) => Err(ArchiveError::Forbidden { prefix }),
            Err(ListingError::Failed { prefix, source }) => {
                Err(ArchiveError::Listing { prefix, source })
            }
        }
    }

    /// Lists a child prefix; `None` if its branch is skipped.
    fn list_child(
        &self,
        fetcher: &PageFetcher<'_, S>,
        prefix: &str,
        report: &mut ArchiveReport,
    ) -> Result<Option<PrefixListing>> {
        self.check_cancelled()?;
        match fetcher.fetch_all(prefix) {
            Ok(listing) => Ok(Some(listing)),
            Err(ListingError::Forbidden { prefix }) => match self.config.forbidden_policy {
                ForbiddenPolicy::Fail => Err(ArchiveError::Forbidden { prefix }),
                ForbiddenPolicy::Skip => {
                    warn!(%prefix, "listing denied, skipping subtree");
                    report.prefixes_forbidden += 1;
                    report.add_warning(format!("listing of '{prefix}' was denied"));
                    Ok(None)
                }
            },
            Err(e) => {
                warn!(prefix, error = %e, "skipping subtree");
                report.prefixes_failed += 1;
                report.add_warning(e.to_string());
                Ok(None)
            }
        }
    }

    fn walk<F>(
        &self,
        fetcher: &PageFetcher<'_, S>,
        root: PrefixListing,
        report: &mut ArchiveReport,
        progress: &mut dyn ProgressCallback,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(&str, &str, &mut dyn ProgressCallback) -> Result<Visited>,
    {
        let mut root = Some(root);
        let mut pending: Vec<String> = Vec::new();

        loop {
            let listing = match root.take() {
                Some(listing) => listing,
                None => {
                    let Some(prefix) = pending.pop() else { break };
                    match self.list_child(fetcher, &prefix, report)? {
                        Some(listing) => listing,
                        None => continue,
                    }
                }
            };

            report.prefixes_visited += 1;
            debug!(
                prefix = %listing.prefix,
                keys = listing.object_keys.len(),
                children = listing.child_prefixes.len(),
                pages = listing.pages,
                "visiting prefix"
            );

            for key in &listing.object_keys {
                if *key == listing.prefix {
                    report.markers_skipped += 1;
                    progress.on_entry_skipped(key, SkipReason::DirectoryMarker);
                    continue;
                }
                if let Some((index, rule)) = self.matcher.first_match(key) {
                    debug!(key, rule = index, pattern = rule.pattern(), "key excluded");
                    report.keys_excluded += 1;
                    progress.on_entry_skipped(key, SkipReason::Excluded);
                    continue;
                }

                self.check_cancelled()?;
                let name = self.entry_name(key);
                if let Visited::Unavailable(e) = visit(key, name, progress)? {
                    warn!(key, error = %e, "object unavailable, skipping");
                    report.objects_unavailable += 1;
                    report.add_warning(format!("'{key}' skipped: {e}"));
                    progress.on_entry_skipped(key, SkipReason::Unavailable);
                }
            }

            let mark = pending.len();
            for child in listing.child_prefixes {
                if let Some((index, rule)) = self.matcher.first_match(&child) {
                    debug!(prefix = %child, rule = index, pattern = rule.pattern(), "prefix excluded");
                    report.prefixes_excluded += 1;
                    continue;
                }
                pending.push(child);
            }
            pending[mark..].reverse();
        }

        Ok(())
    }

    fn entry_name<'k>(&self, key: &'k str) -> &'k str {
        if self.config.strip_root {
            key.strip_prefix(self.root.as_str()).unwrap_or(key)
        } else {
            key
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(ArchiveError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Streams the archive described by `config` into a forward-only sink.
///
/// Shorthand for [`ArchiveProducer::new`] followed by
/// [`ArchiveProducer::produce_stream`].
///
/// # Errors
///
/// See [`ArchiveProducer::new`] and
/// [`ArchiveProducer::produce_with_progress`].
pub fn produce_archive<S, W>(store: &S, config: &ArchiveConfig, sink: W) -> Result<ArchiveReport>
where
    S: ObjectStore + ?Sized,
    W: Write,
{
    ArchiveProducer::new(store, config)?.produce_stream(sink)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn names(store: &MemoryStore, config: &ArchiveConfig) -> Vec<String> {
        ArchiveProducer::new(store, config).unwrap().plan().unwrap()
    }

    #[test]
    fn test_keys_before_subfolders() {
        let store = MemoryStore::new("b")
            .with_object("r/z.txt", "z")
            .with_object("r/a/1.txt", "1")
            .with_object("r/a/b/2.txt", "2")
            .with_object("r/c/3.txt", "3");
        let config = ArchiveConfig::new("b").with_prefix("r");

        assert_eq!(
            names(&store, &config),
            vec!["r/z.txt", "r/a/1.txt", "r/a/b/2.txt", "r/c/3.txt"]
        );
    }

    #[test]
    fn test_strip_root_names() {
        let store = MemoryStore::new("b")
            .with_object("r/1.txt", "1")
            .with_object("r/s/2.txt", "2");
        let config = ArchiveConfig::new("b").with_prefix("r").with_strip_root(true);

        assert_eq!(names(&store, &config), vec!["1.txt", "s/2.txt"]);
    }

    #[test]
    fn test_marker_is_skipped() {
        let store = MemoryStore::new("b")
            .with_object("r/", "")
            .with_object("r/s/", "")
            .with_object("r/s/1.txt", "1");
        let config = ArchiveConfig::new("b").with_prefix("r/");

        assert_eq!(names(&store, &config), vec!["r/s/1.txt"]);
    }

    #[test]
    fn test_invalid_configuration_fails_before_listing() {
        let store = MemoryStore::new("b").with_object("k", "v");
        let config = ArchiveConfig::new("");
        assert!(ArchiveProducer::new(&store, &config).unwrap_err().is_configuration());

        let config = ArchiveConfig::new("b").with_exclude_patterns(vec!["(".into()]);
        assert!(matches!(
            ArchiveProducer::new(&store, &config),
            Err(ArchiveError::InvalidPattern { .. })
        ));
        assert_eq!(store.list_calls(), 0);
    }

    #[test]
    fn test_excluded_root_lists_nothing() {
        let store = MemoryStore::new("b").with_object("r/1.txt", "1");
        let config = ArchiveConfig::new("b")
            .with_prefix("r")
            .with_exclude_patterns(vec!["^r/$".into()]);

        assert!(names(&store, &config).is_empty());
        assert_eq!(store.list_calls(), 0);
    }

    #[test]
    fn test_cancelled_before_root_listing() {
        let store = MemoryStore::new("b").with_object("k", "v");
        let config = ArchiveConfig::new("b");
        let token = CancellationToken::new();
        token.cancel();

        let producer = ArchiveProducer::new(&store, &config)
            .unwrap()
            .with_cancellation(token);
        let mut sink = Vec::new();
        assert!(matches!(
            producer.produce_stream(&mut sink),
            Err(ArchiveError::Cancelled)
        ));
        assert!(sink.is_empty());
        assert_eq!(store.list_calls(), 0);
    }
}
