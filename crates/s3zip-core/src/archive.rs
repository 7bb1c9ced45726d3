//! Streaming ZIP archive writer.
//!
//! [`ArchiveWriter`] appends one entry at a time, draining each object
//! stream through a fixed buffer so no object is ever held in memory. It
//! supports two sink modes:
//!
//! - seekable sinks (files): [`ArchiveWriter::new`]
//! - forward-only sinks (stdout, sockets, HTTP bodies):
//!   [`ArchiveWriter::new_stream`], which writes data descriptors instead of
//!   seeking back into local headers
//!
//! `finish` consumes the writer, so appending after finalization does not
//! compile. A writer dropped without `finish` seals its sink first: the
//! archive is left explicitly incomplete, without a central directory.
//! The abandonment is logged once at warn level. The `zip` encoder still
//! tries to finalize on drop and writes a "sink is sealed" error straight
//! to stderr; that line is expected and bypasses the tracing subscriber.

use crate::ArchiveError;
use crate::CancellationToken;
use crate::Result;
use crate::io::SinkGuard;
use crate::io::SinkState;
use crate::report::NoopProgress;
use crate::report::ProgressCallback;
use crate::store::StoredObject;
use chrono::DateTime;
use chrono::Datelike;
use chrono::Timelike;
use chrono::Utc;
use std::io::Read;
use std::io::Seek;
use std::io::Write;
use std::sync::Arc;
use tracing::trace;
use tracing::warn;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::write::StreamWriter;

/// Size of the copy buffer between object streams and the encoder.
pub const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Objects at or above this size need ZIP64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Totals returned by [`ArchiveWriter::finish`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Entries written.
    pub entries: usize,
    /// Object bytes read into the archive.
    pub bytes_read: u64,
    /// Archive size in bytes.
    pub bytes_written: u64,
}

/// Appends entries to a ZIP archive in insertion order.
///
/// # Examples
///
/// ```
/// use s3zip_core::ArchiveWriter;
/// use s3zip_core::StoredObject;
/// use std::io::Cursor;
///
/// let mut buffer = Vec::new();
/// let mut writer = ArchiveWriter::new_stream(&mut buffer, Some(0));
/// writer.append_entry("a/1.txt", StoredObject::new(Cursor::new(b"one".to_vec())))?;
/// writer.append_entry("b/3.txt", StoredObject::new(Cursor::new(b"three".to_vec())))?;
/// let summary = writer.finish()?;
///
/// assert_eq!(summary.entries, 2);
/// assert_eq!(summary.bytes_read, 8);
/// assert_eq!(summary.bytes_written, buffer.len() as u64);
/// # Ok::<(), s3zip_core::ArchiveError>(())
/// ```
pub struct ArchiveWriter<W: Write + Seek> {
    zip: Option<ZipWriter<W>>,
    options: SimpleFileOptions,
    state: Arc<SinkState>,
    buffer: Vec<u8>,
    entries: usize,
    bytes_read: u64,
}

impl<S: Write + Seek> ArchiveWriter<SinkGuard<S>> {
    /// Creates a writer over a seekable sink.
    ///
    /// `compression_level`: `None` or `Some(0)` stores entries, 1-9 deflates.
    pub fn new(sink: S, compression_level: Option<u8>) -> Self {
        let sink = SinkGuard::new(sink);
        let state = sink.state();
        Self::from_zip(ZipWriter::new(sink), state, compression_level)
    }
}

impl<S: Write> ArchiveWriter<StreamWriter<SinkGuard<S>>> {
    /// Creates a writer over a forward-only sink.
    ///
    /// `compression_level`: `None` or `Some(0)` stores entries, 1-9 deflates.
    pub fn new_stream(sink: S, compression_level: Option<u8>) -> Self {
        let sink = SinkGuard::new(sink);
        let state = sink.state();
        Self::from_zip(ZipWriter::new_stream(sink), state, compression_level)
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    fn from_zip(zip: ZipWriter<W>, state: Arc<SinkState>, compression_level: Option<u8>) -> Self {
        Self {
            zip: Some(zip),
            options: file_options(compression_level),
            state,
            buffer: vec![0u8; COPY_BUFFER_SIZE],
            entries: 0,
            bytes_read: 0,
        }
    }

    /// Returns the number of entries written so far.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Returns the archive size reached so far.
    pub fn bytes_written(&self) -> u64 {
        self.state.bytes_written()
    }

    /// Appends one entry, draining `object` to exhaustion.
    ///
    /// Returns the number of content bytes read.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::Sink`] if the sink failed
    /// - [`ArchiveError::EntryInterrupted`] if the object stream failed
    /// - [`ArchiveError::Encoder`] if the encoder rejected the entry
    pub fn append_entry(&mut self, name: &str, object: StoredObject) -> Result<u64> {
        self.append_entry_with_progress(name, object, &mut NoopProgress, None)
    }

    /// Appends one entry, reporting each chunk to `progress` and checking
    /// `cancel` between chunks.
    ///
    /// # Errors
    ///
    /// Same as [`ArchiveWriter::append_entry`], plus
    /// [`ArchiveError::Cancelled`] when `cancel` fires mid-entry.
    pub fn append_entry_with_progress(
        &mut self,
        name: &str,
        object: StoredObject,
        progress: &mut dyn ProgressCallback,
        cancel: Option<&CancellationToken>,
    ) -> Result<u64> {
        let options = entry_options(self.options, &object);
        let StoredObject { mut reader, .. } = object;

        let Some(zip) = self.zip.as_mut() else {
            return Err(ArchiveError::Sink(std::io::Error::other(
                "archive writer already closed",
            )));
        };

        if let Err(e) = zip.start_file(name, options) {
            return Err(classify_zip(&self.state, e));
        }

        let mut copied = 0u64;
        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(ArchiveError::Cancelled);
            }

            let read = match reader.read(&mut self.buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ArchiveError::EntryInterrupted {
                        key: name.to_string(),
                        source,
                    });
                }
            };

            if let Err(e) = zip.write_all(&self.buffer[..read]) {
                return Err(classify_io(&self.state, e));
            }
            copied += read as u64;
            progress.on_bytes_written(read as u64);
        }

        self.entries += 1;
        self.bytes_read += copied;
        trace!(name, bytes = copied, "entry written");
        Ok(copied)
    }

    /// Writes the central directory and flushes the sink.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Sink`] or [`ArchiveError::Encoder`] if the
    /// trailing structures could not be written.
    pub fn finish(mut self) -> Result<ArchiveSummary> {
        let Some(zip) = self.zip.take() else {
            return Err(ArchiveError::Sink(std::io::Error::other(
                "archive writer already closed",
            )));
        };

        let mut inner = zip.finish().map_err(|e| classify_zip(&self.state, e))?;
        inner
            .flush()
            .map_err(|e| classify_io(&self.state, e))?;

        Ok(ArchiveSummary {
            entries: self.entries,
            bytes_read: self.bytes_read,
            bytes_written: self.state.bytes_written(),
        })
    }

    /// Abandons the archive without writing trailing structures.
    ///
    /// Equivalent to dropping the writer.
    pub fn abort(self) {
        drop(self);
    }
}

impl<W: Write + Seek> Drop for ArchiveWriter<W> {
    fn drop(&mut self) {
        // The encoder finalizes on drop and prints its own stderr line when
        // that fails. With the sink sealed the failure is certain, so the line
        // ("ZipWriter drop ... archive sink is sealed") is expected output.
        if self.zip.is_some() {
            self.state.seal();
            warn!(
                entries = self.entries,
                bytes_written = self.state.bytes_written(),
                "archive abandoned before finish, output left without central directory"
            );
        }
    }
}

impl<W: Write + Seek> std::fmt::Debug for ArchiveWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveWriter")
            .field("entries", &self.entries)
            .field("bytes_read", &self.bytes_read)
            .field("bytes_written", &self.state.bytes_written())
            .field("open", &self.zip.is_some())
            .finish_non_exhaustive()
    }
}

fn file_options(compression_level: Option<u8>) -> SimpleFileOptions {
    match compression_level {
        None | Some(0) => {
            SimpleFileOptions::default().compression_method(CompressionMethod::Stored)
        }
        Some(level) => SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level))),
    }
}

fn entry_options(base: SimpleFileOptions, object: &StoredObject) -> SimpleFileOptions {
    let large = object
        .content_length
        .is_none_or(|len| len >= ZIP64_THRESHOLD);
    let options = base.large_file(large);

    match object.last_modified.as_ref().and_then(zip_datetime) {
        Some(time) => options.last_modified_time(time),
        None => options,
    }
}

/// Converts a timestamp to DOS time; `None` outside 1980-2107.
fn zip_datetime(time: &DateTime<Utc>) -> Option<zip::DateTime> {
    zip::DateTime::from_date_and_time(
        u16::try_from(time.year()).ok()?,
        u8::try_from(time.month()).ok()?,
        u8::try_from(time.day()).ok()?,
        u8::try_from(time.hour()).ok()?,
        u8::try_from(time.minute()).ok()?,
        u8::try_from(time.second()).ok()?,
    )
    .ok()
}

fn classify_io(state: &SinkState, err: std::io::Error) -> ArchiveError {
    if state.has_failed() || state.is_sealed() {
        ArchiveError::Sink(err)
    } else {
        ArchiveError::Encoder(ZipError::Io(err))
    }
}

fn classify_zip(state: &SinkState, err: ZipError) -> ArchiveError {
    match err {
        ZipError::Io(e) => classify_io(state, e),
        other => ArchiveError::Encoder(other),
    }
}
