//! Output sink wrapper.
//!
//! `SinkGuard` wraps the consumer's writer and shares a [`SinkState`] with
//! the archive writer. The state tracks:
//!
//! - archive size: the furthest offset written, so header rewrites after a
//!   seek are not counted twice
//! - whether the sink itself reported a write error (so encoder errors can
//!   be told apart from sink failures)
//! - whether the sink is sealed: once sealed every write fails, so the
//!   encoder cannot append trailing structures to an abandoned archive

use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// State shared between a [`SinkGuard`] and its owner.
#[derive(Debug, Default)]
pub struct SinkState {
    bytes_written: AtomicU64,
    failed: AtomicBool,
    sealed: AtomicBool,
}

impl SinkState {
    /// Returns the archive size: the highest offset the sink has reached.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns `true` if the wrapped writer returned an error.
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// Returns `true` if the sink no longer accepts writes.
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Relaxed)
    }

    /// Rejects every further write.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Relaxed);
    }
}

/// Writer wrapper that counts bytes and can be sealed.
///
/// # Examples
///
/// ```
/// use s3zip_core::io::SinkGuard;
/// use std::io::Write;
///
/// let mut buffer = Vec::new();
/// let mut sink = SinkGuard::new(&mut buffer);
/// let state = sink.state();
///
/// sink.write_all(b"PK")?;
/// assert_eq!(state.bytes_written(), 2);
///
/// state.seal();
/// assert!(sink.write_all(b"more").is_err());
/// assert!(!state.has_failed());
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct SinkGuard<W> {
    inner: W,
    position: u64,
    state: Arc<SinkState>,
}

impl<W> SinkGuard<W> {
    /// Wraps `inner` with fresh state.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            state: Arc::new(SinkState::default()),
        }
    }

    /// Returns a handle to the shared state.
    pub fn state(&self) -> Arc<SinkState> {
        Arc::clone(&self.state)
    }

    /// Returns a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consumes the guard and returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn check_open(&self) -> std::io::Result<()> {
        if self.state.is_sealed() {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "archive sink is sealed",
            ))
        } else {
            Ok(())
        }
    }

    fn record<T>(&self, result: std::io::Result<T>) -> std::io::Result<T> {
        if result.is_err() {
            self.state.failed.store(true, Ordering::Relaxed);
        }
        result
    }
}

impl<W: Write> Write for SinkGuard<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.check_open()?;
        let result = self.inner.write(buf);
        let bytes = self.record(result)?;
        self.position += bytes as u64;
        self.state
            .bytes_written
            .fetch_max(self.position, Ordering::Relaxed);
        Ok(bytes)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.check_open()?;
        let result = self.inner.flush();
        self.record(result)
    }
}

impl<W: Seek> Seek for SinkGuard<W> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.check_open()?;
        let result = self.inner.seek(pos);
        self.position = self.record(result)?;
        Ok(self.position)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "consumer went away",
            ))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_counts_bytes() {
        let mut buffer = Vec::new();
        let mut sink = SinkGuard::new(&mut buffer);
        let state = sink.state();

        sink.write_all(b"Hello").unwrap();
        write!(sink, ", {}", "World!").unwrap();
        sink.flush().unwrap();

        assert_eq!(state.bytes_written(), 13);
        assert_eq!(buffer, b"Hello, World!");
    }

    #[test]
    fn test_seal_rejects_writes_without_marking_failure() {
        let mut sink = SinkGuard::new(Vec::new());
        let state = sink.state();
        sink.write_all(b"abc").unwrap();

        state.seal();
        assert!(state.is_sealed());
        assert_eq!(
            sink.write(b"x").unwrap_err().kind(),
            std::io::ErrorKind::BrokenPipe
        );
        assert!(sink.flush().is_err());
        assert!(!state.has_failed());
        assert_eq!(sink.into_inner(), b"abc");
    }

    #[test]
    fn test_inner_failure_is_recorded() {
        let mut sink = SinkGuard::new(BrokenPipe);
        let state = sink.state();

        assert!(sink.write_all(b"data").is_err());
        assert!(state.has_failed());
        assert_eq!(state.bytes_written(), 0);
    }

    #[test]
    fn test_seek_delegates() {
        let mut sink = SinkGuard::new(Cursor::new(Vec::new()));
        sink.write_all(b"0123456789").unwrap();
        assert_eq!(sink.seek(SeekFrom::Start(2)).unwrap(), 2);
        sink.write_all(b"ab").unwrap();
        assert_eq!(sink.get_ref().get_ref(), b"01ab456789");
        assert_eq!(sink.state().bytes_written(), 10);
    }

    #[test]
    fn test_rewrite_then_append_counts_final_length() {
        let mut sink = SinkGuard::new(Cursor::new(Vec::new()));
        let state = sink.state();

        sink.write_all(b"header--body").unwrap();
        sink.seek(SeekFrom::Start(0)).unwrap();
        sink.write_all(b"HEADER").unwrap();
        assert_eq!(state.bytes_written(), 12);

        sink.seek(SeekFrom::End(0)).unwrap();
        sink.write_all(b"tail").unwrap();
        assert_eq!(state.bytes_written(), 16);
        assert_eq!(state.bytes_written(), sink.get_ref().get_ref().len() as u64);
    }
}
