//! Storage service abstraction.
//!
//! The traversal engine only needs two operations from the storage service:
//! a delimited, paginated listing and an open-for-read. [`ObjectStore`]
//! captures both. Implementations:
//!
//! - [`MemoryStore`]: in-process store with call counters and failure
//!   injection
//! - `S3Store` (feature `s3`): AWS S3 through the official SDK

mod memory;
#[cfg(feature = "s3")]
mod s3;

pub use memory::MemoryStore;
#[cfg(feature = "s3")]
pub use s3::S3Settings;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use crate::config::DELIMITER;
use chrono::DateTime;
use chrono::Utc;
use std::fmt;
use std::io::Read;
use thiserror::Error;

/// Parameters of one listing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    /// Bucket to list.
    pub bucket: String,
    /// Only keys starting with this prefix are returned.
    pub prefix: String,
    /// Token returned by the previous page, if any.
    pub continuation_token: Option<String>,
    /// Grouping delimiter; always `/`.
    pub delimiter: String,
}

impl ListingRequest {
    /// Creates a request for the first page of `prefix`.
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
            continuation_token: None,
            delimiter: DELIMITER.to_string(),
        }
    }

    /// Returns the request for the page following `token`.
    #[must_use]
    pub fn with_continuation_token(mut self, token: Option<String>) -> Self {
        self.continuation_token = token;
        self
    }
}

/// One page of a delimited listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Keys directly under the listed prefix, in listing order.
    pub object_keys: Vec<String>,
    /// Child folder prefixes (ending with the delimiter), in listing order.
    pub child_prefixes: Vec<String>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

impl ListingPage {
    /// Returns `true` if the page has neither keys nor child prefixes.
    pub fn is_empty(&self) -> bool {
        self.object_keys.is_empty() && self.child_prefixes.is_empty()
    }
}

/// An opened object ready to be streamed into the archive.
pub struct StoredObject {
    /// Forward-only content stream.
    pub reader: Box<dyn Read + Send>,
    /// Content length announced by the store, if known.
    pub content_length: Option<u64>,
    /// Last modification time, if known.
    pub last_modified: Option<DateTime<Utc>>,
}

impl StoredObject {
    /// Wraps a reader with no metadata.
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            content_length: None,
            last_modified: None,
        }
    }

    /// Sets the announced content length.
    #[must_use]
    pub fn with_content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Sets the last modification time.
    #[must_use]
    pub fn with_last_modified(mut self, time: DateTime<Utc>) -> Self {
        self.last_modified = Some(time);
        self
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_length", &self.content_length)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// Failure reported by a storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The service denied access (HTTP 403).
    #[error("access denied: {resource}")]
    Forbidden {
        /// Bucket, prefix or key that was denied.
        resource: String,
    },

    /// The bucket or object does not exist (HTTP 404).
    #[error("not found: {resource}")]
    NotFound {
        /// Bucket or key that was not found.
        resource: String,
    },

    /// Any other failure, including timeouts and transport errors.
    #[error("storage service error: {message}")]
    Service {
        /// Human-readable description from the backend.
        message: String,
    },
}

/// Storage service operations used by the traversal engine.
///
/// Both operations are blocking. Timeouts and retries are the
/// implementation's responsibility; a timeout is reported as
/// [`StoreError::Service`].
pub trait ObjectStore {
    /// Issues one delimited listing call.
    fn list_page(&self, request: &ListingRequest) -> Result<ListingPage, StoreError>;

    /// Opens an object for reading.
    fn open(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn list_page(&self, request: &ListingRequest) -> Result<ListingPage, StoreError> {
        (**self).list_page(request)
    }

    fn open(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        (**self).open(bucket, key)
    }
}
