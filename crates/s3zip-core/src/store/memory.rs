//! In-process object store.
//!
//! Mirrors the delimited listing semantics of S3 over a sorted key map:
//! keys with a further delimiter after the listed prefix are folded into
//! common prefixes, and keys and prefixes share one lexicographic page
//! sequence. Failures can be injected per prefix or per key, and every call
//! is recorded so tests can assert on listing and open counts.

use super::ListingPage;
use super::ListingRequest;
use super::ObjectStore;
use super::StoreError;
use super::StoredObject;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::io::Cursor;
use std::io::Read;
use std::sync::Mutex;
use std::sync::PoisonError;

/// Default number of keys and prefixes returned per page (S3 `MaxKeys`).
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Default)]
struct CallLog {
    listed: Vec<String>,
    opened: Vec<String>,
}

/// Listing item in page order.
enum Item<'a> {
    Key(&'a str),
    Prefix(&'a str),
}

impl Item<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Key(name) | Self::Prefix(name) => name,
        }
    }
}

/// In-memory [`ObjectStore`] holding a single bucket.
///
/// # Examples
///
/// ```
/// use s3zip_core::ListingRequest;
/// use s3zip_core::MemoryStore;
/// use s3zip_core::ObjectStore;
///
/// let store = MemoryStore::new("b")
///     .with_object("a/1.txt", "one")
///     .with_object("a/2.txt", "two")
///     .with_object("b/3.txt", "three");
///
/// let page = store.list_page(&ListingRequest::new("b", "")).unwrap();
/// assert!(page.object_keys.is_empty());
/// assert_eq!(page.child_prefixes, vec!["a/", "b/"]);
/// assert_eq!(store.list_calls(), 1);
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    bucket: String,
    objects: BTreeMap<String, Vec<u8>>,
    page_size: usize,
    forbidden_prefixes: HashSet<String>,
    failing_prefixes: HashSet<String>,
    unavailable_keys: HashSet<String>,
    interrupted_keys: HashMap<String, usize>,
    calls: Mutex<CallLog>,
}

impl MemoryStore {
    /// Creates an empty store for `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
            forbidden_prefixes: HashSet::new(),
            failing_prefixes: HashSet::new(),
            unavailable_keys: HashSet::new(),
            interrupted_keys: HashMap::new(),
            calls: Mutex::new(CallLog::default()),
        }
    }

    /// Adds or replaces an object.
    #[must_use]
    pub fn with_object(mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(key, content);
        self
    }

    /// Adds or replaces an object in place.
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.objects.insert(key.into(), content.into());
    }

    /// Sets the maximum number of keys plus prefixes per page.
    ///
    /// A size of zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Makes listings of exactly `prefix` fail with [`StoreError::Forbidden`].
    #[must_use]
    pub fn deny_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.forbidden_prefixes.insert(prefix.into());
        self
    }

    /// Makes listings of exactly `prefix` fail with [`StoreError::Service`].
    #[must_use]
    pub fn fail_listing(mut self, prefix: impl Into<String>) -> Self {
        self.failing_prefixes.insert(prefix.into());
        self
    }

    /// Makes opening `key` fail with [`StoreError::Service`].
    #[must_use]
    pub fn make_unavailable(mut self, key: impl Into<String>) -> Self {
        self.unavailable_keys.insert(key.into());
        self
    }

    /// Makes the stream of `key` fail after `bytes` bytes have been read.
    #[must_use]
    pub fn interrupt_after(mut self, key: impl Into<String>, bytes: usize) -> Self {
        self.interrupted_keys.insert(key.into(), bytes);
        self
    }

    /// Returns the bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the store holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the number of listing calls issued so far.
    pub fn list_calls(&self) -> usize {
        self.with_log(|log| log.listed.len())
    }

    /// Returns the prefix of every listing call, in call order.
    pub fn listed_prefixes(&self) -> Vec<String> {
        self.with_log(|log| log.listed.clone())
    }

    /// Returns the key of every open call, in call order.
    pub fn opened_keys(&self) -> Vec<String> {
        self.with_log(|log| log.opened.clone())
    }

    /// Forgets all recorded calls.
    pub fn reset_calls(&self) {
        self.with_log(|log| *log = CallLog::default());
    }

    fn with_log<T>(&self, f: impl FnOnce(&mut CallLog) -> T) -> T {
        let mut log = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }

    fn check_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        if bucket == self.bucket {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                resource: bucket.to_string(),
            })
        }
    }

    /// Yields keys and folded common prefixes under `prefix` in page order.
    fn items<'a>(&'a self, prefix: &'a str, delimiter: &'a str) -> impl Iterator<Item = Item<'a>> {
        let mut last_prefix: Option<&'a str> = None;
        self.objects
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .map(|(key, _)| key.as_str())
            .take_while(move |key| key.starts_with(prefix))
            .filter_map(move |key| {
                let rest = &key[prefix.len()..];
                if delimiter.is_empty() {
                    return Some(Item::Key(key));
                }
                match rest.find(delimiter) {
                    Some(pos) => {
                        let common = &key[..prefix.len() + pos + delimiter.len()];
                        if last_prefix == Some(common) {
                            None
                        } else {
                            last_prefix = Some(common);
                            Some(Item::Prefix(common))
                        }
                    }
                    None => Some(Item::Key(key)),
                }
            })
    }
}

impl ObjectStore for MemoryStore {
    fn list_page(&self, request: &ListingRequest) -> Result<ListingPage, StoreError> {
        self.with_log(|log| log.listed.push(request.prefix.clone()));
        self.check_bucket(&request.bucket)?;

        if self.forbidden_prefixes.contains(&request.prefix) {
            return Err(StoreError::Forbidden {
                resource: request.prefix.clone(),
            });
        }
        if self.failing_prefixes.contains(&request.prefix) {
            return Err(StoreError::Service {
                message: format!("injected listing failure for '{}'", request.prefix),
            });
        }

        let start_after = request.continuation_token.as_deref();
        let mut remaining = self
            .items(&request.prefix, &request.delimiter)
            .filter(|item| start_after.is_none_or(|token| item.name() > token))
            .peekable();

        let mut page = ListingPage::default();
        let mut last_name = None;
        for item in remaining.by_ref().take(self.page_size) {
            last_name = Some(item.name().to_string());
            match item {
                Item::Key(key) => page.object_keys.push(key.to_string()),
                Item::Prefix(prefix) => page.child_prefixes.push(prefix.to_string()),
            }
        }

        if remaining.peek().is_some() {
            page.next_token = last_name;
        }

        Ok(page)
    }

    fn open(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        self.with_log(|log| log.opened.push(key.to_string()));
        self.check_bucket(bucket)?;

        if self.unavailable_keys.contains(key) {
            return Err(StoreError::Service {
                message: format!("injected open failure for '{key}'"),
            });
        }

        let content = self.objects.get(key).ok_or_else(|| StoreError::NotFound {
            resource: key.to_string(),
        })?;
        let length = content.len() as u64;
        let cursor = Cursor::new(content.clone());

        let object = match self.interrupted_keys.get(key) {
            Some(&limit) => StoredObject::new(InterruptedReader {
                inner: cursor,
                remaining: limit,
            }),
            None => StoredObject::new(cursor),
        };

        Ok(object.with_content_length(length))
    }
}

/// Reader that fails once `remaining` bytes have been delivered.
struct InterruptedReader {
    inner: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for InterruptedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "injected stream interruption",
            ));
        }
        let len = buf.len().min(self.remaining);
        let read = self.inner.read(&mut buf[..len])?;
        self.remaining -= read;
        Ok(read)
    }
}
