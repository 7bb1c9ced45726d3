//! Paginated prefix listing.
//!
//! [`PageFetcher`] turns the store's one-page-at-a-time listing into either
//! a lazy page iterator ([`PageFetcher::pages`]) or the concatenation of all
//! pages of a prefix ([`PageFetcher::fetch_all`]). An empty concatenation is
//! reported as [`ListingError::NotFound`]; a denied listing as
//! [`ListingError::Forbidden`], never as NotFound.

use crate::store::ListingPage;
use crate::store::ListingRequest;
use crate::store::ObjectStore;
use crate::store::StoreError;
use std::cell::Cell;
use thiserror::Error;
use tracing::trace;

/// Why a prefix could not be listed.
#[derive(Error, Debug)]
pub enum ListingError {
    /// No key and no child prefix exists under the prefix, or the bucket
    /// does not exist.
    #[error("prefix '{prefix}' does not exist")]
    NotFound {
        /// The listed prefix.
        prefix: String,
    },

    /// The storage service denied the listing.
    #[error("listing of '{prefix}' was denied")]
    Forbidden {
        /// The listed prefix.
        prefix: String,
    },

    /// Any other listing failure.
    #[error("listing of '{prefix}' failed: {source}")]
    Failed {
        /// The listed prefix.
        prefix: String,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },
}

impl ListingError {
    fn from_store(prefix: &str, err: StoreError) -> Self {
        let prefix = prefix.to_string();
        match err {
            StoreError::Forbidden { .. } => Self::Forbidden { prefix },
            StoreError::NotFound { .. } => Self::NotFound { prefix },
            source @ StoreError::Service { .. } => Self::Failed { prefix, source },
        }
    }
}

/// All pages of one prefix, concatenated in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixListing {
    /// The listed prefix.
    pub prefix: String,
    /// Keys directly under the prefix.
    pub object_keys: Vec<String>,
    /// Child folder prefixes.
    pub child_prefixes: Vec<String>,
    /// Number of pages fetched.
    pub pages: usize,
}

impl PrefixListing {
    /// Returns `true` if the prefix has neither keys nor child prefixes.
    pub fn is_empty(&self) -> bool {
        self.object_keys.is_empty() && self.child_prefixes.is_empty()
    }
}

/// Issues listing calls for one bucket.
///
/// # Examples
///
/// ```
/// use s3zip_core::MemoryStore;
/// use s3zip_core::listing::PageFetcher;
///
/// let store = MemoryStore::new("b")
///     .with_page_size(1)
///     .with_object("a/1.txt", "1")
///     .with_object("a/2.txt", "2");
/// let fetcher = PageFetcher::new(&store, "b");
///
/// let listing = fetcher.fetch_all("a/").unwrap();
/// assert_eq!(listing.object_keys, vec!["a/1.txt", "a/2.txt"]);
/// assert_eq!(listing.pages, 2);
/// assert_eq!(fetcher.calls(), 2);
/// ```
#[derive(Debug)]
pub struct PageFetcher<'a, S: ?Sized> {
    store: &'a S,
    bucket: &'a str,
    calls: Cell<usize>,
}

impl<'a, S: ObjectStore + ?Sized> PageFetcher<'a, S> {
    /// Creates a fetcher for `bucket`.
    pub fn new(store: &'a S, bucket: &'a str) -> Self {
        Self {
            store,
            bucket,
            calls: Cell::new(0),
        }
    }

    /// Returns the number of listing calls issued so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Issues a single listing call.
    pub fn fetch_page(
        &self,
        prefix: &str,
        token: Option<String>,
    ) -> Result<ListingPage, StoreError> {
        let request =
            ListingRequest::new(self.bucket, prefix).with_continuation_token(token);
        self.calls.set(self.calls.get() + 1);
        trace!(prefix, token = ?request.continuation_token, "listing page");
        self.store.list_page(&request)
    }

    /// Returns a lazy iterator over the pages of `prefix`.
    ///
    /// The iterator stops after the last page or after the first error.
    pub fn pages<'f>(&'f self, prefix: &str) -> Pages<'f, 'a, S> {
        Pages {
            fetcher: self,
            prefix: prefix.to_string(),
            next_token: None,
            done: false,
        }
    }

    /// Fetches and concatenates every page of `prefix`.
    ///
    /// # Errors
    ///
    /// - [`ListingError::NotFound`] if every page is empty or the bucket does
    ///   not exist
    /// - [`ListingError::Forbidden`] if the service denied any page
    /// - [`ListingError::Failed`] for any other failure
    pub fn fetch_all(&self, prefix: &str) -> Result<PrefixListing, ListingError> {
        let mut listing = PrefixListing {
            prefix: prefix.to_string(),
            ..PrefixListing::default()
        };

        for page in self.pages(prefix) {
            let page = page.map_err(|e| ListingError::from_store(prefix, e))?;
            listing.pages += 1;
            listing.object_keys.extend(page.object_keys);
            listing.child_prefixes.extend(page.child_prefixes);
        }

        if listing.is_empty() {
            return Err(ListingError::NotFound {
                prefix: prefix.to_string(),
            });
        }

        Ok(listing)
    }
}

/// Lazy page iterator returned by [`PageFetcher::pages`].
#[derive(Debug)]
pub struct Pages<'f, 'a, S: ?Sized> {
    fetcher: &'f PageFetcher<'a, S>,
    prefix: String,
    next_token: Option<String>,
    done: bool,
}

impl<S: ObjectStore + ?Sized> Iterator for Pages<'_, '_, S> {
    type Item = Result<ListingPage, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let token = self.next_token.take();
        let page = match self.fetcher.fetch_page(&self.prefix, token.clone()) {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        match &page.next_token {
            None => self.done = true,
            Some(next) if token.as_ref() == Some(next) => {
                self.done = true;
                return Some(Err(StoreError::Service {
                    message: format!("continuation token '{next}' repeated"),
                }));
            }
            Some(next) => self.next_token = Some(next.clone()),
        }

        Some(Ok(page))
    }
}
