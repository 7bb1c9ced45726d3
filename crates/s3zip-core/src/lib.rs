//! Streams an object-store prefix tree into a single ZIP archive.
//!
//! `s3zip-core` walks the delimiter-grouped "folders" of a bucket prefix
//! depth-first, filters keys and prefixes through ordered regular-expression
//! exclusion rules and appends each remaining object to a ZIP archive as it
//! is read. Neither the archive nor any object is ever held in memory, and
//! the sink may be forward-only (stdout, sockets, HTTP bodies).
//!
//! Failures below the root are recovered from: unavailable objects and
//! unreadable branches are skipped and counted in the [`ArchiveReport`].
//! Configuration errors, a missing root prefix and sink failures are fatal.
//!
//! # Examples
//!
//! ```
//! use s3zip_core::ArchiveConfig;
//! use s3zip_core::MemoryStore;
//! use s3zip_core::produce_archive;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new("b")
//!     .with_object("a/1.txt", "one")
//!     .with_object("a/2.txt", "two")
//!     .with_object("b/3.txt", "three");
//! let config = ArchiveConfig::new("b");
//!
//! let mut archive = Vec::new();
//! let report = produce_archive(&store, &config, &mut archive)?;
//! println!("Archived {} objects", report.entries_added);
//! # Ok(())
//! # }
//! ```
//!
//! With the `s3` feature, [`S3Store`] connects to AWS S3 or any
//! S3-compatible endpoint.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod archive;
pub mod cancel;
pub mod config;
pub mod error;
pub mod exclude;
pub mod io;
pub mod listing;
pub mod report;
pub mod store;
pub mod traversal;

pub use archive::ArchiveSummary;
pub use archive::ArchiveWriter;
pub use cancel::CancellationToken;
pub use config::ArchiveConfig;
pub use config::ForbiddenPolicy;
pub use error::ArchiveError;
pub use error::Result;
pub use exclude::ExclusionMatcher;
pub use exclude::ExclusionRule;
pub use report::ArchiveReport;
pub use report::NoopProgress;
pub use report::ProgressCallback;
pub use report::SkipReason;
pub use store::ListingPage;
pub use store::ListingRequest;
pub use store::MemoryStore;
pub use store::ObjectStore;
pub use store::StoreError;
pub use store::StoredObject;
pub use traversal::ArchiveProducer;
pub use traversal::produce_archive;

#[cfg(feature = "s3")]
pub use store::S3Settings;
#[cfg(feature = "s3")]
pub use store::S3Store;
