//! Error types for archive production.

use crate::store::StoreError;
use thiserror::Error;

/// Result type alias using `ArchiveError`.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that abort archive production.
///
/// Conditions that only affect a single object or a subtree below the root
/// (unavailable objects, forbidden child prefixes under
/// [`ForbiddenPolicy::Skip`](crate::ForbiddenPolicy::Skip), failed child
/// listings) are not errors: they are recorded in the
/// [`ArchiveReport`](crate::ArchiveReport) and traversal continues.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {reason}")]
    Configuration {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// An exclusion pattern is not a valid regular expression.
    #[error("invalid exclusion pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// The root prefix matches no object and no folder.
    #[error("prefix '{prefix}' does not exist in bucket '{bucket}'")]
    InvalidPrefix {
        /// Bucket that was listed.
        bucket: String,
        /// Root prefix that was listed.
        prefix: String,
    },

    /// Listing a prefix was denied by the storage service.
    #[error("access denied while listing '{prefix}'")]
    Forbidden {
        /// Prefix whose listing was denied.
        prefix: String,
    },

    /// Listing the root prefix failed.
    #[error("failed to list '{prefix}': {source}")]
    Listing {
        /// Prefix whose listing failed.
        prefix: String,
        /// Underlying storage error.
        #[source]
        source: StoreError,
    },

    /// The output sink failed; the archive is incomplete.
    #[error("output sink failed: {0}")]
    Sink(#[source] std::io::Error),

    /// An object stream failed after its entry had started.
    #[error("object '{key}' failed mid-stream: {source}")]
    EntryInterrupted {
        /// Key of the interrupted object.
        key: String,
        /// Read error from the object stream.
        #[source]
        source: std::io::Error,
    },

    /// The ZIP encoder rejected an operation.
    #[error("archive encoder error: {0}")]
    Encoder(#[from] zip::result::ZipError),

    /// Production was cancelled by the caller.
    #[error("archive production cancelled")]
    Cancelled,
}

impl ArchiveError {
    /// Returns `true` if this error was raised by configuration validation.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3zip_core::ArchiveError;
    ///
    /// let err = ArchiveError::Configuration {
    ///     reason: "bucket is required".into(),
    /// };
    /// assert!(err.is_configuration());
    /// assert!(!ArchiveError::Cancelled.is_configuration());
    /// ```
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::InvalidPattern { .. }
        )
    }

    /// Returns `true` if this error is always raised before any archive
    /// byte reaches the sink.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3zip_core::ArchiveError;
    ///
    /// let err = ArchiveError::InvalidPrefix {
    ///     bucket: "b".into(),
    ///     prefix: "missing/".into(),
    /// };
    /// assert!(err.is_fatal_before_output());
    ///
    /// let err = ArchiveError::Sink(std::io::Error::other("closed"));
    /// assert!(!err.is_fatal_before_output());
    /// ```
    #[must_use]
    pub const fn is_fatal_before_output(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::InvalidPattern { .. }
                | Self::InvalidPrefix { .. }
                | Self::Listing { .. }
        )
    }

    /// Returns the object key or prefix this error refers to, if any.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        match self {
            Self::InvalidPrefix { prefix, .. }
            | Self::Forbidden { prefix }
            | Self::Listing { prefix, .. } => Some(prefix),
            Self::EntryInterrupted { key, .. } => Some(key),
            _ => None,
        }
    }
}
