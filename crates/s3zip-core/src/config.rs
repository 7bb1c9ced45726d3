//! Configuration for archive production.

use crate::ArchiveError;
use crate::Result;

/// Delimiter used to group keys into virtual folders.
pub const DELIMITER: &str = "/";

/// Default name of the produced archive.
pub const DEFAULT_ARCHIVE_NAME: &str = "archive.zip";

/// What to do when listing a prefix below the root is denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ForbiddenPolicy {
    /// Treat the prefix as an empty subtree and continue.
    #[default]
    Skip,
    /// Abort archive production.
    Fail,
}

/// Configuration for one archive-production call.
///
/// Built once with the `with_*` methods, validated, then borrowed immutably
/// for the whole traversal.
///
/// # Examples
///
/// ```
/// use s3zip_core::ArchiveConfig;
///
/// let config = ArchiveConfig::new("my-bucket")
///     .with_prefix("reports/2024")
///     .with_exclude_patterns(vec![r"\.tmp$".to_string()])
///     .with_compression_level(0);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.root_prefix(), "reports/2024/");
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Bucket holding the objects.
    ///
    /// Required. An empty bucket is a configuration error.
    pub bucket: String,

    /// Root prefix to archive.
    ///
    /// Empty means the whole bucket. A non-empty prefix without a trailing
    /// `/` is treated as a folder (see [`ArchiveConfig::root_prefix`]).
    ///
    /// Default: `""`.
    pub prefix: String,

    /// Ordered regular expressions; paths matching any of them are skipped.
    ///
    /// Patterns are matched anywhere in the full key or prefix. The first
    /// matching pattern wins.
    ///
    /// Default: empty.
    pub exclude_patterns: Vec<String>,

    /// Name of the produced archive as presented to the consumer.
    ///
    /// Default: `"archive.zip"`.
    pub archive_name: String,

    /// Compression level.
    ///
    /// `Some(0)` or `None` stores entries uncompressed, 1-9 selects deflate.
    ///
    /// Default: `Some(6)`.
    pub compression_level: Option<u8>,

    /// Handling of denied listings below the root.
    ///
    /// Default: [`ForbiddenPolicy::Skip`].
    pub forbidden_policy: ForbiddenPolicy,

    /// Name entries relative to the root prefix instead of by full key.
    ///
    /// Default: `false`.
    pub strip_root: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: String::new(),
            exclude_patterns: Vec::new(),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
            compression_level: Some(6),
            forbidden_policy: ForbiddenPolicy::Skip,
            strip_root: false,
        }
    }
}

impl ArchiveConfig {
    /// Creates a configuration for the given bucket with default settings.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Sets the root prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the exclusion patterns, replacing any previous ones.
    #[must_use]
    pub fn with_exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    /// Sets the archive name.
    #[must_use]
    pub fn with_archive_name(mut self, name: impl Into<String>) -> Self {
        self.archive_name = name.into();
        self
    }

    /// Sets the compression level (0 = stored, 1-9 = deflate).
    ///
    /// Out-of-range levels are reported by [`ArchiveConfig::validate`].
    #[must_use]
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Sets the policy for denied listings below the root.
    #[must_use]
    pub fn with_forbidden_policy(mut self, policy: ForbiddenPolicy) -> Self {
        self.forbidden_policy = policy;
        self
    }

    /// Sets whether entry names are relative to the root prefix.
    #[must_use]
    pub fn with_strip_root(mut self, strip: bool) -> Self {
        self.strip_root = strip;
        self
    }

    /// Returns the root prefix as listed against the store.
    ///
    /// A non-empty prefix always ends with the delimiter, so `"photos"`
    /// lists the folder `photos/` and never the sibling `photos-old/`.
    ///
    /// # Examples
    ///
    /// ```
    /// use s3zip_core::ArchiveConfig;
    ///
    /// assert_eq!(ArchiveConfig::new("b").root_prefix(), "");
    /// assert_eq!(ArchiveConfig::new("b").with_prefix("a").root_prefix(), "a/");
    /// assert_eq!(ArchiveConfig::new("b").with_prefix("a/").root_prefix(), "a/");
    /// ```
    #[must_use]
    pub fn root_prefix(&self) -> String {
        if self.prefix.is_empty() || self.prefix.ends_with(DELIMITER) {
            self.prefix.clone()
        } else {
            format!("{}{DELIMITER}", self.prefix)
        }
    }

    /// Returns `true` when entries are stored without compression.
    #[must_use]
    pub fn is_stored(&self) -> bool {
        matches!(self.compression_level, None | Some(0))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Configuration`] if:
    /// - the bucket is empty
    /// - the archive name is empty or contains a path separator
    /// - the compression level is above 9
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(config_error("bucket identifier is required"));
        }

        if self.archive_name.trim().is_empty() {
            return Err(config_error("archive name must not be empty"));
        }

        if self.archive_name.contains(['/', '\\']) {
            return Err(config_error(format!(
                "archive name '{}' must not contain path separators",
                self.archive_name
            )));
        }

        if let Some(level) = self.compression_level
            && level > 9
        {
            return Err(config_error(format!(
                "compression level must be 0-9, got {level}"
            )));
        }

        Ok(())
    }
}

fn config_error(reason: impl Into<String>) -> ArchiveError {
    ArchiveError::Configuration {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArchiveConfig::default();
        assert!(config.bucket.is_empty());
        assert!(config.prefix.is_empty());
        assert!(config.exclude_patterns.is_empty());
        assert_eq!(config.archive_name, "archive.zip");
        assert_eq!(config.compression_level, Some(6));
        assert_eq!(config.forbidden_policy, ForbiddenPolicy::Skip);
        assert!(!config.strip_root);
    }

    #[test]
    fn test_builder_pattern() {
        let config = ArchiveConfig::new("bucket")
            .with_prefix("data")
            .with_exclude_patterns(vec!["^tmp/".into()])
            .with_archive_name("data.zip")
            .with_compression_level(9)
            .with_forbidden_policy(ForbiddenPolicy::Fail)
            .with_strip_root(true);

        assert_eq!(config.bucket, "bucket");
        assert_eq!(config.prefix, "data");
        assert_eq!(config.exclude_patterns, vec!["^tmp/".to_string()]);
        assert_eq!(config.archive_name, "data.zip");
        assert_eq!(config.compression_level, Some(9));
        assert_eq!(config.forbidden_policy, ForbiddenPolicy::Fail);
        assert!(config.strip_root);
    }

    #[test]
    fn test_validate_missing_bucket() {
        let err = ArchiveConfig::default().validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("bucket"));

        let err = ArchiveConfig::new("   ").validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validate_archive_name() {
        let err = ArchiveConfig::new("b")
            .with_archive_name("")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("archive name"));

        let err = ArchiveConfig::new("b")
            .with_archive_name("../evil.zip")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("path separators"));
    }

    #[test]
    fn test_validate_compression_level() {
        assert!(
            ArchiveConfig::new("b")
                .with_compression_level(0)
                .validate()
                .is_ok()
        );
        assert!(
            ArchiveConfig::new("b")
                .with_compression_level(9)
                .validate()
                .is_ok()
        );
        let err = ArchiveConfig::new("b")
            .with_compression_level(10)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("0-9"));
    }

    #[test]
    fn test_root_prefix_normalization() {
        assert_eq!(ArchiveConfig::new("b").root_prefix(), "");
        assert_eq!(
            ArchiveConfig::new("b").with_prefix("photos").root_prefix(),
            "photos/"
        );
        assert_eq!(
            ArchiveConfig::new("b").with_prefix("photos/2024/").root_prefix(),
            "photos/2024/"
        );
    }

    #[test]
    fn test_is_stored() {
        assert!(!ArchiveConfig::new("b").is_stored());
        assert!(ArchiveConfig::new("b").with_compression_level(0).is_stored());

        let mut config = ArchiveConfig::new("b");
        config.compression_level = None;
        assert!(config.is_stored());
    }
}
