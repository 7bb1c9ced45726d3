//! Error conversion utilities for CLI.
//!
//! Converts s3zip-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::Result;
use anyhow::anyhow;
use s3zip_core::ArchiveError;
use s3zip_core::StoreError;

/// Converts `ArchiveError` to user-friendly anyhow error with context
pub fn convert_archive_error(err: ArchiveError, bucket: &str) -> anyhow::Error {
    match err {
        ArchiveError::Configuration { reason } => {
            anyhow!(
                "Invalid configuration: {reason}\n\
                 HINT: Run with --help to see the required options."
            )
        }
        ArchiveError::InvalidPattern { pattern, source } => {
            anyhow!(
                "Invalid exclusion pattern '{pattern}': {source}\n\
                 HINT: Patterns are regular expressions, not globs. Escape '.' as '\\.' and use '.*' for wildcards."
            )
        }
        ArchiveError::InvalidPrefix { bucket, prefix } => {
            anyhow!(
                "Nothing to archive: prefix '{prefix}' does not exist in bucket '{bucket}'\n\
                 HINT: Check the bucket name and prefix; prefixes are case-sensitive."
            )
        }
        ArchiveError::Forbidden { prefix } => {
            anyhow!(
                "Access denied while listing '{prefix}' in bucket '{bucket}'\n\
                 HINT: The credentials need s3:ListBucket on this prefix. \
                 Without --fail-on-forbidden, denied subfolders are skipped."
            )
        }
        ArchiveError::Listing { prefix, source } => {
            let hint = match &source {
                StoreError::Service { .. } => {
                    "HINT: Check network access, the endpoint URL and --timeout."
                }
                _ => "HINT: Check the bucket name and credentials.",
            };
            anyhow!("Failed to list '{prefix}' in bucket '{bucket}': {source}\n{hint}")
        }
        ArchiveError::Sink(io_err) => {
            anyhow!(
                "Output failed: {io_err}\n\
                 HINT: The archive is incomplete. Check free disk space or whether the consumer closed the pipe."
            )
        }
        ArchiveError::EntryInterrupted { key, source } => {
            anyhow!(
                "Download of '{key}' failed mid-stream: {source}\n\
                 HINT: The archive is incomplete. Retry, or raise --timeout for large objects."
            )
        }
        ArchiveError::Cancelled => anyhow!("Archive production cancelled; output is incomplete"),
        other => anyhow::Error::from(other)
            .context(format!("Error archiving bucket '{bucket}'")),
    }
}

/// Adds context to a core result
pub fn add_bucket_context<T>(result: Result<T, ArchiveError>, bucket: &str) -> anyhow::Result<T> {
    result.map_err(|e| convert_archive_error(e, bucket))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_invalid_prefix_error() {
        let err = ArchiveError::InvalidPrefix {
            bucket: "b".into(),
            prefix: "missing/".into(),
        };
        let msg = format!("{:?}", convert_archive_error(err, "b"));
        assert!(msg.contains("missing/"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_forbidden_error() {
        let err = ArchiveError::Forbidden {
            prefix: "secret/".into(),
        };
        let msg = format!("{:?}", convert_archive_error(err, "b"));
        assert!(msg.contains("Access denied"));
        assert!(msg.contains("--fail-on-forbidden"));
    }

    #[test]
    fn test_convert_sink_error() {
        let err = ArchiveError::Sink(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe closed",
        ));
        let msg = format!("{:?}", convert_archive_error(err, "b"));
        assert!(msg.contains("Output failed"));
        assert!(msg.contains("incomplete"));
    }

    #[test]
    fn test_convert_cancelled_error() {
        let msg = convert_archive_error(ArchiveError::Cancelled, "b").to_string();
        assert!(msg.contains("cancelled"));
    }
}
