//! Create command implementation.

use super::Session;
use super::validate_source;
use crate::cli::CreateArgs;
use crate::cli::OutputTarget;
use crate::error::add_bucket_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use s3zip_core::ArchiveProducer;
use s3zip_core::NoopProgress;
use s3zip_core::ProgressCallback;
use std::fs;
use std::fs::File;
use std::io;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;
use tracing::warn;

const WRITE_BUFFER_SIZE: usize = 256 * 1024;

pub fn execute(args: &CreateArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    let config = args
        .source
        .archive_config()
        .with_archive_name(args.name.clone())
        .with_compression_level(args.compression_level);
    let settings = validate_source(&args.source, &config)?;

    let target = args.target();
    if let OutputTarget::File(path) = &target
        && path.exists()
        && !args.force
    {
        bail!(
            "Output file already exists: {}\nHINT: Use --force to overwrite.",
            path.display()
        );
    }

    let session = Session::connect(&settings, &config.bucket)?;
    let producer = add_bucket_context(ArchiveProducer::new(session.store(), &config), &config.bucket)?
        .with_cancellation(session.cancellation());

    let mut progress: Box<dyn ProgressCallback> = if !quiet && CliProgress::should_show() {
        Box::new(CliProgress::new("Archiving"))
    } else {
        Box::new(NoopProgress)
    };

    let result = match &target {
        OutputTarget::Stdout => {
            let sink = BufWriter::with_capacity(WRITE_BUFFER_SIZE, io::stdout().lock());
            producer.produce_stream_with_progress(sink, progress.as_mut())
        }
        OutputTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create output file {}", path.display()))?;
            let result = producer
                .produce_with_progress(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file), progress.as_mut());
            if result.is_err() {
                discard_incomplete(path);
            }
            result
        }
    };
    drop(progress);

    let report = add_bucket_context(result, &config.bucket)?;

    if !report.is_complete() {
        formatter.format_warning(&format!(
            "archive is incomplete: {} objects skipped, {} folders unreadable",
            report.entries_skipped(),
            report.prefixes_forbidden + report.prefixes_failed
        ));
    }
    formatter.format_creation_result(&target, &report)?;

    Ok(())
}

/// Deletes a partial output file; returns whether it is gone.
fn discard_incomplete(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "removed incomplete archive");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "incomplete archive could not be removed");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discard_incomplete_removes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("partial.zip");
        fs::write(&path, b"PK").unwrap();

        assert!(discard_incomplete(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_discard_incomplete_reports_failure() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("subdir");
        fs::create_dir(&path).unwrap();

        assert!(!discard_incomplete(&path));
        assert!(path.exists());
    }
}
