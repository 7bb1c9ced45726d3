//! List command implementation

use super::Session;
use super::validate_source;
use crate::cli::ListArgs;
use crate::error::add_bucket_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use s3zip_core::ArchiveProducer;

pub fn execute(args: &ListArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let config = args.source.archive_config();
    let settings = validate_source(&args.source, &config)?;

    let session = Session::connect(&settings, &config.bucket)?;
    let producer = add_bucket_context(ArchiveProducer::new(session.store(), &config), &config.bucket)?
        .with_cancellation(session.cancellation());

    let entries = add_bucket_context(producer.plan(), &config.bucket)?;
    formatter.format_plan(&config.bucket, producer.root_prefix(), &entries)?;

    Ok(())
}
