//! Subcommand implementations.

pub mod completion;
pub mod create;
pub mod list;

use crate::cli::SourceArgs;
use crate::error::add_bucket_context;
use anyhow::Context;
use anyhow::Result;
use s3zip_core::ArchiveConfig;
use s3zip_core::CancellationToken;
use s3zip_core::ExclusionMatcher;
use s3zip_core::S3Settings;
use s3zip_core::S3Store;
use tokio::runtime::Runtime;
use tracing::debug;
use tracing::warn;

/// Validates everything that does not need the network.
///
/// Runs before any connection attempt so configuration mistakes never
/// cost a round trip.
pub fn validate_source(source: &SourceArgs, config: &ArchiveConfig) -> Result<S3Settings> {
    add_bucket_context(config.validate(), &config.bucket)?;
    add_bucket_context(
        ExclusionMatcher::new(&config.exclude_patterns).map(drop),
        &config.bucket,
    )?;

    let settings = source.s3.settings();
    add_bucket_context(settings.validate(), &config.bucket)?;
    Ok(settings)
}

/// Connected storage client plus the runtime driving it.
pub struct Session {
    store: S3Store,
    cancel: CancellationToken,
    // Last field: outlives the handle held by `store`.
    _runtime: Runtime,
}

impl Session {
    /// Starts the runtime, connects to S3 and arms Ctrl-C cancellation.
    pub fn connect(settings: &S3Settings, bucket: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("s3zip-io")
            .enable_all()
            .build()
            .context("failed to start async runtime")?;

        let store = add_bucket_context(
            S3Store::connect(settings, runtime.handle().clone()),
            bucket,
        )?;
        debug!(region = ?settings.region, endpoint = ?settings.endpoint, "connected");

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, cancelling");
                token.cancel();
            }
        });

        Ok(Self {
            store,
            cancel,
            _runtime: runtime,
        })
    }

    pub const fn store(&self) -> &S3Store {
        &self.store
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
