//! AWS S3 backend.
//!
//! The SDK is async; the traversal engine is not. `S3Store` drives every
//! request through a Tokio runtime handle with `block_on`, so it must be used
//! from a thread that is not itself running inside that runtime (the CLI
//! main thread, or a `spawn_blocking` task).

use super::ListingPage;
use super::ListingRequest;
use super::ObjectStore;
use super::StoreError;
use super::StoredObject;
use crate::ArchiveError;
use crate::Result;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Buf;
use bytes::Bytes;
use chrono::DateTime;
use std::io::Read;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(300);

/// Connection settings for [`S3Store`].
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// AWS region; falls back to the SDK's default provider chain.
    pub region: Option<String>,

    /// Custom endpoint URL (MinIO, LocalStack). Forces path-style access.
    pub endpoint: Option<String>,

    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,

    /// Explicit access key; requires `secret_key`.
    pub access_key: Option<String>,

    /// Explicit secret key; requires `access_key`.
    pub secret_key: Option<String>,

    /// Timeout in seconds for each request, and for each wait on the next
    /// chunk of an object body.
    pub timeout_secs: u64,

    /// Maximum keys plus prefixes per listing page (1-1000).
    pub max_keys: Option<i32>,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: None,
            endpoint: None,
            profile: None,
            access_key: None,
            secret_key: None,
            timeout_secs: 300,
            max_keys: None,
        }
    }
}

impl S3Settings {
    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sets a custom endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the profile name.
    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Sets explicit static credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Sets the operation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the listing page size.
    #[must_use]
    pub fn with_max_keys(mut self, max_keys: i32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Configuration`] if:
    /// - only one of access key and secret key is set
    /// - the region is set but empty
    /// - the timeout is zero
    /// - `max_keys` is outside 1-1000
    pub fn validate(&self) -> Result<()> {
        match (&self.access_key, &self.secret_key) {
            (Some(_), None) => return Err(settings_error("access key given without secret key")),
            (None, Some(_)) => return Err(settings_error("secret key given without access key")),
            _ => {}
        }

        if self.region.as_deref().is_some_and(|r| r.trim().is_empty()) {
            return Err(settings_error("region must not be empty"));
        }

        if self.timeout_secs == 0 {
            return Err(settings_error("timeout must be at least one second"));
        }

        if let Some(max_keys) = self.max_keys
            && !(1..=1000).contains(&max_keys)
        {
            return Err(settings_error(format!(
                "page size must be 1-1000, got {max_keys}"
            )));
        }

        Ok(())
    }
}

fn settings_error(reason: impl Into<String>) -> ArchiveError {
    ArchiveError::Configuration {
        reason: reason.into(),
    }
}

/// [`ObjectStore`] backed by AWS S3.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    handle: Handle,
    max_keys: Option<i32>,
    read_timeout: Duration,
}

impl S3Store {
    /// Loads the AWS configuration and builds a client.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Configuration`] if the settings are invalid.
    pub fn connect(settings: &S3Settings, handle: Handle) -> Result<Self> {
        settings.validate()?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(Duration::from_secs(settings.timeout_secs))
                .build(),
        );

        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key), Some(secret_key)) = (&settings.access_key, &settings.secret_key) {
            let credentials =
                aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "s3zip");
            loader = loader.credentials_provider(credentials);
        }

        if let Some(profile) = &settings.profile {
            loader = loader.profile_name(profile);
        }

        let sdk_config = handle.block_on(loader.load());

        let builder = aws_sdk_s3::config::Builder::from(&sdk_config);
        let s3_config = if settings.endpoint.is_some() {
            builder.force_path_style(true).build()
        } else {
            builder.build()
        };

        Ok(Self::from_client(Client::from_conf(s3_config), handle)
            .with_max_keys(settings.max_keys)
            .with_read_timeout(Duration::from_secs(settings.timeout_secs)))
    }

    /// Wraps an existing client.
    ///
    /// The runtime behind `handle` must have its time driver enabled; body
    /// reads are bounded by a timer.
    pub fn from_client(client: Client, handle: Handle) -> Self {
        Self {
            client,
            handle,
            max_keys: None,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    fn with_max_keys(mut self, max_keys: Option<i32>) -> Self {
        self.max_keys = max_keys;
        self
    }

    /// Sets how long a body read may wait for its next chunk.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }
}

impl ObjectStore for S3Store {
    fn list_page(&self, request: &ListingRequest) -> std::result::Result<ListingPage, StoreError> {
        debug!(
            bucket = %request.bucket,
            prefix = %request.prefix,
            continued = request.continuation_token.is_some(),
            "ListObjectsV2"
        );

        let resp = self
            .handle
            .block_on(
                self.client
                    .list_objects_v2()
                    .bucket(&request.bucket)
                    .prefix(&request.prefix)
                    .delimiter(&request.delimiter)
                    .set_continuation_token(request.continuation_token.clone())
                    .set_max_keys(self.max_keys)
                    .send(),
            )
            .map_err(|e| classify(&e, &request.prefix))?;

        let object_keys = resp
            .contents()
            .iter()
            .filter_map(|obj| obj.key())
            .map(str::to_string)
            .collect();

        let child_prefixes = resp
            .common_prefixes()
            .iter()
            .filter_map(|p| p.prefix())
            .map(str::to_string)
            .collect();

        let next_token = if resp.is_truncated() == Some(true) {
            resp.next_continuation_token().map(str::to_string)
        } else {
            None
        };

        Ok(ListingPage {
            object_keys,
            child_prefixes,
            next_token,
        })
    }

    fn open(&self, bucket: &str, key: &str) -> std::result::Result<StoredObject, StoreError> {
        debug!(bucket, key, "GetObject");

        let resp = self
            .handle
            .block_on(self.client.get_object().bucket(bucket).key(key).send())
            .map_err(|e| classify(&e, key))?;

        let content_length = resp.content_length().and_then(|len| u64::try_from(len).ok());
        let last_modified = resp
            .last_modified()
            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos()));

        let mut object = StoredObject::new(BlockingBody {
            body: resp.body,
            chunk: Bytes::new(),
            handle: self.handle.clone(),
            read_timeout: self.read_timeout,
        });
        object.content_length = content_length;
        object.last_modified = last_modified;
        Ok(object)
    }
}

/// Maps an SDK failure onto the store error taxonomy by HTTP status.
fn classify<E>(err: &SdkError<E>, resource: &str) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err.raw_response().map(|r| r.status().as_u16()) {
        Some(403) => StoreError::Forbidden {
            resource: resource.to_string(),
        },
        Some(404) => StoreError::NotFound {
            resource: resource.to_string(),
        },
        _ => StoreError::Service {
            message: DisplayErrorContext(err).to_string(),
        },
    }
}

/// Synchronous reader over an SDK body stream, one chunk at a time.
struct BlockingBody {
    body: ByteStream,
    chunk: Bytes,
    handle: Handle,
    read_timeout: Duration,
}

impl Read for BlockingBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while !self.chunk.has_remaining() {
            match wait_for(&self.handle, self.read_timeout, self.body.next())? {
                Some(Ok(chunk)) => self.chunk = chunk,
                Some(Err(e)) => return Err(std::io::Error::other(e)),
                None => return Ok(0),
            }
        }

        let len = buf.len().min(self.chunk.remaining());
        self.chunk.copy_to_slice(&mut buf[..len]);
        Ok(len)
    }
}

/// Drives `future` to completion, failing with `TimedOut` after `limit`.
fn wait_for<F: Future>(handle: &Handle, limit: Duration, future: F) -> std::io::Result<F::Output> {
    handle
        .block_on(tokio::time::timeout(limit, future))
        .map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no body data within {}s", limit.as_secs_f64()),
            )
        })
}
