use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use bytes::Bytes;
use tokio_util::io::ReaderStream;

use crate::{BlobError, BlobResult, BlobStore, GetResult, ObjectHead, PutResult};

const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for an S3-compatible endpoint (MinIO, RustFS, AWS)
#[derive(Clone)]
pub struct S3Config {
    /// `host:port`, without scheme
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub use_ssl: bool,
    pub bucket: String,
    pub region: String,
}

impl S3Config {
    /// Read `MINIO_*` variables from the process environment
    pub fn from_env() -> BlobResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` is this over `std::env::var`
    pub fn from_lookup<F>(lookup: F) -> BlobResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| BlobError::invalid(format!("{} environment variable required", key)))
        };

        Ok(Self {
            endpoint: required("MINIO_ENDPOINT")?,
            access_key: lookup("MINIO_ACCESS_KEY").unwrap_or_default(),
            secret_key: lookup("MINIO_SECRET_KEY").unwrap_or_default(),
            use_ssl: lookup("MINIO_USESSL")
                .and_then(|v| parse_bool_flag(&v))
                .unwrap_or(false),
            bucket: required("MINIO_BUCKET")?,
            region: lookup("MINIO_REGION")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        })
    }

    /// Full endpoint URL with the scheme implied by `use_ssl`
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("use_ssl", &self.use_ssl)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// Parse the boolean spellings accepted for flags such as `MINIO_USESSL`.
///
/// Returns `None` for anything unrecognized so callers pick their own default.
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Production store implementation using the AWS SDK (S3-compatible)
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    bucket: String,
}

impl S3CompatibleStore {
    /// Build a client. No request is sent; use `ping` to prove connectivity.
    pub async fn new(config: S3Config) -> BlobResult<Self> {
        if config.bucket.is_empty() {
            return Err(BlobError::invalid("bucket name must not be empty"));
        }
        let bucket = config.bucket.clone();
        let client = Self::create_client(config).await;
        Ok(Self { client, bucket })
    }

    async fn create_client(config: S3Config) -> Client {
        let endpoint_url = config.endpoint_url();
        let credentials = Credentials::new(
            config.access_key,
            config.secret_key,
            None,
            None,
            "relay-static",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .endpoint_url(endpoint_url)
            .load()
            .await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(true) // MinIO serves buckets by path, not subdomain
                .build(),
        )
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> BlobError {
        BlobError::backend(err)
    }
}

#[async_trait]
impl BlobStore for S3CompatibleStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ping(&self) -> BlobResult<()> {
        self.client
            .list_buckets()
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn bucket_exists(&self) -> BlobResult<bool> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(Self::map_aws_error(err)),
        }
    }

    async fn create_bucket(&self) -> BlobResult<()> {
        self.client
            .create_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> BlobResult<PutResult> {
        let size_bytes = data.len() as u64;

        let result = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(Self::map_aws_error)?;

        Ok(PutResult {
            etag: result.e_tag,
            size_bytes,
        })
    }

    async fn get(&self, key: &str) -> BlobResult<GetResult> {
        let result = match self.client.get_object().bucket(&self.bucket).key(key).send().await {
            Ok(result) => result,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Err(BlobError::not_found(key));
            }
            Err(err) => return Err(Self::map_aws_error(err)),
        };

        let stream = ReaderStream::new(result.body.into_async_read());

        Ok(GetResult {
            stream: Box::pin(stream),
            size_bytes: result.content_length.unwrap_or(0).max(0) as u64,
            content_type: result.content_type,
            etag: result.e_tag,
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let result = match self.client.head_object().bucket(&self.bucket).key(key).send().await {
            Ok(result) => result,
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
                return Err(BlobError::not_found(key));
            }
            Err(err) => return Err(Self::map_aws_error(err)),
        };

        Ok(ObjectHead {
            size_bytes: result.content_length.unwrap_or(0).max(0) as u64,
            content_type: result.content_type,
            etag: result.e_tag,
            last_modified: result
                .last_modified
                .and_then(|dt| chrono::DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
        })
    }
}
