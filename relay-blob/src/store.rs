use async_trait::async_trait;
use bytes::Bytes;

use crate::{BlobResult, GetResult, ObjectHead, PutResult};

/// Core blob storage operations - must be implemented by all storage backends.
///
/// A store is bound to a single bucket when it is constructed. Every call
/// addresses objects inside that bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Name of the bucket this store writes to
    fn bucket(&self) -> &str;

    /// Cheap round trip proving the backend is reachable
    async fn ping(&self) -> BlobResult<()>;

    async fn bucket_exists(&self) -> BlobResult<bool>;

    async fn create_bucket(&self) -> BlobResult<()>;

    /// Store a blob under `key`, tagged with `content_type`
    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> BlobResult<PutResult>;

    /// Open a blob for streaming. Missing keys are `BlobError::NotFound`.
    async fn get(&self, key: &str) -> BlobResult<GetResult>;

    /// Get blob metadata without content
    async fn head(&self, key: &str) -> BlobResult<ObjectHead>;
}
