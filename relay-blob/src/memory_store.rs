use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{BlobError, BlobResult, BlobStore, GetResult, ObjectHead, PutResult};

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct Inner {
    bucket_created: bool,
    objects: HashMap<String, StoredObject>,
}

/// In-process blob store. Clones share the same objects.
#[derive(Clone)]
pub struct MemoryBlobStore {
    bucket: String,
    inner: Arc<RwLock<Inner>>,
}

impl MemoryBlobStore {
    pub fn new<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// A store whose bucket already exists
    pub fn with_bucket<S: Into<String>>(bucket: S) -> Self {
        Self {
            bucket: bucket.into(),
            inner: Arc::new(RwLock::new(Inner {
                bucket_created: true,
                ..Inner::default()
            })),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.objects.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn require_bucket(&self) -> BlobResult<()> {
        if self.inner.read().await.bucket_created {
            Ok(())
        } else {
            Err(BlobError::invalid(format!("bucket {} does not exist", self.bucket)))
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn ping(&self) -> BlobResult<()> {
        Ok(())
    }

    async fn bucket_exists(&self) -> BlobResult<bool> {
        Ok(self.inner.read().await.bucket_created)
    }

    async fn create_bucket(&self) -> BlobResult<()> {
        self.inner.write().await.bucket_created = true;
        Ok(())
    }

    async fn put(&self, key: &str, content_type: &str, data: Bytes) -> BlobResult<PutResult> {
        self.require_bucket().await?;

        let etag = format!("\"{}\"", uuid::Uuid::new_v4().simple());
        let size_bytes = data.len() as u64;
        let object = StoredObject {
            data,
            content_type: content_type.to_string(),
            etag: etag.clone(),
            // Object stores report modification times at second precision
            last_modified: Utc::now().trunc_subsecs(0),
        };

        self.inner.write().await.objects.insert(key.to_string(), object);

        Ok(PutResult {
            etag: Some(etag),
            size_bytes,
        })
    }

    async fn get(&self, key: &str) -> BlobResult<GetResult> {
        let object = self
            .inner
            .read()
            .await
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::not_found(key))?;

        let size_bytes = object.data.len() as u64;
        let data = object.data;
        let stream = futures::stream::once(async move { Ok::<_, std::io::Error>(data) });

        Ok(GetResult {
            stream: Box::pin(stream),
            size_bytes,
            content_type: Some(object.content_type),
            etag: Some(object.etag),
        })
    }

    async fn head(&self, key: &str) -> BlobResult<ObjectHead> {
        let inner = self.inner.read().await;
        let object = inner.objects.get(key).ok_or_else(|| BlobError::not_found(key))?;

        Ok(ObjectHead {
            size_bytes: object.data.len() as u64,
            content_type: Some(object.content_type.clone()),
            etag: Some(object.etag.clone()),
            last_modified: Some(object.last_modified),
        })
    }
}
