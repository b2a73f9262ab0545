use std::future::Future;
use std::time::Duration;

use crate::{BlobError, BlobResult, BlobStore};

/// Bounded retry policy for establishing the first connection to a store
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Upper bound on each liveness probe
    pub attempt_timeout: Duration,
    /// Fixed pause between a failed attempt and the next one
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            attempt_timeout: Duration::from_secs(2),
            backoff: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Build a store with `connector` and prove it answers, retrying per `policy`.
///
/// Every attempt constructs a fresh store and probes it with
/// [`BlobStore::ping`] under `attempt_timeout`. When all attempts fail the
/// last error is returned inside [`BlobError::ConnectExhausted`].
pub async fn connect_with_retry<S, F, Fut>(policy: &RetryPolicy, mut connector: F) -> BlobResult<S>
where
    S: BlobStore,
    F: FnMut() -> Fut,
    Fut: Future<Output = BlobResult<S>>,
{
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match attempt_once(policy, &mut connector).await {
            Ok(store) => {
                tracing::info!(attempt, bucket = store.bucket(), "connected to object store");
                return Ok(store);
            }
            Err(err) => {
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    retry_in_ms = policy.backoff.as_millis() as u64,
                    error = %err,
                    "failed to connect to object store"
                );
                last_error = Some(err);
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    let last = last_error.unwrap_or_else(|| BlobError::invalid("retry policy allows no attempts"));
    Err(BlobError::ConnectExhausted {
        attempts: policy.max_attempts,
        last: Box::new(last),
    })
}

async fn attempt_once<S, F, Fut>(policy: &RetryPolicy, connector: &mut F) -> BlobResult<S>
where
    S: BlobStore,
    F: FnMut() -> Fut,
    Fut: Future<Output = BlobResult<S>>,
{
    let store = connector().await?;

    match tokio::time::timeout(policy.attempt_timeout, store.ping()).await {
        Ok(Ok(())) => Ok(store),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(BlobError::Timeout {
            timeout_ms: policy.attempt_timeout.as_millis() as u64,
        }),
    }
}

/// Make sure the store's bucket exists, creating it when absent.
///
/// Returns `true` if the bucket had to be created.
pub async fn ensure_bucket<S>(store: &S) -> BlobResult<bool>
where
    S: BlobStore + ?Sized,
{
    if store.bucket_exists().await? {
        tracing::debug!(bucket = store.bucket(), "bucket already exists");
        return Ok(false);
    }

    store.create_bucket().await?;
    tracing::info!(bucket = store.bucket(), "created bucket");
    Ok(true)
}
