use std::future::Future;

use anyhow::{Context, Result};
use relay_blob::{connect_with_retry, ensure_bucket, BlobResult, BlobStore};

use crate::config::{RelayConfig, LISTEN_ADDR};
use crate::{RelayApp, RelayState};

/// Connect to the store and make sure the bucket exists.
///
/// Runs once before the listener is bound. Any error here is fatal: the
/// caller is expected to exit instead of serving traffic.
pub async fn bootstrap<S, F, Fut>(config: &RelayConfig, connector: F) -> Result<RelayState>
where
    S: BlobStore + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = BlobResult<S>>,
{
    let store = connect_with_retry(&config.retry, connector)
        .await
        .context("could not connect to object store")?;

    ensure_bucket(&store)
        .await
        .with_context(|| format!("could not prepare bucket {}", store.bucket()))?;

    tracing::info!(
        bucket = store.bucket(),
        transcode = config.transcode,
        "object store ready"
    );

    Ok(RelayState::from_config(store, config))
}

/// Bind the fixed listener address and serve until the process stops
pub async fn serve(state: RelayState, config: &RelayConfig) -> Result<()> {
    RelayApp::new(state, config.max_upload_bytes)
        .listen(LISTEN_ADDR)
        .await
}
