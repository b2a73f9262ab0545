use anyhow::Result;
use relay_blob::S3CompatibleStore;
use relay_server::RelayConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::from_env()?;

    let state = relay_server::bootstrap(&config, || {
        let storage = config.storage.clone();
        async move { S3CompatibleStore::new(storage).await }
    })
    .await
    .inspect_err(|err| tracing::error!(error = %format!("{err:#}"), "startup failed"))?;

    relay_server::serve(state, &config).await
}
