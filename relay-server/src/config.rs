//! Process configuration, read once from the environment at startup.
//!
//! | Variable              | Meaning                                   | Default      |
//! |-----------------------|-------------------------------------------|--------------|
//! | `MINIO_ENDPOINT`      | object store `host:port`                  | required     |
//! | `MINIO_ACCESS_KEY`    | access key                                | empty        |
//! | `MINIO_SECRET_KEY`    | secret key                                | empty        |
//! | `MINIO_USESSL`        | talk HTTPS to the store                   | `false`      |
//! | `MINIO_BUCKET`        | bucket holding uploads                    | required     |
//! | `MINIO_REGION`        | signing region                            | `us-east-1`  |
//! | `RELAY_TRANSCODE`     | normalize uploads before storing          | `true`       |
//! | `RELAY_MAX_UPLOAD_MB` | request body limit for `/upload`          | `32`         |

use std::str::FromStr;

use anyhow::{Context, Result};
use relay_blob::{parse_bool_flag, RetryPolicy, S3Config};

/// The HTTP listener address is not configurable
pub const LISTEN_ADDR: &str = "0.0.0.0:8080";

struct RelayDefaults;

impl RelayDefaults {
    const TRANSCODE: bool = true;
    const MAX_UPLOAD_MB: usize = 32;
}

/// `Debug` goes through `S3Config`'s, which hides the secret key
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub storage: S3Config,
    /// Whether uploads go through the image transcoder
    pub transcode: bool,
    pub max_upload_bytes: usize,
    pub retry: RetryPolicy,
}

impl RelayConfig {
    pub fn new(storage: S3Config) -> Self {
        Self {
            storage,
            transcode: RelayDefaults::TRANSCODE,
            max_upload_bytes: RelayDefaults::MAX_UPLOAD_MB * 1024 * 1024,
            retry: RetryPolicy::default(),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = S3Config::from_lookup(&lookup).context("invalid object store configuration")?;

        let transcode = lookup("RELAY_TRANSCODE")
            .and_then(|v| parse_bool_flag(&v))
            .unwrap_or(RelayDefaults::TRANSCODE);
        let max_upload_mb = var_or(&lookup, "RELAY_MAX_UPLOAD_MB", RelayDefaults::MAX_UPLOAD_MB).max(1);

        Ok(Self {
            transcode,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            ..Self::new(storage)
        })
    }
}

fn var_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
