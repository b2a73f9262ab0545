//! # relay-blob: object storage for the image relay
//!
//! `relay-blob` is the storage seam between the HTTP service and whatever
//! bucket actually holds the images. Handlers only ever see the
//! [`BlobStore`] trait; the concrete backend is picked once at startup.
//!
//! ## Backends
//!
//! - [`S3CompatibleStore`]: any S3 API (MinIO, RustFS, AWS) through `aws-sdk-s3`
//! - [`MemoryBlobStore`]: process-local map, for tests and local runs
//!
//! ## Startup
//!
//! ```rust,no_run
//! use relay_blob::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let config = S3Config::from_env()?;
//! let store = connect_with_retry(&RetryPolicy::default(), || {
//!     let config = config.clone();
//!     async move { S3CompatibleStore::new(config).await }
//! })
//! .await?;
//!
//! ensure_bucket(&store).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ```text
//! ┌─────────────────┐
//! │   HTTP handlers │  ← upload / serve
//! ├─────────────────┤
//! │   BlobStore     │  ← put / get / head / bucket checks
//! ├─────────────────┤
//! │  S3 │ Memory    │  ← backends
//! └─────────────────┘
//! ```

mod connect;
mod error;
mod memory_store;
mod s3_store;
pub mod store;
mod types;

pub use connect::{connect_with_retry, ensure_bucket, RetryPolicy};
pub use error::{BlobError, BlobResult};
pub use memory_store::MemoryBlobStore;
pub use s3_store::{parse_bool_flag, S3CompatibleStore, S3Config};
pub use store::BlobStore;
pub use types::{ByteStream, GetResult, ObjectHead, PutResult};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        connect_with_retry, ensure_bucket, BlobError, BlobResult, BlobStore, ByteStream,
        MemoryBlobStore, RetryPolicy, S3CompatibleStore, S3Config,
    };
}
