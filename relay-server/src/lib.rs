//! relay-server: an HTTP relay that stores uploaded images in an
//! S3-compatible bucket and serves them back by key.
//!
//! Routes:
//!
//! - `GET /` upload form
//! - `POST /upload` multipart field `image` → `{"url": "/uploads/<key>"}`
//! - `GET /uploads/{filename}` stored bytes, with cache validation when transcoding
//! - `GET /health`

mod app;
pub mod cache;
pub mod config;
mod error;
pub mod handlers;
pub mod keys;
mod startup;
mod state;
pub mod transcode;

pub use app::RelayApp;
pub use config::{RelayConfig, LISTEN_ADDR};
pub use error::RelayError;
pub use keys::KeyGenerator;
pub use startup::{bootstrap, serve};
pub use state::RelayState;
pub use transcode::{EncodePolicy, ImageTranscoder, Transcoder};
