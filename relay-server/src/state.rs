use std::sync::Arc;

use relay_blob::BlobStore;

use crate::keys::KeyGenerator;
use crate::transcode::{ImageTranscoder, Transcoder};
use crate::RelayConfig;

/// Read-only handles shared by every request handler.
///
/// Built once at startup; cloning only bumps reference counts.
#[derive(Clone)]
pub struct RelayState {
    pub store: Arc<dyn BlobStore>,
    /// `None` stores uploads exactly as received
    pub transcoder: Option<Arc<dyn Transcoder>>,
    /// Send `Cache-Control`/`ETag`/`Last-Modified` and answer conditional GETs
    pub cache_validation: bool,
    pub keys: Arc<KeyGenerator>,
}

impl RelayState {
    /// Pass-through relay: no transcoding, no cache validation
    pub fn new<S: BlobStore + 'static>(store: S) -> Self {
        Self {
            store: Arc::new(store),
            transcoder: None,
            cache_validation: false,
            keys: Arc::new(KeyGenerator::new()),
        }
    }

    /// Normalize uploads with `transcoder`. Normalized images are immutable
    /// under their key, so cache validation is switched on with it.
    pub fn with_transcoder<T: Transcoder + 'static>(mut self, transcoder: T) -> Self {
        self.transcoder = Some(Arc::new(transcoder));
        self.cache_validation = true;
        self
    }

    pub fn from_config<S: BlobStore + 'static>(store: S, config: &RelayConfig) -> Self {
        let state = Self::new(store);
        if config.transcode {
            state.with_transcoder(ImageTranscoder::new())
        } else {
            state
        }
    }
}
