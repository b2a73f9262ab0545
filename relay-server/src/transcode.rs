//! Image normalization applied to uploads before they are stored.
//!
//! Uploads are decoded with whatever format their magic bytes announce,
//! shrunk so neither side exceeds [`MAX_DIMENSION`], and re-encoded with a
//! fixed [`EncodePolicy`]. PNG stays PNG; everything else becomes JPEG.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat};
use thiserror::Error;

pub const MAX_DIMENSION: u32 = 1920;
pub const JPEG_QUALITY: u8 = 85;

#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("image: {0}")]
    Decode(#[source] ImageError),

    #[error("encode {format}: {source}")]
    Encode {
        format: &'static str,
        #[source]
        source: ImageError,
    },

    #[error("image worker stopped: {0}")]
    Worker(String),
}

/// Output of a transcode: the bytes to store and how to label them
#[derive(Debug, Clone)]
pub struct Transcoded {
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// A synchronous, CPU-bound upload normalizer.
///
/// Handlers run it on the blocking pool, so implementations are free to
/// take their time.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, data: &[u8]) -> Result<Transcoded, TranscodeError>;
}

/// How a decoded image is written back out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePolicy {
    Jpeg { quality: u8 },
    /// Best compression, adaptive filtering
    Png,
}

impl EncodePolicy {
    /// Pick the output encoding for a source format. Unknown formats become JPEG.
    pub fn for_source(format: Option<ImageFormat>) -> Self {
        match format {
            Some(ImageFormat::Png) => EncodePolicy::Png,
            Some(ImageFormat::Jpeg) => EncodePolicy::Jpeg {
                quality: JPEG_QUALITY,
            },
            // default
            Some(_) | None => EncodePolicy::Jpeg {
                quality: JPEG_QUALITY,
            },
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            EncodePolicy::Jpeg { .. } => "image/jpeg",
            EncodePolicy::Png => "image/png",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            EncodePolicy::Jpeg { .. } => "jpeg",
            EncodePolicy::Png => "png",
        }
    }

    pub fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>, TranscodeError> {
        let mut buf = Vec::new();
        let result = match *self {
            EncodePolicy::Jpeg { quality } => {
                // JPEG has no alpha channel
                let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
            }
            EncodePolicy::Png => img.write_with_encoder(PngEncoder::new_with_quality(
                &mut buf,
                CompressionType::Best,
                PngFilter::Adaptive,
            )),
        };

        result.map_err(|source| TranscodeError::Encode {
            format: self.name(),
            source,
        })?;
        Ok(buf)
    }
}

/// Decode, bound, and re-encode uploads with the `image` crate
#[derive(Debug, Clone)]
pub struct ImageTranscoder {
    max_dimension: u32,
}

impl Default for ImageTranscoder {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
        }
    }
}

impl ImageTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Shrink so the larger side equals the bound; smaller images pass through
    fn bound(&self, img: DynamicImage) -> DynamicImage {
        if img.width() > self.max_dimension || img.height() > self.max_dimension {
            img.resize(self.max_dimension, self.max_dimension, FilterType::Lanczos3)
        } else {
            img
        }
    }
}

impl Transcoder for ImageTranscoder {
    fn transcode(&self, data: &[u8]) -> Result<Transcoded, TranscodeError> {
        let format = image::guess_format(data).map_err(TranscodeError::Decode)?;
        let img = image::load_from_memory_with_format(data, format).map_err(TranscodeError::Decode)?;

        let img = self.bound(img);
        let policy = EncodePolicy::for_source(Some(format));
        let encoded = policy.encode(&img)?;

        tracing::debug!(
            source = ?format,
            width = img.width(),
            height = img.height(),
            bytes = encoded.len(),
            "transcoded upload"
        );

        Ok(Transcoded {
            bytes: Bytes::from(encoded),
            content_type: policy.content_type(),
            width: img.width(),
            height: img.height(),
        })
    }
}
