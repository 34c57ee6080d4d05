//! Poster recompression
//!
//! Any decodable upstream image (PNG, JPEG, GIF, WebP) is flattened to RGB
//! and re-encoded as a baseline JPEG at a fixed quality.

use bytes::Bytes;
use image::{DynamicImage, codecs::jpeg::JpegEncoder, imageops::FilterType};
use tracing::trace;

use crate::config::TransformConfig;
use crate::errors::TransformError;

/// Content type of every transformed poster.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Stateless raw-bytes-to-JPEG transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageTransformer {
    jpeg_quality: u8,
    max_dimension: Option<u32>,
}

impl ImageTransformer {
    pub fn new(jpeg_quality: u8, max_dimension: Option<u32>) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
            max_dimension,
        }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(config.jpeg_quality, config.max_dimension)
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Decode `raw`, optionally downscale, and encode as JPEG.
    pub fn transform(&self, raw: &[u8]) -> Result<Vec<u8>, TransformError> {
        let img = image::load_from_memory(raw).map_err(TransformError::Decode)?;
        let img = self.constrain(img);
        let rgb = img.to_rgb8();

        let mut jpeg_bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg_bytes, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(TransformError::Encode)?;

        trace!(
            "Transformed {}x{} image: {} -> {} bytes at quality {}",
            rgb.width(),
            rgb.height(),
            raw.len(),
            jpeg_bytes.len(),
            self.jpeg_quality
        );
        Ok(jpeg_bytes)
    }

    /// Run [`Self::transform`] on the blocking pool.
    pub async fn transform_blocking(&self, raw: Bytes) -> Result<Vec<u8>, TransformError> {
        let transformer = *self;
        tokio::task::spawn_blocking(move || transformer.transform(&raw))
            .await
            .map_err(|e| TransformError::Worker {
                message: e.to_string(),
            })?
    }

    fn constrain(&self, img: DynamicImage) -> DynamicImage {
        match self.max_dimension {
            Some(max) if img.width() > max || img.height() > max => {
                img.resize(max, max, FilterType::Lanczos3)
            }
            _ => img,
        }
    }
}

impl Default for ImageTransformer {
    fn default() -> Self {
        Self::from_config(&TransformConfig::default())
    }
}
