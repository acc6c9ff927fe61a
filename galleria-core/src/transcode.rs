//! Derived image variants.
//!
//! Uploads are decoded in memory, downscaled to the configured bound and
//! re-encoded as JPEG. Nothing is staged on local disk.

use crate::error::{GalleryError, Result};
use crate::model::Quality;
use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, imageops::FilterType};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DERIVED_CONTENT_TYPE: &str = "image/jpeg";

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Produces the `Large` or `Thumbnail` rendition of `data`.
    async fn transcode(&self, data: Bytes, quality: Quality) -> Result<Bytes>;
}

pub type DynTranscoder = Arc<dyn Transcoder>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSettings {
    pub max_dimension: u32,
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeSettings {
    #[serde(default = "default_large")]
    pub large: VariantSettings,
    #[serde(default = "default_thumbnail")]
    pub thumbnail: VariantSettings,
}

fn default_large() -> VariantSettings {
    VariantSettings {
        max_dimension: 1600,
        jpeg_quality: 85,
    }
}

fn default_thumbnail() -> VariantSettings {
    VariantSettings {
        max_dimension: 320,
        jpeg_quality: 70,
    }
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            large: default_large(),
            thumbnail: default_thumbnail(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageTranscoder {
    settings: TranscodeSettings,
}

impl ImageTranscoder {
    pub fn new(settings: TranscodeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &TranscodeSettings {
        &self.settings
    }
}

#[async_trait]
impl Transcoder for ImageTranscoder {
    async fn transcode(&self, data: Bytes, quality: Quality) -> Result<Bytes> {
        let variant = match quality {
            Quality::Large => self.settings.large,
            Quality::Thumbnail => self.settings.thumbnail,
            Quality::Original => {
                return Err(GalleryError::InvalidArgument(
                    "the original variant is stored as uploaded".to_string(),
                ));
            }
        };

        tokio::task::spawn_blocking(move || encode_variant(&data, variant))
            .await
            .map_err(|error| GalleryError::Transcode(format!("transcode task failed: {}", error)))?
    }
}

fn encode_variant(data: &[u8], variant: VariantSettings) -> Result<Bytes> {
    let img = image::load_from_memory(data)
        .map_err(|error| GalleryError::Transcode(error.to_string()))?;

    // never upscale
    let bound = variant.max_dimension;
    let img = if img.width() > bound || img.height() > bound {
        img.resize(bound, bound, FilterType::Lanczos3)
    } else {
        img
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, variant.jpeg_quality);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|error| GalleryError::Transcode(error.to_string()))?;

    Ok(Bytes::from(buf))
}

/// Content type of an upload, judged from its magic bytes.
pub fn sniff_content_type(data: &[u8]) -> Result<&'static str> {
    let format = image::guess_format(data).map_err(|_| {
        GalleryError::InvalidFormat("upload is not a recognised image".to_string())
    })?;
    Ok(format.to_mime_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::png_bytes;

    #[tokio::test]
    async fn test_large_and_thumbnail_are_bounded() {
        let transcoder = ImageTranscoder::default();
        let source = png_bytes(2000, 1000);

        let large = transcoder
            .transcode(source.clone(), Quality::Large)
            .await
            .unwrap();
        let decoded = image::load_from_memory(&large).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1600, 800));

        let thumb = transcoder
            .transcode(source, Quality::Thumbnail)
            .await
            .unwrap();
        let decoded = image::load_from_memory(&thumb).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 160));
        assert_eq!(sniff_content_type(&thumb).unwrap(), DERIVED_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_small_images_are_not_upscaled() {
        let transcoder = ImageTranscoder::default();
        let large = transcoder
            .transcode(png_bytes(100, 50), Quality::Large)
            .await
            .unwrap();
        let decoded = image::load_from_memory(&large).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[tokio::test]
    async fn test_garbage_fails_to_transcode() {
        let transcoder = ImageTranscoder::default();
        let err = transcoder
            .transcode(Bytes::from_static(b"definitely not pixels"), Quality::Thumbnail)
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::Transcode(_)));

        let err = transcoder
            .transcode(png_bytes(4, 4), Quality::Original)
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::InvalidArgument(_)));
    }

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(&png_bytes(3, 3)).unwrap(), "image/png");
        assert!(matches!(
            sniff_content_type(b"plain text upload"),
            Err(GalleryError::InvalidFormat(_))
        ));
    }
}
