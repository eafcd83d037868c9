//! Image codec capability.
//!
//! Owns decode/resize/blur/encode. Constructed explicitly at startup and
//! injected into the pipeline; construction has no process-wide side effects
//! so building several in tests is safe.

use crate::options::{OutputFormat, TransformOptions};
use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use std::io::Cursor;

const DEFAULT_JPEG_QUALITY: u8 = 75;
const DEFAULT_WEBP_QUALITY: f32 = 80.0;

/// Transformation capability the pipeline dispatches to. Implemented by
/// `ImageCodec`; tests substitute instrumented codecs.
pub trait Codec: Send + Sync {
    /// Decode, apply the requested operations, and re-encode.
    /// Returns the output bytes and their mime type.
    fn transform(
        &self,
        data: &[u8],
        source_mime: &str,
        options: &TransformOptions,
    ) -> Result<(Vec<u8>, &'static str)>;
}

#[derive(Clone, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        ImageCodec
    }
}

impl Codec for ImageCodec {
    fn transform(
        &self,
        data: &[u8],
        source_mime: &str,
        options: &TransformOptions,
    ) -> Result<(Vec<u8>, &'static str)> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("failed to sniff image format")?
            .decode()
            .context("failed to decode image")?;

        let mut img = Self::apply_resize(img, options.width, options.height);

        if let Some(sigma) = options.blur {
            if sigma > 0.0 {
                img = img.blur(sigma);
            }
        }

        let format = options
            .format
            .or_else(|| OutputFormat::from_mime_type(source_mime))
            .ok_or_else(|| anyhow!("no encodable format for '{}'", source_mime))?;

        let bytes = Self::encode(&img, format, options.quality)?;
        Ok((bytes, format.to_mime_type()))
    }
}

impl ImageCodec {
    /// Both dimensions: fill and center-crop to the exact box. One
    /// dimension: scale preserving aspect ratio. Neither: leave as is.
    fn apply_resize(img: DynamicImage, width: Option<u32>, height: Option<u32>) -> DynamicImage {
        let (orig_w, orig_h) = img.dimensions();
        match (width, height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => img.resize_to_fill(w, h, FilterType::Lanczos3),
            (Some(w), None) if w > 0 => {
                let h = ((w as f64 * orig_h as f64) / orig_w as f64).round().max(1.0) as u32;
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
            (None, Some(h)) if h > 0 => {
                let w = ((h as f64 * orig_w as f64) / orig_h as f64).round().max(1.0) as u32;
                img.resize_exact(w, h, FilterType::Lanczos3)
            }
            _ => img,
        }
    }

    fn encode(img: &DynamicImage, format: OutputFormat, quality: Option<u8>) -> Result<Vec<u8>> {
        match format {
            OutputFormat::Jpeg => {
                let quality = quality.unwrap_or(DEFAULT_JPEG_QUALITY).min(100);
                let mut buffer = Vec::new();
                let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(
                    Cursor::new(&mut buffer),
                    quality,
                );
                // JPEG has no alpha channel
                img.to_rgb8()
                    .write_with_encoder(encoder)
                    .context("failed to encode JPEG")?;
                Ok(buffer)
            }
            OutputFormat::Png => {
                let mut buffer = Vec::new();
                img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
                    .context("failed to encode PNG")?;
                Ok(buffer)
            }
            OutputFormat::WebP => {
                let quality = quality.map(|q| q.min(100) as f32).unwrap_or(DEFAULT_WEBP_QUALITY);
                let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
                let encoder = webp::Encoder::from_image(&rgba)
                    .map_err(|e| anyhow!("failed to prepare WebP encode: {}", e))?;
                Ok(encoder.encode(quality).to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_fixture(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn dimensions(data: &[u8]) -> (u32, u32) {
        ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap()
            .dimensions()
    }

    #[test]
    fn test_resize_both_dimensions_fills_box() {
        let codec = ImageCodec::new();
        let source = png_fixture(64, 32);
        let options = TransformOptions {
            width: Some(16),
            height: Some(16),
            ..Default::default()
        };
        let (out, mime) = codec.transform(&source, "image/png", &options).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(dimensions(&out), (16, 16));
    }

    #[test]
    fn test_resize_width_only_preserves_aspect() {
        let codec = ImageCodec::new();
        let source = png_fixture(64, 32);
        let options = TransformOptions {
            width: Some(32),
            ..Default::default()
        };
        let (out, _) = codec.transform(&source, "image/png", &options).unwrap();
        assert_eq!(dimensions(&out), (32, 16));
    }

    #[test]
    fn test_resize_height_only_preserves_aspect() {
        let codec = ImageCodec::new();
        let source = png_fixture(64, 32);
        let options = TransformOptions {
            height: Some(16),
            ..Default::default()
        };
        let (out, _) = codec.transform(&source, "image/png", &options).unwrap();
        assert_eq!(dimensions(&out), (32, 16));
    }

    #[test]
    fn test_reencode_to_jpeg() {
        let codec = ImageCodec::new();
        let source = png_fixture(8, 8);
        let options = TransformOptions {
            format: Some(OutputFormat::Jpeg),
            quality: Some(50),
            ..Default::default()
        };
        let (out, mime) = codec.transform(&source, "image/png", &options).unwrap();
        assert_eq!(mime, "image/jpeg");
        // JPEG magic
        assert_eq!(&out[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_reencode_to_webp() {
        let codec = ImageCodec::new();
        let source = png_fixture(8, 8);
        let options = TransformOptions {
            format: Some(OutputFormat::WebP),
            ..Default::default()
        };
        let (out, mime) = codec.transform(&source, "image/png", &options).unwrap();
        assert_eq!(mime, "image/webp");
        assert_eq!(&out[..4], b"RIFF");
    }

    #[test]
    fn test_blur_changes_bytes() {
        let codec = ImageCodec::new();
        let source = png_fixture(16, 16);
        let blurred = codec
            .transform(
                &source,
                "image/png",
                &TransformOptions {
                    blur: Some(2.0),
                    ..Default::default()
                },
            )
            .unwrap()
            .0;
        let plain = codec
            .transform(&source, "image/png", &TransformOptions::default())
            .unwrap()
            .0;
        assert_ne!(blurred, plain);
    }

    #[test]
    fn test_undecodable_bytes_fail() {
        let codec = ImageCodec::new();
        let result = codec.transform(
            b"definitely not an image",
            "image/png",
            &TransformOptions {
                width: Some(10),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }
}
