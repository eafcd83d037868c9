//! Transform options.
//!
//! A small record of independent optional toggles, validated as a whole
//! before any transformation work is dispatched.

use anyhow::{anyhow, Result};

/// Source mime types eligible for transformation.
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/webp", "image/png", "image/jpeg"];

/// Output format for re-encoded images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(anyhow!("Invalid format: {}", s)),
        }
    }

    /// Map a source mime type to its format, for the default "keep the
    /// source format" case.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" | "image/jpg" => Some(OutputFormat::Jpeg),
            "image/png" => Some(OutputFormat::Png),
            "image/webp" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
            OutputFormat::WebP => "image/webp",
        }
    }
}

/// Requested derived-image parameters. All fields optional; `is_empty`
/// identifies the pass-through case.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Gaussian blur sigma.
    pub blur: Option<f32>,
    /// Encode quality 0-100 (JPEG and WebP; PNG is lossless and ignores it).
    pub quality: Option<u8>,
    pub format: Option<OutputFormat>,
}

impl TransformOptions {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.blur.is_none()
            && self.quality.is_none()
            && self.format.is_none()
    }

    /// Whether the source mime type admits transformation at all.
    pub fn supports_mime_type(mime: &str) -> bool {
        SUPPORTED_IMAGE_TYPES.contains(&mime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_options() {
        assert!(TransformOptions::default().is_empty());
        assert!(!TransformOptions {
            width: Some(100),
            ..Default::default()
        }
        .is_empty());
        assert!(!TransformOptions {
            quality: Some(50),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_supported_mime_types() {
        assert!(TransformOptions::supports_mime_type("image/png"));
        assert!(TransformOptions::supports_mime_type("image/jpeg"));
        assert!(TransformOptions::supports_mime_type("image/webp"));
        assert!(!TransformOptions::supports_mime_type("text/plain"));
        assert!(!TransformOptions::supports_mime_type("image/gif"));
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("jpg").unwrap(), OutputFormat::Jpeg);
        assert_eq!(OutputFormat::parse("WEBP").unwrap(), OutputFormat::WebP);
        assert!(OutputFormat::parse("avif").is_err());
    }
}
