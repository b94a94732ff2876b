// src/capture/photo.rs
use anyhow::{anyhow, Context, Result};
use image::ImageFormat;
use log::info;
use std::path::Path;

/// An encoded still image plus its MIME type, ready to be analyzed.
///
/// Constructed once per user action (file pick or camera grab) and treated
/// as immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl CapturedImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Load a photo from disk. The MIME type is derived from the encoded
    /// content, not the file extension.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read image file: {}", path.display()))?;

        if bytes.is_empty() {
            return Err(anyhow!("image file is empty: {}", path.display()));
        }

        let format = image::guess_format(&bytes)
            .with_context(|| format!("unrecognized image format: {}", path.display()))?;
        let mime_type = mime_for_format(format)
            .ok_or_else(|| anyhow!("unsupported image format: {:?}", format))?;

        info!(
            "Loaded photo: {} ({} bytes, {})",
            path.display(),
            bytes.len(),
            mime_type
        );

        Ok(Self::new(bytes, mime_type))
    }
}

fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}
