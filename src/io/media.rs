// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Image file loading and encoding.
//!
//! This module handles reading uploaded images, encoding the full image for
//! persistence payloads, and producing thumbnails for previews.

use anyhow::{Context, Result};
use base64::Engine;
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::Path;

/// File extensions offered by the open dialog.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// An upload read from disk: its file name and raw bytes.
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Read an image file into memory without decoding it.
pub fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Upload { name, bytes })
}

/// Decode uploaded bytes, guessing the format from the content.
pub fn decode(bytes: &[u8]) -> image::ImageResult<DynamicImage> {
    image::load_from_memory(bytes)
}

/// Image name without its extension, as used by the archive.
pub fn image_stem(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// Encode an image as base64 JPEG.
pub fn encode_jpeg_base64(image: &DynamicImage) -> Result<String> {
    let mut buffer = Cursor::new(Vec::new());
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .context("failed to encode image as JPEG")?;
    Ok(base64::engine::general_purpose::STANDARD.encode(buffer.into_inner()))
}

/// Decode a base64 image produced by [`encode_jpeg_base64`].
pub fn decode_base64(encoded: &str) -> Result<DynamicImage> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .context("invalid base64 image")?;
    decode(&bytes).context("invalid archived image")
}

/// Square RGB thumbnail of `edge` pixels.
pub fn thumbnail(image: &DynamicImage, edge: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(
        image
            .resize_exact(edge.max(1), edge.max(1), FilterType::Lanczos3)
            .to_rgb8(),
    )
}

/// RGBA pixels ready to upload as a texture.
pub fn rgba_pixels(image: &DynamicImage) -> ([usize; 2], Vec<u8>) {
    let rgba = image.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    (size, rgba.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_jpeg_roundtrip_keeps_dimensions() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| {
            image::Rgb([(x * 3) as u8, (y * 5) as u8, 90])
        }));
        let encoded = encode_jpeg_base64(&image).unwrap();
        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(b"not an image").is_err());
    }

    #[test]
    fn test_thumbnail_is_square() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(30, 10));
        let thumb = thumbnail(&image, 100);
        assert_eq!((thumb.width(), thumb.height()), (100, 100));
    }

    #[test]
    fn test_image_stem() {
        assert_eq!(image_stem("tablet_04.jpg"), "tablet_04");
        assert_eq!(image_stem("noext"), "noext");
    }
}
