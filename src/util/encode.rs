//! Image encoding for published frames
//!
//! This module turns a raw [`ImageBuffer`] into the self-contained payload
//! written into each multipart part.
//!
//! # Format Support
//!
//! - **PNG**: Lossless compression with three levels (Fast, Default, Best),
//!   the default for UI content
//! - **JPEG**: Lossy compression with quality 1-100 (no alpha channel support)
//!
//! # Examples
//!
//! ```
//! use screen_stream::{capture::ImageBuffer, model::ImageFormat, util::encode::encode_frame};
//!
//! let img = ImageBuffer::from_test_pattern(320, 240);
//! let png_bytes = encode_frame(&img, ImageFormat::Png, 20).unwrap();
//! assert_eq!(&png_bytes[0..4], b"\x89PNG");
//! ```

use std::io::Cursor;

use image::{
    ImageEncoder,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
};

use crate::{
    capture::ImageBuffer,
    error::{StreamError, StreamResult},
    model::ImageFormat,
};

/// Maps a quality value (0-100) to a PNG compression type
///
/// PNG has no quality knob, so quality ranges select compression effort:
/// - 0-33: Fast compression (faster encoding, larger payloads)
/// - 34-66: Default compression (balanced)
/// - 67-100: Best compression (slower encoding, smaller payloads)
///
/// # Examples
///
/// ```
/// use image::codecs::png::CompressionType;
/// use screen_stream::util::encode::compression_type_from_quality;
///
/// assert!(matches!(compression_type_from_quality(20), CompressionType::Fast));
/// assert!(matches!(compression_type_from_quality(50), CompressionType::Default));
/// assert!(matches!(compression_type_from_quality(90), CompressionType::Best));
/// ```
pub fn compression_type_from_quality(quality: u8) -> CompressionType {
    match quality {
        0..=33 => CompressionType::Fast,
        34..=66 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

/// Rejects images the encoders cannot represent
fn ensure_non_empty(buffer: &ImageBuffer, format: ImageFormat) -> StreamResult<()> {
    let (width, height) = buffer.dimensions();
    if width == 0 || height == 0 {
        return Err(StreamError::EncodingFailed {
            format,
            reason: format!("image dimensions must be > 0 (got {}x{})", width, height),
        });
    }
    Ok(())
}

/// Encodes an image as PNG with the given compression level
///
/// # Examples
///
/// ```
/// use image::codecs::png::CompressionType;
/// use screen_stream::{capture::ImageBuffer, util::encode::encode_png};
///
/// let img = ImageBuffer::from_test_pattern(100, 100);
/// let png = encode_png(&img, CompressionType::Fast).unwrap();
/// assert!(!png.is_empty());
/// ```
pub fn encode_png(buffer: &ImageBuffer, compression: CompressionType) -> StreamResult<Vec<u8>> {
    ensure_non_empty(buffer, ImageFormat::Png)?;

    let mut output = Vec::new();

    // Adaptive filtering picks the best filter per scanline
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut output), compression, FilterType::Adaptive);

    let rgba = buffer.to_rgba8();
    let (width, height) = rgba.dimensions();

    encoder
        .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| StreamError::EncodingFailed {
            format: ImageFormat::Png,
            reason: e.to_string(),
        })?;

    Ok(output)
}

/// Encodes an image as JPEG with specified quality
///
/// JPEG has no alpha channel, so the image is converted to RGB first.
/// Quality is clamped to 1-100.
pub fn encode_jpeg(buffer: &ImageBuffer, quality: u8) -> StreamResult<Vec<u8>> {
    ensure_non_empty(buffer, ImageFormat::Jpeg)?;

    let quality = quality.clamp(1, 100);

    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut output), quality);

    let rgb = buffer.to_rgb8();
    let (width, height) = rgb.dimensions();

    encoder
        .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| StreamError::EncodingFailed {
            format: ImageFormat::Jpeg,
            reason: e.to_string(),
        })?;

    Ok(output)
}

/// Encodes a captured frame in the requested format
///
/// `quality` selects PNG compression effort or JPEG quality.
pub fn encode_frame(buffer: &ImageBuffer, format: ImageFormat, quality: u8) -> StreamResult<Vec<u8>> {
    match format {
        ImageFormat::Png => encode_png(buffer, compression_type_from_quality(quality)),
        ImageFormat::Jpeg => encode_jpeg(buffer, quality),
    }
}
