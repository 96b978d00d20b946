//! Image buffer wrapper for raw captured frames
//!
//! This module provides an `ImageBuffer` wrapper around `image::DynamicImage`
//! holding one raw capture before it is encoded.
//!
//! # Examples
//!
//! ```
//! use screen_stream::capture::ImageBuffer;
//!
//! let img = ImageBuffer::from_test_pattern(1920, 1080);
//!
//! // Crop a 800x400 window out of the top-left corner
//! let cropped = img.crop(100, 100, 800, 400).unwrap();
//! assert_eq!(cropped.dimensions(), (800, 400));
//! ```

use image::GenericImageView;

use crate::error::{StreamError, StreamResult};

/// Wrapper around `image::DynamicImage` for raw frames
///
/// All transformation methods return new `ImageBuffer` instances, leaving
/// the original unchanged.
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    inner: image::DynamicImage,
}

impl ImageBuffer {
    /// Creates a new ImageBuffer from a DynamicImage
    pub fn new(image: image::DynamicImage) -> Self {
        Self { inner: image }
    }

    /// Crops the image to a rectangle given in image coordinates
    ///
    /// Returns [`StreamError::InvalidRegion`] if the rectangle is empty or
    /// does not fit inside the image.
    ///
    /// # Examples
    ///
    /// ```
    /// use screen_stream::capture::ImageBuffer;
    ///
    /// let img = ImageBuffer::from_test_pattern(1920, 1080);
    /// let cropped = img.crop(0, 0, 640, 480).unwrap();
    /// assert_eq!(cropped.dimensions(), (640, 480));
    ///
    /// assert!(img.crop(1900, 0, 100, 100).is_err());
    /// ```
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> StreamResult<Self> {
        let (img_width, img_height) = self.dimensions();

        if width == 0 || height == 0 {
            return Err(StreamError::InvalidRegion {
                reason: format!("Region {}x{} is empty", width, height),
            });
        }

        if x >= img_width || y >= img_height {
            return Err(StreamError::InvalidRegion {
                reason: format!(
                    "Region origin ({}, {}) is outside image bounds ({}x{})",
                    x, y, img_width, img_height
                ),
            });
        }

        if x.saturating_add(width) > img_width || y.saturating_add(height) > img_height {
            return Err(StreamError::InvalidRegion {
                reason: format!(
                    "Region ({}x{} at {},{}) extends beyond image bounds ({}x{})",
                    width, height, x, y, img_width, img_height
                ),
            });
        }

        // Full-frame crops are the common case on a single display
        if x == 0 && y == 0 && width == img_width && height == img_height {
            return Ok(self.clone());
        }

        Ok(Self::new(self.inner.crop_imm(x, y, width, height)))
    }

    /// Returns the dimensions of the image as (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Returns the image width in pixels
    pub fn width(&self) -> u32 {
        self.dimensions().0
    }

    /// Returns the image height in pixels
    pub fn height(&self) -> u32 {
        self.dimensions().1
    }

    /// Converts the image to RGBA8 format
    pub fn to_rgba8(&self) -> image::RgbaImage {
        self.inner.to_rgba8()
    }

    /// Converts the image to RGB8 format, dropping alpha
    pub fn to_rgb8(&self) -> image::RgbImage {
        self.inner.to_rgb8()
    }

    /// Creates a static test pattern image with the specified dimensions
    ///
    /// The pattern is a vertical gradient from blue (top) to cyan (bottom).
    pub fn from_test_pattern(width: u32, height: u32) -> Self {
        Self::from_animated_pattern(width, height, None)
    }

    /// Creates a test pattern with a moving marker bar
    ///
    /// The gradient matches [`from_test_pattern`](Self::from_test_pattern);
    /// when `frame` is set, a white vertical bar is drawn whose horizontal
    /// position advances with the frame index, so consecutive frames encode to
    /// different payloads.
    pub fn from_animated_pattern(width: u32, height: u32, frame: Option<u64>) -> Self {
        use image::{ImageBuffer as ImgBuf, Rgba};

        let start_color = Rgba([0u8, 0u8, 255u8, 255u8]); // Blue
        let end_color = Rgba([0u8, 255u8, 255u8, 255u8]); // Cyan

        let bar_width = (width / 32).max(1);
        let bar_x = frame.map(|f| ((f * u64::from(bar_width)) % u64::from(width.max(1))) as u32);

        let img = ImgBuf::from_fn(width, height, |x, y| {
            if bar_x.is_some_and(|bar_x| x >= bar_x && x < bar_x + bar_width) {
                return Rgba([255, 255, 255, 255]);
            }

            let ratio = y as f32 / height.max(1) as f32;
            Rgba([
                (start_color[0] as f32 * (1.0 - ratio) + end_color[0] as f32 * ratio) as u8,
                (start_color[1] as f32 * (1.0 - ratio) + end_color[1] as f32 * ratio) as u8,
                (start_color[2] as f32 * (1.0 - ratio) + end_color[2] as f32 * ratio) as u8,
                255,
            ])
        });

        Self::new(image::DynamicImage::ImageRgba8(img))
    }
}

impl From<image::RgbaImage> for ImageBuffer {
    fn from(image: image::RgbaImage) -> Self {
        Self::new(image::DynamicImage::ImageRgba8(image))
    }
}
