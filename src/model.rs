//! Data models and type definitions for screen-stream
//!
//! This module defines the core types used throughout the application:
//! - Capture backend and image format selection
//! - The display region captured on every tick
//! - The health check response served at `/healthz`

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed interval between producer ticks and between stream writes (~30 Hz)
pub const FRAME_PERIOD: Duration = Duration::from_millis(33);

/// Multipart boundary token used by the `/frame` stream
pub const BOUNDARY: &str = "frame";

/// Capture backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Synthetic animated test pattern, no display required
    Mock,
    /// Operating system capture through xcap
    Native,
}

impl BackendType {
    /// Returns the backend type as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Mock => "mock",
            BackendType::Native => "native",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Encoded image format of published frames
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Lossless, best fidelity for UI content
    #[default]
    Png,
    /// Lossy, much smaller payloads for photographic content
    Jpeg,
}

impl ImageFormat {
    /// Returns the format as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// Media type written in each multipart part header
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bounds of the display area captured on every tick
///
/// Resolved once at startup from the primary display and never changed
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    /// Left edge in desktop coordinates
    pub x:      i32,
    /// Top edge in desktop coordinates
    pub y:      i32,
    /// Width in pixels
    pub width:  u32,
    /// Height in pixels
    pub height: u32,
}

impl CaptureRegion {
    /// Creates a new region
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns true if the region covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for CaptureRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Response body of `GET /healthz`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Whether the server is functioning
    pub ok:               bool,
    /// Active capture backend
    pub backend:          BackendType,
    /// Encoded frame format
    pub format:           ImageFormat,
    /// Number of frames published since startup
    pub frames_published: u64,
    /// Capture time of the latest published frame
    pub last_frame_at:    Option<DateTime<Utc>>,
    /// Number of `/frame` streams currently open
    pub active_sessions:  usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_serialization() {
        assert_eq!(serde_json::to_string(&BackendType::Mock).unwrap(), r#""mock""#);
        assert_eq!(serde_json::to_string(&BackendType::Native).unwrap(), r#""native""#);
        assert_eq!(serde_json::from_str::<BackendType>(r#""native""#).unwrap(), BackendType::Native);
    }

    #[test]
    fn test_backend_type_display() {
        assert_eq!(format!("{}", BackendType::Mock), "mock");
        assert_eq!(format!("{}", BackendType::Native), "native");
    }

    #[test]
    fn test_image_format_mime_types() {
        assert_eq!(ImageFormat::Png.mime_type(), "image/png");
        assert_eq!(ImageFormat::Jpeg.mime_type(), "image/jpeg");
        assert_eq!(ImageFormat::default(), ImageFormat::Png);
    }

    #[test]
    fn test_capture_region_display_and_empty() {
        let region = CaptureRegion::new(0, 0, 1920, 1080);
        assert_eq!(region.to_string(), "1920x1080+0+0");
        assert!(!region.is_empty());
        assert!(CaptureRegion::new(10, 10, 0, 5).is_empty());
    }

    #[test]
    fn test_frame_period_is_about_thirty_hertz() {
        assert_eq!(FRAME_PERIOD.as_millis(), 33);
    }

    #[test]
    fn test_health_check_response_serialization() {
        let response = HealthCheckResponse {
            ok:               true,
            backend:          BackendType::Mock,
            format:           ImageFormat::Png,
            frames_published: 3,
            last_frame_at:    None,
            active_sessions:  1,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["backend"], "mock");
        assert_eq!(json["format"], "png");
        assert_eq!(json["frames_published"], 3);
        assert!(json["last_frame_at"].is_null());
        assert_eq!(json["active_sessions"], 1);
    }
}
