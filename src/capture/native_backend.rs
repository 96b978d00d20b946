//! Native capture backend using xcap
//!
//! Captures the primary monitor through the operating system (X11/Wayland on
//! Linux, GDI/DXGI on Windows, CoreGraphics on macOS). xcap calls are
//! synchronous and may block on the display server, so every call runs on the
//! blocking thread pool and is bounded by a timeout.

use std::time::Duration;

use async_trait::async_trait;

use super::{ImageBuffer, ScreenCapture};
use crate::{
    error::{StreamError, StreamResult},
    model::{BackendType, CaptureRegion},
};

/// Timeout for a single display capture
///
/// A healthy capture finishes well inside one frame period; anything slower
/// than this is treated as a hung display server.
const CAPTURE_TIMEOUT_MS: u64 = 2000;

/// Screen-capture backend backed by xcap
///
/// Holds no platform handles: monitors are re-enumerated on every call so the
/// backend stays `Send + Sync` on every platform.
#[derive(Debug, Default)]
pub struct NativeBackend;

impl NativeBackend {
    /// Creates a new native backend
    pub fn new() -> Self {
        Self
    }

    /// Runs a blocking xcap call with a timeout
    async fn run_blocking<T, F>(f: F) -> StreamResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> StreamResult<T> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);

        match tokio::time::timeout(Duration::from_millis(CAPTURE_TIMEOUT_MS), task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                tracing::error!("xcap task panicked: {}", join_error);
                Err(StreamError::CaptureFailed {
                    reason: format!("capture task panicked: {}", join_error),
                })
            }
            Err(_) => Err(StreamError::CaptureTimeout {
                duration_ms: CAPTURE_TIMEOUT_MS,
            }),
        }
    }
}

/// Picks the primary monitor, or the first one if none reports primary
fn primary_monitor() -> StreamResult<xcap::Monitor> {
    let monitors = xcap::Monitor::all().map_err(map_xcap_error)?;

    let mut fallback = None;
    for monitor in monitors {
        if monitor.is_primary().unwrap_or(false) {
            return Ok(monitor);
        }
        if fallback.is_none() {
            fallback = Some(monitor);
        }
    }

    fallback.ok_or(StreamError::BackendNotAvailable {
        backend: BackendType::Native,
    })
}

fn monitor_region(monitor: &xcap::Monitor) -> StreamResult<CaptureRegion> {
    Ok(CaptureRegion::new(
        monitor.x().map_err(map_xcap_error)?,
        monitor.y().map_err(map_xcap_error)?,
        monitor.width().map_err(map_xcap_error)?,
        monitor.height().map_err(map_xcap_error)?,
    ))
}

/// Maps xcap errors onto the transient capture error
fn map_xcap_error(e: xcap::XCapError) -> StreamError {
    StreamError::CaptureFailed {
        reason: e.to_string(),
    }
}

#[async_trait]
impl ScreenCapture for NativeBackend {
    async fn primary_region(&self) -> StreamResult<CaptureRegion> {
        Self::run_blocking(|| {
            let monitor = primary_monitor()?;
            monitor_region(&monitor)
        })
        .await
    }

    async fn capture_region(&self, region: CaptureRegion) -> StreamResult<ImageBuffer> {
        Self::run_blocking(move || {
            let monitor = primary_monitor()?;
            let bounds = monitor_region(&monitor)?;
            let image = monitor.capture_image().map_err(map_xcap_error)?;
            tracing::trace!("Captured {}x{} from {}", image.width(), image.height(), bounds);

            let buffer = ImageBuffer::from(image);
            let offset_x = region.x - bounds.x;
            let offset_y = region.y - bounds.y;
            if offset_x < 0 || offset_y < 0 {
                return Err(StreamError::InvalidRegion {
                    reason: format!("Region {} is outside monitor {}", region, bounds),
                });
            }

            // Physical pixels may differ from logical bounds on HiDPI displays
            if offset_x == 0
                && offset_y == 0
                && region.width == bounds.width
                && region.height == bounds.height
            {
                return Ok(buffer);
            }

            buffer.crop(offset_x as u32, offset_y as u32, region.width, region.height)
        })
        .await
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type() {
        assert_eq!(NativeBackend::new().backend_type(), BackendType::Native);
    }

    #[tokio::test]
    #[ignore = "Requires a graphical session"]
    async fn test_capture_primary_display() {
        let backend = NativeBackend::new();
        let region = backend.primary_region().await.unwrap();
        assert!(!region.is_empty());

        let image = backend.capture_region(region).await.unwrap();
        assert!(image.width() > 0 && image.height() > 0);
    }
}
