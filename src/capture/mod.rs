//! Capture backend trait and implementations
//!
//! This module provides the seam between the frame producer and the
//! platform's screen-capture primitive:
//!
//! - [`ScreenCapture`]: trait every backend implements
//! - [`ImageBuffer`]: raw captured frame, input to the encoder
//! - [`MockBackend`]: synthetic animated test pattern with error injection
//! - `NativeBackend`: operating system capture through xcap (requires the
//!   `native-capture` feature)
//!
//! Use [`create_backend`] to select a backend at startup.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::StreamResult,
    model::{BackendType, CaptureRegion},
};

pub mod image_buffer;
pub mod mock;

#[cfg(feature = "native-capture")]
pub mod native_backend;

pub use image_buffer::ImageBuffer;
pub use mock::MockBackend;
#[cfg(feature = "native-capture")]
pub use native_backend::NativeBackend;

/// Core trait for screen-capture backends
///
/// Implementations must be thread-safe (`Send + Sync`): the producer task
/// holds the backend behind an `Arc` and calls it from the tokio runtime.
/// Blocking platform calls belong in `spawn_blocking` inside the
/// implementation.
///
/// # Examples
///
/// ```
/// use screen_stream::capture::{MockBackend, ScreenCapture};
///
/// #[tokio::main]
/// async fn main() {
///     let backend = MockBackend::new();
///     let region = backend.primary_region().await.unwrap();
///     let frame = backend.capture_region(region).await.unwrap();
///     assert_eq!(frame.dimensions(), (region.width, region.height));
/// }
/// ```
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Resolves the bounds of the primary display
    ///
    /// Called once at startup; the result is reused for every tick.
    ///
    /// # Errors
    ///
    /// - [`StreamError::BackendNotAvailable`](crate::error::StreamError::BackendNotAvailable)
    ///   - no display can be queried
    async fn primary_region(&self) -> StreamResult<CaptureRegion>;

    /// Captures the raw pixels inside `region`
    ///
    /// # Errors
    ///
    /// - [`StreamError::CaptureFailed`](crate::error::StreamError::CaptureFailed)
    ///   - the platform call failed
    /// - [`StreamError::CaptureTimeout`](crate::error::StreamError::CaptureTimeout)
    ///   - the platform call hung
    /// - [`StreamError::InvalidRegion`](crate::error::StreamError::InvalidRegion)
    ///   - the region no longer fits the display
    async fn capture_region(&self, region: CaptureRegion) -> StreamResult<ImageBuffer>;

    /// Identifies the backend for logs and `/healthz`
    fn backend_type(&self) -> BackendType;
}

/// Creates the capture backend for the requested type
///
/// `None` picks the native backend when the crate was built with the
/// `native-capture` feature and the mock backend otherwise.
///
/// # Errors
///
/// Returns [`StreamError::BackendNotAvailable`](crate::error::StreamError::BackendNotAvailable) when the native backend is
/// requested explicitly but was not compiled in.
pub fn create_backend(requested: Option<BackendType>) -> StreamResult<Arc<dyn ScreenCapture>> {
    match requested {
        Some(BackendType::Mock) => Ok(Arc::new(MockBackend::new())),
        Some(BackendType::Native) => native_backend(),
        None => {
            if cfg!(feature = "native-capture") {
                native_backend()
            } else {
                tracing::warn!(
                    "Built without native-capture; streaming the mock test pattern instead"
                );
                Ok(Arc::new(MockBackend::new()))
            }
        }
    }
}

#[cfg(feature = "native-capture")]
fn native_backend() -> StreamResult<Arc<dyn ScreenCapture>> {
    Ok(Arc::new(NativeBackend::new()))
}

#[cfg(not(feature = "native-capture"))]
fn native_backend() -> StreamResult<Arc<dyn ScreenCapture>> {
    Err(crate::error::StreamError::BackendNotAvailable {
        backend: BackendType::Native,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(not(feature = "native-capture"))]
    use crate::error::StreamError;

    #[test]
    fn test_create_mock_backend() {
        let backend = create_backend(Some(BackendType::Mock)).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Mock);
    }

    #[cfg(not(feature = "native-capture"))]
    #[test]
    fn test_native_backend_unavailable_without_feature() {
        let result = create_backend(Some(BackendType::Native));
        assert!(matches!(
            result,
            Err(StreamError::BackendNotAvailable {
                backend: BackendType::Native
            })
        ));
    }

    #[cfg(not(feature = "native-capture"))]
    #[test]
    fn test_auto_falls_back_to_mock() {
        let backend = create_backend(None).unwrap();
        assert_eq!(backend.backend_type(), BackendType::Mock);
    }
}
