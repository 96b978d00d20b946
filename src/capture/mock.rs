//! Mock capture backend for testing
//!
//! This module provides a `MockBackend` implementation of the
//! [`ScreenCapture`] trait for tests, demos and machines without a display.
//!
//! # Features
//!
//! - **Synthetic Frames:** an animated test pattern, a moving bar advances on
//!   every capture so consecutive frames differ
//! - **Configurable Display:** virtual desktop size and primary region
//! - **Configurable Delay:** simulate slow capture calls
//! - **Error Injection:** fail every capture, toggle failures at runtime, or
//!   fail the next N captures
//!
//! # Examples
//!
//! ```
//! use screen_stream::capture::{MockBackend, ScreenCapture};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = MockBackend::new().with_display_size(320, 240);
//!     let region = backend.primary_region().await.unwrap();
//!
//!     // Fail exactly one capture, then recover
//!     backend.fail_next(1);
//!     assert!(backend.capture_region(region).await.is_err());
//!     assert!(backend.capture_region(region).await.is_ok());
//! }
//! ```

use std::{
    sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::sleep;

use super::{ImageBuffer, ScreenCapture};
use crate::{
    error::{StreamError, StreamResult},
    model::{BackendType, CaptureRegion},
};

/// Default virtual display width
const DEFAULT_WIDTH: u32 = 1280;
/// Default virtual display height
const DEFAULT_HEIGHT: u32 = 720;

/// Mock capture backend for testing and development
///
/// `MockBackend` is thread-safe and can be shared across tasks using `Arc`;
/// runtime failure toggles use atomics so tests can flip them while the
/// producer is running.
#[derive(Debug)]
pub struct MockBackend {
    /// Virtual desktop size
    display:         (u32, u32),
    /// Optional delay to simulate capture latency
    delay:           Option<Duration>,
    /// Error returned by every capture
    error_injection: Option<StreamError>,
    /// Runtime failure switch
    failing:         AtomicBool,
    /// Remaining captures that should fail
    fail_budget:     AtomicU32,
    /// Number of capture calls so far (successful or not)
    captures:        AtomicU64,
}

impl MockBackend {
    /// Creates a new MockBackend with a 1280x720 virtual display
    pub fn new() -> Self {
        Self {
            display:         (DEFAULT_WIDTH, DEFAULT_HEIGHT),
            delay:           None,
            error_injection: None,
            failing:         AtomicBool::new(false),
            fail_budget:     AtomicU32::new(0),
            captures:        AtomicU64::new(0),
        }
    }

    /// Sets the virtual display size
    pub fn with_display_size(mut self, width: u32, height: u32) -> Self {
        self.display = (width, height);
        self
    }

    /// Sets a delay applied to every capture call
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use screen_stream::capture::MockBackend;
    ///
    /// let backend = MockBackend::new().with_delay(Duration::from_millis(10));
    /// ```
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Injects an error that will be returned by every capture
    ///
    /// # Examples
    ///
    /// ```
    /// use screen_stream::{capture::MockBackend, error::StreamError};
    ///
    /// let backend = MockBackend::new().with_error(StreamError::CaptureFailed {
    ///     reason: "display unplugged".to_string(),
    /// });
    /// ```
    pub fn with_error(mut self, error: StreamError) -> Self {
        self.error_injection = Some(error);
        self
    }

    /// Makes every subsequent capture fail until switched off again
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Makes the next `count` captures fail
    pub fn fail_next(&self, count: u32) {
        self.fail_budget.store(count, Ordering::SeqCst);
    }

    /// Returns how many capture calls have been made
    pub fn capture_count(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }

    /// Applies configured delay if set
    async fn apply_delay(&self) {
        if let Some(duration) = self.delay {
            sleep(duration).await;
        }
    }

    /// Returns the error this capture should fail with, if any
    fn check_error_injection(&self) -> StreamResult<()> {
        if let Some(ref error) = self.error_injection {
            return Err(clone_error(error));
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(StreamError::CaptureFailed {
                reason: "mock capture failure".to_string(),
            });
        }

        let consumed = self
            .fail_budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if consumed.is_ok() {
            return Err(StreamError::CaptureFailed {
                reason: "mock capture failure".to_string(),
            });
        }

        Ok(())
    }
}

/// Rebuilds an injected error for return
///
/// `StreamError` holds `io::Error`, which is not `Clone`.
fn clone_error(error: &StreamError) -> StreamError {
    match error {
        StreamError::CaptureFailed { reason } => StreamError::CaptureFailed {
            reason: reason.clone(),
        },
        StreamError::CaptureTimeout { duration_ms } => StreamError::CaptureTimeout {
            duration_ms: *duration_ms,
        },
        StreamError::BackendNotAvailable { backend } => {
            StreamError::BackendNotAvailable { backend: *backend }
        }
        StreamError::InvalidRegion { reason } => StreamError::InvalidRegion {
            reason: reason.clone(),
        },
        StreamError::EncodingFailed { format, reason } => StreamError::EncodingFailed {
            format: *format,
            reason: reason.clone(),
        },
        StreamError::ConnectionClosed => StreamError::ConnectionClosed,
        StreamError::BindFailed { addr, source } => StreamError::BindFailed {
            addr:   *addr,
            source: std::io::Error::new(source.kind(), source.to_string()),
        },
        StreamError::Io(e) => StreamError::Io(std::io::Error::new(e.kind(), e.to_string())),
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreenCapture for MockBackend {
    async fn primary_region(&self) -> StreamResult<CaptureRegion> {
        let (width, height) = self.display;
        Ok(CaptureRegion::new(0, 0, width, height))
    }

    async fn capture_region(&self, region: CaptureRegion) -> StreamResult<ImageBuffer> {
        let frame = self.captures.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;
        self.check_error_injection()?;

        if region.x < 0 || region.y < 0 {
            return Err(StreamError::InvalidRegion {
                reason: format!("Region {} starts left of or above the display", region),
            });
        }

        let (width, height) = self.display;
        let desktop = ImageBuffer::from_animated_pattern(width, height, Some(frame));
        desktop.crop(region.x as u32, region.y as u32, region.width, region.height)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mock
    }
}
