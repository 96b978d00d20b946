//! Periodic capture, encode and publish loop
//!
//! [`FrameProducer`] keeps the [`FrameBuffer`] a near-real-time mirror of the
//! screen. Every tick it captures the configured region, encodes it on the
//! blocking pool and publishes the result, then sleeps one period (fixed
//! delay after the work, so ticks drift under load and frames are skipped
//! rather than queued).
//!
//! Capture and encode failures are logged and skip the tick; the previous
//! frame stays visible. The loop only ends when its cancellation token fires.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use chrono::Utc;
use tokio::{task::JoinHandle, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::{
    capture::ScreenCapture,
    error::{StreamError, StreamResult},
    frame_buffer::{Frame, FrameBuffer},
    model::{CaptureRegion, FRAME_PERIOD, ImageFormat},
    util::encode::encode_frame,
};

/// Consecutive failed ticks (about one second) before escalating to `error`
const FAILURE_STREAK_ALERT: u32 = 30;

/// PNG quality used when none is configured (fast compression)
pub const DEFAULT_PNG_QUALITY: u8 = 0;

/// Counters returned when the producer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Frames published
    pub published: u64,
    /// Ticks skipped because capture or encoding failed
    pub failed:    u64,
}

/// Captures, encodes and publishes frames on a fixed period
pub struct FrameProducer {
    backend: Arc<dyn ScreenCapture>,
    buffer:  Arc<FrameBuffer>,
    region:  CaptureRegion,
    format:  ImageFormat,
    quality: u8,
    period:  Duration,
}

impl FrameProducer {
    /// Creates a PNG producer for `region` running at [`FRAME_PERIOD`]
    pub fn new(
        backend: Arc<dyn ScreenCapture>,
        buffer: Arc<FrameBuffer>,
        region: CaptureRegion,
    ) -> Self {
        Self {
            backend,
            buffer,
            region,
            format: ImageFormat::Png,
            quality: DEFAULT_PNG_QUALITY,
            period: FRAME_PERIOD,
        }
    }

    /// Sets the output format and its quality (PNG effort or JPEG quality)
    pub fn with_format(mut self, format: ImageFormat, quality: u8) -> Self {
        self.format = format;
        self.quality = quality;
        self
    }

    /// Overrides the tick period
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Runs one capture, encode and publish cycle
    ///
    /// On error nothing is published.
    pub async fn tick(&self) -> StreamResult<Arc<Frame>> {
        let captured_at = Utc::now();
        let image = self.backend.capture_region(self.region).await?;
        let dimensions = image.dimensions();

        let format = self.format;
        let quality = self.quality;
        let payload = tokio::task::spawn_blocking(move || encode_frame(&image, format, quality))
            .await
            .map_err(|e| StreamError::EncodingFailed {
                format,
                reason: format!("encoder task panicked: {}", e),
            })??;

        Ok(self
            .buffer
            .publish(Bytes::from(payload), format, dimensions, captured_at))
    }

    /// Runs the tick loop until `cancel` fires
    ///
    /// Cancellation is checked before every tick and raced against both the
    /// tick and the sleep, so the loop exits within one iteration and an
    /// abandoned tick publishes nothing.
    pub async fn run(self, cancel: CancellationToken) -> ProducerReport {
        let mut report = ProducerReport::default();
        let mut failure_streak: u32 = 0;

        info!(
            backend = %self.backend.backend_type(),
            region = %self.region,
            format = %self.format,
            period_ms = self.period.as_millis() as u64,
            "Frame producer started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            match outcome {
                Ok(frame) => {
                    report.published += 1;
                    if failure_streak >= FAILURE_STREAK_ALERT {
                        info!(failed_ticks = failure_streak, "Screen capture recovered");
                    }
                    failure_streak = 0;
                    trace!(
                        sequence = frame.sequence,
                        bytes = frame.payload.len(),
                        "Published frame"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    failure_streak = failure_streak.saturating_add(1);
                    if e.is_transient() {
                        warn!(error = %e, hint = e.remediation_hint(), "Skipping frame");
                    } else {
                        error!(
                            error = %e,
                            hint = e.remediation_hint(),
                            "Skipping frame after unexpected error"
                        );
                    }
                    if failure_streak == FAILURE_STREAK_ALERT {
                        error!(
                            failed_ticks = failure_streak,
                            "Screen capture keeps failing; viewers see a stale frame"
                        );
                    }
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep(self.period) => {}
            }
        }

        debug!(
            published = report.published,
            failed = report.failed,
            "Frame producer stopped"
        );
        report
    }

    /// Spawns [`run`](Self::run) on the tokio runtime
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<ProducerReport> {
        tokio::spawn(self.run(cancel))
    }
}
