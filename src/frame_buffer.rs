//! Shared latest-frame slot
//!
//! [`FrameBuffer`] is the only state shared between the frame producer and
//! the stream sessions. It holds `Option<Arc<Frame>>` inside a
//! `tokio::sync::watch` channel:
//!
//! - publishing swaps in a new, fully built, immutable [`Frame`];
//! - readers clone the `Arc` under a short read borrow and then work on their
//!   own reference, so a reader never observes a half-written payload and a
//!   writer never waits on a slow reader.
//!
//! Readers are not guaranteed to observe every frame; they get the most
//! recent one available.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::ImageFormat;

/// One encoded, published frame
///
/// Immutable once published; shared by every reader through `Arc`.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Publish order, starting at 1
    pub sequence:    u64,
    /// Encoded image bytes
    pub payload:     Bytes,
    /// Encoding of `payload`
    pub format:      ImageFormat,
    /// Width of the captured image in pixels
    pub width:       u32,
    /// Height of the captured image in pixels
    pub height:      u32,
    /// Wall-clock time the capture started
    pub captured_at: DateTime<Utc>,
    /// Monotonic publish time
    published_at:    Instant,
}

impl Frame {
    /// Time elapsed since this frame was published
    pub fn age(&self) -> Duration {
        self.published_at.elapsed()
    }

    /// Monotonic publish time
    pub fn published_at(&self) -> Instant {
        self.published_at
    }

    /// Media type of the payload
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Single-writer, many-reader slot holding the latest published frame
///
/// Constructed empty once at startup and shared by `Arc` with the producer
/// and every stream session.
#[derive(Debug)]
pub struct FrameBuffer {
    slot: watch::Sender<Option<Arc<Frame>>>,
}

impl FrameBuffer {
    /// Creates an empty buffer ("no frame yet")
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot }
    }

    /// Publishes a new frame and returns it
    ///
    /// The frame is fully constructed before the swap, so readers see either
    /// the previous frame or this one.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::Utc;
    /// use screen_stream::{frame_buffer::FrameBuffer, model::ImageFormat};
    ///
    /// let buffer = FrameBuffer::new();
    /// assert!(buffer.latest().is_none());
    ///
    /// let frame = buffer.publish("abc".into(), ImageFormat::Png, (1, 1), Utc::now());
    /// assert_eq!(frame.sequence, 1);
    /// assert_eq!(buffer.latest().unwrap().payload, "abc");
    /// ```
    pub fn publish(
        &self,
        payload: Bytes,
        format: ImageFormat,
        (width, height): (u32, u32),
        captured_at: DateTime<Utc>,
    ) -> Arc<Frame> {
        let mut published = None;

        self.slot.send_modify(|slot| {
            let sequence = slot.as_ref().map_or(1, |previous| previous.sequence + 1);
            let frame = Arc::new(Frame {
                sequence,
                payload,
                format,
                width,
                height,
                captured_at,
                published_at: Instant::now(),
            });
            published = Some(Arc::clone(&frame));
            *slot = Some(frame);
        });

        // send_modify always runs the closure
        published.unwrap_or_else(|| unreachable!("frame slot was not updated"))
    }

    /// Returns the latest published frame, or `None` before the first publish
    pub fn latest(&self) -> Option<Arc<Frame>> {
        self.slot.borrow().clone()
    }

    /// Number of frames published so far
    pub fn frames_published(&self) -> u64 {
        self.slot.borrow().as_ref().map_or(0, |frame| frame.sequence)
    }

    /// Returns a receiver that is notified on every publish
    ///
    /// Sessions poll [`latest`](Self::latest) on a fixed period; this is for
    /// callers that would rather wait for the next frame.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Frame>>> {
        self.slot.subscribe()
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
