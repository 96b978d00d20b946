//! Per-connection stream sessions
//!
//! A [`StreamSession`] is created for every `/frame` request. It owns only a
//! reference to the [`FrameBuffer`] and its own cursor in the multipart
//! protocol; it never mutates the buffer. The session ends when the HTTP
//! layer drops the response body, which happens as soon as a write to the
//! client fails.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::time::sleep;

use crate::{
    frame_buffer::{Frame, FrameBuffer},
    model::BOUNDARY,
};

/// Counts open and total stream sessions
#[derive(Debug, Default)]
pub struct SessionTracker {
    active: AtomicUsize,
    opened: AtomicU64,
}

impl SessionTracker {
    /// Creates a tracker with no sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions currently streaming
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Number of sessions opened since startup
    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }
}

/// Output cursor of one `/frame` client
#[derive(Debug)]
pub struct StreamSession {
    id:            u64,
    buffer:        Arc<FrameBuffer>,
    tracker:       Arc<SessionTracker>,
    period:        Duration,
    opened_at:     Instant,
    last_sequence: Option<u64>,
    parts_sent:    u64,
}

impl StreamSession {
    /// Opens a session and registers it with `tracker`
    pub fn open(buffer: Arc<FrameBuffer>, tracker: Arc<SessionTracker>, period: Duration) -> Self {
        let id = tracker.opened.fetch_add(1, Ordering::SeqCst) + 1;
        let active = tracker.active.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(session = id, active, "Stream session opened");

        Self {
            id,
            buffer,
            tracker,
            period,
            opened_at: Instant::now(),
            last_sequence: None,
            parts_sent: 0,
        }
    }

    /// Waits for a published frame and returns it framed as one part
    ///
    /// Before the first publish this polls the buffer once per period and
    /// returns nothing. Afterwards it returns immediately with the latest
    /// frame, which may be the same frame as last time.
    pub async fn next_part(&mut self) -> Bytes {
        let frame = loop {
            match self.buffer.latest() {
                Some(frame) => break frame,
                None => sleep(self.period).await,
            }
        };

        if self.last_sequence == Some(frame.sequence) {
            tracing::trace!(session = self.id, sequence = frame.sequence, "Resending frame");
        }
        self.last_sequence = Some(frame.sequence);
        self.parts_sent += 1;

        encode_part(&frame)
    }

    /// Sequence number of the last frame handed out
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    /// Number of parts handed to the HTTP layer
    ///
    /// Counts parts queued on the response body, not bytes confirmed on the
    /// socket; the last few may never reach a client that disconnected.
    pub fn parts_sent(&self) -> u64 {
        self.parts_sent
    }

    /// Delay between parts
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        let active = self.tracker.active.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::debug!(
            session = self.id,
            parts = self.parts_sent,
            duration_ms = self.opened_at.elapsed().as_millis() as u64,
            active,
            "Stream session ended (client gone or server stopping)"
        );
    }
}

/// `Content-Type` of the `/frame` response, boundary [`BOUNDARY`]
pub const MULTIPART_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

/// Frames one published frame as a multipart part
///
/// Layout: `--frame\r\n`, `Content-Type: <mime>\r\n`, `\r\n`, payload, `\r\n`.
pub fn encode_part(frame: &Frame) -> Bytes {
    let header = format!("--{}\r\nContent-Type: {}\r\n\r\n", BOUNDARY, frame.mime_type());

    let mut part = BytesMut::with_capacity(header.len() + frame.payload.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(&frame.payload);
    part.put_slice(b"\r\n");
    part.freeze()
}
