//! Shared test utilities for integration tests
//!
//! - [`StreamHarness`]: mock backend, frame buffer and router wired together
//! - [`parse_parts`]: parser for the `/frame` multipart grammar
//! - [`read_parts`]: pulls whole parts out of a response body
//! - [`FrameRecorder`]: keeps every published frame for later lookup

#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use futures::StreamExt;
use screen_stream::{
    capture::{MockBackend, ScreenCapture},
    frame_buffer::{Frame, FrameBuffer},
    model::{BackendType, ImageFormat},
    producer::FrameProducer,
    server::{AppState, app},
};
use tokio::{
    io::AsyncWriteExt,
    net::{TcpSocket, TcpStream},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Period used by tests; short so suites finish quickly
pub const TEST_PERIOD: Duration = Duration::from_millis(10);

/// Mock display size used by tests
pub const TEST_DISPLAY: (u32, u32) = (64, 48);

/// One parsed multipart part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Value of the part's Content-Type header
    pub content_type: String,
    /// Raw payload bytes
    pub payload:      Vec<u8>,
}

/// Parses a byte stream of whole parts
///
/// Grammar per part: `--frame\r\n`, `Content-Type: <type>\r\n`, `\r\n`,
/// payload, `\r\n`. The payload runs until the next `\r\n--frame\r\n`, or
/// until the final `\r\n` for the last part.
pub fn parse_parts(data: &[u8]) -> Result<Vec<Part>, String> {
    const OPEN: &[u8] = b"--frame\r\n";
    const NEXT: &[u8] = b"\r\n--frame\r\n";

    let mut parts = Vec::new();
    let mut rest = data;

    while !rest.is_empty() {
        rest = rest
            .strip_prefix(OPEN)
            .ok_or_else(|| format!("part {} does not start with the boundary", parts.len()))?;

        let header_end = find(rest, b"\r\n\r\n")
            .ok_or_else(|| format!("part {} has no header terminator", parts.len()))?;
        let header = std::str::from_utf8(&rest[..header_end])
            .map_err(|e| format!("part {} header is not UTF-8: {}", parts.len(), e))?;
        let content_type = header
            .strip_prefix("Content-Type: ")
            .ok_or_else(|| format!("part {} header is {:?}", parts.len(), header))?
            .to_string();
        rest = &rest[header_end + 4..];

        let payload_end = match find(rest, NEXT) {
            Some(end) => end,
            None => {
                if !rest.ends_with(b"\r\n") {
                    return Err(format!("part {} lacks trailing CRLF", parts.len()));
                }
                rest.len() - 2
            }
        };

        parts.push(Part {
            content_type,
            payload: rest[..payload_end].to_vec(),
        });
        rest = &rest[payload_end + 2..];
    }

    Ok(parts)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Reads body chunks until `count` whole parts arrived or `timeout` elapsed
///
/// The server emits exactly one part per chunk.
pub async fn read_parts(response: Response<Body>, count: usize, timeout: Duration) -> Vec<Part> {
    let mut stream = response.into_body().into_data_stream();
    let mut data = Vec::new();
    let mut chunks = 0;

    let _ = tokio::time::timeout(timeout, async {
        while chunks < count {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    data.extend_from_slice(&chunk);
                    chunks += 1;
                }
                _ => break,
            }
        }
    })
    .await;

    parse_parts(&data).expect("stream should follow the multipart grammar")
}

/// Sends a GET request through the router without a socket
pub async fn get(router: Router, uri: &str) -> Response<Body> {
    router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Mock backend, frame buffer and HTTP state wired together
pub struct StreamHarness {
    pub backend: Arc<MockBackend>,
    pub buffer:  Arc<FrameBuffer>,
    pub state:   AppState,
    pub cancel:  CancellationToken,
}

impl StreamHarness {
    /// Creates the harness without starting a producer
    pub fn new() -> Self {
        let (width, height) = TEST_DISPLAY;
        Self::with_backend(MockBackend::new().with_display_size(width, height))
    }

    /// Creates the harness around a preconfigured mock backend
    pub fn with_backend(backend: MockBackend) -> Self {
        let backend = Arc::new(backend);
        let buffer = Arc::new(FrameBuffer::new());
        let state = AppState::new(Arc::clone(&buffer), BackendType::Mock, ImageFormat::Png)
            .with_period(TEST_PERIOD);

        Self {
            backend,
            buffer,
            state,
            cancel: CancellationToken::new(),
        }
    }

    /// Router serving this harness's state
    pub fn router(&self) -> Router {
        app(self.state.clone())
    }

    /// Builds a producer over the harness's backend and buffer
    pub async fn producer(&self) -> FrameProducer {
        let region = self.backend.primary_region().await.unwrap();
        let backend: Arc<dyn ScreenCapture> = self.backend.clone();
        FrameProducer::new(backend, Arc::clone(&self.buffer), region).with_period(TEST_PERIOD)
    }

    /// Starts the producer on a background task
    pub async fn start_producer(&self) -> JoinHandle<screen_stream::producer::ProducerReport> {
        self.producer().await.spawn(self.cancel.clone())
    }

    /// Waits until at least `count` frames were published
    pub async fn wait_for_frames(&self, count: u64) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while self.buffer.frames_published() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("producer should publish frames");
    }
}

/// Records every frame published to a buffer
///
/// Start it before the producer so frame 1 is not missed.
pub struct FrameRecorder {
    frames: Arc<Mutex<Vec<Arc<Frame>>>>,
    task:   JoinHandle<()>,
}

impl FrameRecorder {
    /// Subscribes to `buffer` and records frames on a background task
    pub fn start(buffer: &FrameBuffer) -> Self {
        let mut rx = buffer.subscribe();
        let frames = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&frames);
        let task = tokio::spawn(async move {
            loop {
                let latest = rx.borrow_and_update().clone();
                if let Some(frame) = latest {
                    sink.lock().unwrap().push(frame);
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });

        Self { frames, task }
    }

    /// Recorded frame with the given sequence number
    pub fn get(&self, sequence: u64) -> Option<Arc<Frame>> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .find(|frame| frame.sequence == sequence)
            .cloned()
    }

    /// Number of frames recorded so far
    pub fn len(&self) -> usize {
        self.frames.lock().unwrap().len()
    }
}

impl Drop for FrameRecorder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Opens a raw `GET /frame` connection that is never read from
///
/// The receive buffer is kept small so the server's writes back up quickly.
pub async fn open_stalled_stream(addr: std::net::SocketAddr) -> TcpStream {
    let socket = TcpSocket::new_v4().unwrap();
    socket.set_recv_buffer_size(4096).unwrap();
    let mut stream = socket.connect(addr).await.unwrap();
    stream
        .write_all(b"GET /frame HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    stream
}

impl Drop for StreamHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
