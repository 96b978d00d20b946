//! HTTP surface
//!
//! Routes:
//!
//! - `GET /` - static viewer page embedding `<img src="/frame">`
//! - `GET /frame` - never-ending `multipart/x-mixed-replace` stream, one part
//!   per period, one [`StreamSession`] per connection
//! - `GET /healthz` - JSON status ([`HealthCheckResponse`])
//!
//! Each connection is served on its own tokio task, so a slow client only
//! throttles its own session.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderValue, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tokio::{net::TcpListener, task::JoinHandle};

use crate::{
    error::{StreamError, StreamResult},
    frame_buffer::FrameBuffer,
    model::{BackendType, FRAME_PERIOD, HealthCheckResponse, ImageFormat},
};

pub mod session;

pub use session::{MULTIPART_CONTENT_TYPE, SessionTracker, StreamSession, encode_part};

/// Viewer page served at `/`
pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Screen Stream</title>
    <style>
        body { margin: 0; background: #111; }
        .stream { text-align: center; }
        .stream img { max-width: 100%; height: auto; }
    </style>
</head>
<body>
    <div class="stream">
        <img src="/frame" alt="Screen Stream">
    </div>
</body>
</html>
"#;

/// State shared by every request handler
#[derive(Debug, Clone)]
pub struct AppState {
    buffer:   Arc<FrameBuffer>,
    sessions: Arc<SessionTracker>,
    backend:  BackendType,
    format:   ImageFormat,
    period:   Duration,
}

impl AppState {
    /// Creates handler state around the shared frame buffer
    pub fn new(buffer: Arc<FrameBuffer>, backend: BackendType, format: ImageFormat) -> Self {
        Self {
            buffer,
            sessions: Arc::new(SessionTracker::new()),
            backend,
            format,
            period: FRAME_PERIOD,
        }
    }

    /// Overrides the delay between stream parts
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Session counters, shared with every clone of this state
    pub fn sessions(&self) -> &Arc<SessionTracker> {
        &self.sessions
    }
}

/// Builds the router for the viewer page, the stream and the health check
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/frame", get(frame_stream))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    let latest = state.buffer.latest();

    Json(HealthCheckResponse {
        ok:               true,
        backend:          state.backend,
        format:           state.format,
        frames_published: state.buffer.frames_published(),
        last_frame_at:    latest.map(|frame| frame.captured_at),
        active_sessions:  state.sessions.active(),
    })
}

async fn frame_stream(State(state): State<AppState>) -> Response {
    let mut session = StreamSession::open(
        Arc::clone(&state.buffer),
        Arc::clone(&state.sessions),
        state.period,
    );

    // Each part is yielded as its own chunk, which hyper writes out as soon as
    // it is produced. When the client goes away hyper drops the stream, and
    // the session with it.
    let parts = async_stream::stream! {
        loop {
            let part = session.next_part().await;
            yield Ok::<_, std::io::Error>(part);
            tokio::time::sleep(session.period()).await;
        }
    };

    let mut response = Response::new(Body::from_stream(parts));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(MULTIPART_CONTENT_TYPE),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response.into_response()
}

/// Binds the HTTP listener
///
/// # Errors
///
/// Returns [`StreamError::BindFailed`] if the address cannot be acquired.
pub async fn bind(addr: SocketAddr) -> StreamResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| StreamError::BindFailed { addr, source })
}

/// Handle to a server running on a background task
pub struct RunningServer {
    addr: SocketAddr,
    join: Option<JoinHandle<StreamResult<()>>>,
}

impl RunningServer {
    /// Address the listener is bound to
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits until the server task exits
    ///
    /// Serving normally never returns; this only resolves on an accept-loop
    /// error or a panic.
    pub async fn wait(mut self) -> StreamResult<()> {
        match self.join.take() {
            Some(join) => join.await.map_err(|e| {
                StreamError::Io(std::io::Error::other(format!("server task failed: {}", e)))
            })?,
            None => Ok(()),
        }
    }
}

impl Drop for RunningServer {
    fn drop(&mut self) {
        // Open streams never finish on their own, so there is nothing to drain
        if let Some(join) = self.join.take() {
            join.abort();
        }
    }
}

/// Binds `addr` and serves [`app`] on a background task
///
/// # Errors
///
/// Returns [`StreamError::BindFailed`] if the listener cannot be bound.
pub async fn start(addr: SocketAddr, state: AppState) -> StreamResult<RunningServer> {
    let listener = bind(addr).await?;
    let addr = listener.local_addr()?;
    let router = app(state);

    let join = tokio::spawn(async move {
        axum::serve(listener, router).await?;
        Ok::<(), StreamError>(())
    });

    tracing::info!("HTTP server listening on http://{}", addr);

    Ok(RunningServer {
        addr,
        join: Some(join),
    })
}
