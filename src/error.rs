//! Error types for frame capture, encoding and streaming
//!
//! Every failure the service can hit is a variant of [`StreamError`]. The
//! variants fall into three classes:
//!
//! - **Transient** (capture, encode, region): raised inside the frame
//!   producer, logged, and the tick is skipped. Readers keep seeing the last
//!   good frame.
//! - **Per-session** (connection closed): ends one `/frame` stream and nothing
//!   else.
//! - **Fatal** (bind): the process cannot serve anything and exits.
//!
//! Each error provides an actionable [`remediation_hint`](StreamError::remediation_hint).

use std::net::SocketAddr;

use crate::model::{BackendType, ImageFormat};

/// Result type alias for capture, encode and server operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Error type for the capture/encode pipeline and the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The screen-capture primitive failed for this tick
    #[error("Screen capture failed: {reason}")]
    CaptureFailed {
        /// Reason reported by the capture backend
        reason: String,
    },

    /// Capture did not complete in time
    #[error("Capture operation timed out after {duration_ms}ms")]
    CaptureTimeout {
        /// Timeout duration in milliseconds
        duration_ms: u64,
    },

    /// Requested backend is not available
    #[error("Backend {backend} is not available on this platform")]
    BackendNotAvailable {
        /// Backend type that's unavailable
        backend: BackendType,
    },

    /// The capture region does not fit the captured image
    #[error("Invalid capture region: {reason}")]
    InvalidRegion {
        /// Why the region was rejected
        reason: String,
    },

    /// Image encoding failed
    #[error("Failed to encode frame as {format}: {reason}")]
    EncodingFailed {
        /// Image format that failed
        format: ImageFormat,
        /// Reason for encoding failure
        reason: String,
    },

    /// The client of a stream session went away
    #[error("Stream client disconnected")]
    ConnectionClosed,

    /// The HTTP listener could not acquire its address
    #[error("Failed to bind HTTP listener on {addr}: {source}")]
    BindFailed {
        /// Address that could not be bound
        addr:   SocketAddr,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// Returns true if the producer should skip the tick and keep running
    ///
    /// Capture and encode failures are transient. Connection, bind and I/O
    /// errors are not retried by the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StreamError::CaptureFailed { .. }
                | StreamError::CaptureTimeout { .. }
                | StreamError::BackendNotAvailable { .. }
                | StreamError::InvalidRegion { .. }
                | StreamError::EncodingFailed { .. }
        )
    }

    /// Returns an actionable remediation hint for this error
    ///
    /// # Examples
    ///
    /// ```
    /// use screen_stream::{error::StreamError, model::BackendType};
    ///
    /// let error = StreamError::BackendNotAvailable {
    ///     backend: BackendType::Native,
    /// };
    /// assert!(error.remediation_hint().contains("native-capture"));
    /// ```
    pub fn remediation_hint(&self) -> &str {
        match self {
            StreamError::CaptureFailed { .. } => {
                "The display could not be read. On Linux check that DISPLAY or WAYLAND_DISPLAY is \
                 set; on macOS grant Screen Recording permission. The last good frame stays on \
                 screen until capture recovers."
            }
            StreamError::CaptureTimeout { .. } => {
                "The capture call took too long. The desktop may be under heavy load or a \
                 permission dialog may be open."
            }
            StreamError::BackendNotAvailable { backend } => match backend {
                BackendType::Native => {
                    "Native capture requires building with the native-capture feature and a \
                     running graphical session. Use --backend mock to stream a test pattern."
                }
                BackendType::Mock => "The mock backend is always available; this is a bug.",
            },
            StreamError::InvalidRegion { .. } => {
                "The display resolution changed after startup. Restart the server to pick up \
                 the new display bounds."
            }
            StreamError::EncodingFailed { format, .. } => match format {
                ImageFormat::Jpeg => {
                    "JPEG encoding failed. Try a different quality or switch to --format png."
                }
                ImageFormat::Png => "PNG encoding failed. Try --format jpeg as a fallback.",
            },
            StreamError::ConnectionClosed => {
                "The viewer closed the connection. Reload the page to reconnect."
            }
            StreamError::BindFailed { .. } => {
                "Another process may already be listening on this address, or the port needs \
                 elevated privileges. Choose a different address with --listen."
            }
            StreamError::Io(_) => {
                "An I/O error occurred. Check system resources and network configuration."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_failed_is_transient() {
        let error = StreamError::CaptureFailed {
            reason: "no display".to_string(),
        };

        assert!(error.is_transient());
        assert!(error.to_string().contains("no display"));
        assert!(error.remediation_hint().contains("last good frame"));
    }

    #[test]
    fn test_encoding_failed_message() {
        let error = StreamError::EncodingFailed {
            format: ImageFormat::Png,
            reason: "zero-sized image".to_string(),
        };

        let msg = error.to_string();
        assert!(msg.contains("png"));
        assert!(msg.contains("zero-sized image"));
        assert!(error.is_transient());
        assert!(error.remediation_hint().contains("--format jpeg"));
    }

    #[test]
    fn test_jpeg_encoding_remediation() {
        let error = StreamError::EncodingFailed {
            format: ImageFormat::Jpeg,
            reason: "bad quality".to_string(),
        };

        assert!(error.remediation_hint().contains("--format png"));
    }

    #[test]
    fn test_bind_failed_is_fatal() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let error = StreamError::BindFailed {
            addr,
            source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
        };

        assert!(!error.is_transient());
        assert!(error.to_string().contains("127.0.0.1:8080"));
        assert!(error.remediation_hint().contains("--listen"));
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_connection_closed_is_not_transient() {
        let error = StreamError::ConnectionClosed;
        assert!(!error.is_transient());
        assert!(error.remediation_hint().contains("Reload"));
    }

    #[test]
    fn test_backend_not_available_hints() {
        let native = StreamError::BackendNotAvailable {
            backend: BackendType::Native,
        };
        assert!(native.remediation_hint().contains("--backend mock"));
        assert!(native.to_string().contains("native"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let error: StreamError = io.into();

        assert!(matches!(error, StreamError::Io(_)));
        assert!(!error.is_transient());
    }
}
