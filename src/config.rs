//! Command-line configuration
//!
//! Every option can also be set through a `SCREEN_STREAM_*` environment
//! variable. There is no configuration file. The frame period is fixed.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};

use crate::{
    model::{BackendType, ImageFormat},
    producer::DEFAULT_PNG_QUALITY,
};

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Capture backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum BackendChoice {
    /// Native capture if compiled in, otherwise the mock test pattern
    #[default]
    Auto,
    /// Synthetic test pattern
    Mock,
    /// Operating system capture (requires the native-capture feature)
    Native,
}

impl BackendChoice {
    /// Backend to request, `None` for automatic selection
    pub fn requested(self) -> Option<BackendType> {
        match self {
            BackendChoice::Auto => None,
            BackendChoice::Mock => Some(BackendType::Mock),
            BackendChoice::Native => Some(BackendType::Native),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Serve the primary display as a live multipart image stream
#[derive(Debug, Clone, Parser)]
#[command(name = "screen-stream", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "SCREEN_STREAM_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// Capture backend
    #[arg(long, env = "SCREEN_STREAM_BACKEND", value_enum, default_value_t = BackendChoice::Auto)]
    pub backend: BackendChoice,

    /// Encoded frame format
    #[arg(long, env = "SCREEN_STREAM_FORMAT", value_enum, default_value_t = ImageFormat::Png)]
    pub format: ImageFormat,

    /// PNG compression effort (0-33 fast, 34-66 default, 67-100 best) or JPEG quality
    #[arg(
        long,
        env = "SCREEN_STREAM_QUALITY",
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub quality: Option<u8>,

    /// Log output format
    #[arg(long, env = "SCREEN_STREAM_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    /// Quality for the selected format, falling back to a per-format default
    ///
    /// PNG defaults to fast compression so a full-resolution frame encodes
    /// well inside one period.
    pub fn quality(&self) -> u8 {
        self.quality.unwrap_or(match self.format {
            ImageFormat::Png => DEFAULT_PNG_QUALITY,
            ImageFormat::Jpeg => DEFAULT_JPEG_QUALITY,
        })
    }
}
