//! screen-stream: serve the primary display as a live multipart image stream

use std::{process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use screen_stream::{
    capture::create_backend,
    config::{Config, LogFormat},
    error::StreamError,
    frame_buffer::FrameBuffer,
    producer::FrameProducer,
    server::{self, AppState},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<StreamError>() {
                Some(stream_error) => {
                    error!(hint = stream_error.remediation_hint(), "Fatal: {:#}", e)
                }
                None => error!("Fatal: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Initializes logging
///
/// Respects RUST_LOG; default level is info for this crate.
fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("screen_stream=info"));

    match format {
        LogFormat::Text => fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_line_number(false)
            .init(),
        LogFormat::Json => fmt().json().with_env_filter(filter).init(),
    }
}

async fn run(config: Config) -> Result<()> {
    info!("screen-stream starting...");

    let backend = create_backend(config.backend.requested())?;
    let region = backend
        .primary_region()
        .await
        .context("resolve primary display bounds")?;
    info!(backend = %backend.backend_type(), %region, "Capture backend initialized");

    let buffer = Arc::new(FrameBuffer::new());
    let cancel = CancellationToken::new();

    let producer = FrameProducer::new(Arc::clone(&backend), Arc::clone(&buffer), region)
        .with_format(config.format, config.quality())
        .spawn(cancel.clone());

    let state = AppState::new(buffer, backend.backend_type(), config.format);
    let server = match server::start(config.listen, state).await {
        Ok(server) => server,
        Err(e) => {
            cancel.cancel();
            return Err(e.into());
        }
    };

    info!("Screen stream server running on http://{}", server.addr());

    tokio::select! {
        result = server.wait() => result.context("HTTP server stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupt received, shutting down"),
    }

    // Open streams are abandoned; only the producer is stopped cleanly
    cancel.cancel();
    let report = producer.await.context("frame producer task panicked")?;
    info!(
        published = report.published,
        failed = report.failed,
        "screen-stream shutting down"
    );

    Ok(())
}
