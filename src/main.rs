use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use lectern_capture::capture::CaptureController;
use lectern_capture::engine::NatsSpeechEngine;
use lectern_capture::notify::NatsNotifier;
use lectern_capture::sink::NatsTranscriptSink;
use lectern_capture::{create_router, AppState, Config, NatsClient};

#[derive(Debug, Parser)]
#[command(name = "lectern-capture", about = "Classroom voice-capture service")]
struct Args {
    /// Path to the configuration file (TOML, extension omitted)
    #[arg(long, default_value = "config/lectern-capture")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    let nats = Arc::new(NatsClient::connect(&cfg.nats.url).await?);

    let engine = Box::new(NatsSpeechEngine::new(Arc::clone(&nats)));
    let sink = Arc::new(NatsTranscriptSink::new(Arc::clone(&nats)));
    let notifier = Arc::new(NatsNotifier::new(Arc::clone(&nats)));

    let (handle, controller) =
        CaptureController::new(engine, sink, notifier, cfg.capture.tuning());
    tokio::spawn(controller.run());

    let app = create_router(AppState::new(handle));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
