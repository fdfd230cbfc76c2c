//! # Waveform Metadata API - Main Application Entry Point
//!
//! HTTP service that inspects WAV/MP3 audio (supplied inline as a data URI
//! or fetched from a URL) and returns its container metadata together with
//! waveform data produced by the `audiowaveform` CLI.
//!
//! ## Application Architecture:
//! - **config**: Layered configuration (defaults, config.toml, environment)
//! - **error**: Error type and its HTTP mapping
//! - **state**: Read-only state shared with every handler
//! - **audio**: Source classification, download, staging and metadata
//! - **waveform**: `audiowaveform` command line and process runner
//! - **handlers**: Route table and the waveform endpoint
//! - **health**: Liveness check
//! - **middleware**: Request id and request logging

mod audio;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;
mod waveform;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Set once SIGINT or SIGTERM has been received.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

/// Loads configuration, starts the HTTP server and waits for either the
/// server to exit or a shutdown signal.
///
/// ## Startup Order:
/// 1. `.env` and tracing
/// 2. Configuration load and validation (errors abort startup)
/// 3. Server bind
/// 4. Signal handlers and graceful stop
#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("Starting waveform-metadata-api v{}", env!("CARGO_PKG_VERSION"));
    info!(
        host = %config.server.host,
        port = config.server.port,
        tool = %config.waveform.binary,
        max_audio_bytes = config.fetch.max_audio_bytes,
        "Configuration loaded"
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let max_request_bytes = config.max_request_bytes();
    let app_state = AppState::new(config);

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            // Last wrap runs first, so the request span encloses the handler.
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::RequestLogging)
            .configure(|cfg| handlers::configure_routes(cfg, max_request_bytes))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task error: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("Server stopped gracefully");
    Ok(())
}

/// Console logging filtered by `RUST_LOG`, defaulting to
/// `waveform_metadata_api=debug,actix_web=info`.
fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waveform_metadata_api=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

/// Flip [`SHUTDOWN_SIGNAL`] on the first SIGTERM or SIGINT.
#[cfg(unix)]
fn setup_signal_handlers() {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async {
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

#[cfg(not(unix))]
fn setup_signal_handlers() {
    tokio::spawn(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C");
                SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
            }
            Err(e) => error!("Failed to install Ctrl-C handler: {}", e),
        }
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
