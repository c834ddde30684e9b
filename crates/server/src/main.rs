//! rehost server entry point.
//!
//! Boots the HTTP front end that replays the archive found under the
//! configured base directory. Logs are JSON on stderr.

use std::sync::Arc;

use anyhow::Result;
use axum::http::Request;
use rehost_core::{AppConfig, ArchiveRoot};
use rehost_engine::Replayer;
use rehost_server::{AppState, router};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(AppConfig::load()?);
    let replayer = Replayer::new(config.clone())?;

    // The archive is located again per request; this only reports what is there now.
    match ArchiveRoot::locate(&config).await {
        Ok(root) => tracing::info!(root = %root.path().display(), "archive root found"),
        Err(e) => tracing::warn!(error = %e, "no usable archive root yet"),
    }

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    let state = AppState::new(replayer).with_local_port(local_addr.port());

    let app = router(state).layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
        tracing::span!(
            Level::INFO,
            "http_request",
            method = %request.method(),
            path = %request.uri().path(),
            query = request.uri().query().unwrap_or("")
        )
    }));

    tracing::info!(addr = %local_addr, cms_mode = ?config.cms_mode, "starting rehost");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("rehost stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
