//! Playlist Share - HTTP server for shared playlist links.
//!
//! Serves the interactive client, crawler snapshots with Open Graph tags and
//! generated preview images. Designed to be placed behind a CDN.

use std::path::Path;

use axum::http::Request;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use playlist_share::{AppState, Config, router};

/// Playlist Share - link previews and app hand-off for shared playlists.
#[derive(Parser, Debug)]
#[command(name = "playlist-share")]
#[command(about = "Share page and preview image server for playlists", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,

    /// Listen address, overriding SHARE_BIND_ADDR.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load .env file if it exists
    if Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
        eprintln!("Loaded environment from {}", args.dotenv);
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if !Path::new(&config.client_dir).join("index.html").exists() {
        tracing::warn!(
            client_dir = %config.client_dir,
            "client bundle has no index.html, interactive pages will 404"
        );
    }
    let bind_addr = config.bind_addr.clone();

    let state = AppState::new(config)?;

    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting share server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("share server stopped");
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received, stopping gracefully");
}
