//! Route definitions for the share service.
//!
//! ## Routes
//!
//! - `GET /health` - Health check (JSON)
//! - `GET /robots.txt` - Crawler instructions
//! - `GET /og/playlist/{id}[.png]` - Generated preview image
//! - `GET /api/share/{id}` - Share metadata for the interactive client
//! - `GET /get-app[/{platform}]` - Redirect to the app store listing
//! - anything else - Interactive client bundle, with SPA fallback to `index.html`
//!
//! Crawlers requesting `/playlists/{id}` or `/PlaylistDetail/{id}` are
//! answered by the [`negotiate`](crate::negotiate) middleware instead.

mod health;
mod og;
mod share;
mod store;

use std::path::Path;

use axum::Router;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::services::{ServeDir, ServeFile};

use crate::negotiate;
use crate::state::AppState;

/// Build the complete share service router.
pub fn router(state: AppState) -> Router {
    let client_dir = Path::new(&state.config.client_dir);
    let client = ServeDir::new(client_dir).fallback(ServeFile::new(client_dir.join("index.html")));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/robots.txt", get(robots_txt))
        .route("/og/playlist/{id}", get(og::og_image_handler))
        .route("/api/share/{id}", get(share::share_handler))
        .route("/get-app", get(store::get_app))
        .route("/get-app/{platform}", get(store::get_app_for_platform))
        .fallback_service(client)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            negotiate::negotiate,
        ))
        .with_state(state)
}

/// Serve robots.txt allowing all crawlers.
///
/// We want crawlers to fetch playlist pages for link previews.
async fn robots_txt() -> impl IntoResponse {
    (
        [("content-type", "text/plain; charset=utf-8")],
        "User-agent: *\nAllow: /\n",
    )
}
