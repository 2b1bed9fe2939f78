//! Crawler content negotiation.
//!
//! Social-preview fetchers do not run JavaScript, so a playlist link opened
//! by one of them gets a server-rendered snapshot carrying the share
//! metadata. Everyone else falls through to the interactive client.
//!
//! Only playlist-detail paths are ever intercepted:
//!
//! ```text
//! /playlists/{id}
//! /PlaylistDetail/{id}
//! ```

use std::sync::LazyLock;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use url::form_urlencoded;

use crate::error::ShareError;
use crate::image;
use crate::render::{components, snapshot};
use crate::resolve::{self, ShareOptions};
use crate::state::AppState;

/// User-agent substrings of known crawlers, matched case-insensitively.
pub const CRAWLER_USER_AGENTS: &[&str] = &[
    "facebookexternalhit",
    "facebookcatalog",
    "Twitterbot",
    "LinkedInBot",
    "WhatsApp",
    "Slackbot",
    "Discordbot",
    "TelegramBot",
    "Pinterest",
    "Instagram",
    "Applebot",
    "Googlebot",
    "Bingbot",
    "Slurp",
    "DuckDuckBot",
    "Baiduspider",
    "YandexBot",
    "Sogou",
    "Exabot",
    "ia_archiver",
];

/// Lowercased copy of [`CRAWLER_USER_AGENTS`], built once.
static CRAWLER_TOKENS: LazyLock<Vec<String>> = LazyLock::new(|| {
    CRAWLER_USER_AGENTS
        .iter()
        .map(|token| token.to_ascii_lowercase())
        .collect()
});

/// Playlist-detail paths whose identifier is acceptable. Anything else is
/// left to the client, for crawlers and people alike.
static PLAYLIST_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:PlaylistDetail|playlists)/([A-Za-z0-9_-]{1,128})/?$").expect("valid regex")
});

/// How a request should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Server-rendered metadata page; the request ends here.
    Snapshot,
    /// Pass through to the client bundle.
    Interactive,
}

/// Whether a user-agent belongs to a known crawler. A missing user-agent is not one.
pub fn is_crawler(user_agent: Option<&str>) -> bool {
    let Some(ua) = user_agent else {
        return false;
    };
    let ua = ua.to_ascii_lowercase();
    CRAWLER_TOKENS.iter().any(|token| ua.contains(token.as_str()))
}

/// Raw playlist identifier from a playlist-detail path.
pub fn playlist_id_from_path(path: &str) -> Option<&str> {
    PLAYLIST_PATH_RE
        .captures(path)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Decide between snapshot and pass-through for a request.
pub fn classify(user_agent: Option<&str>, path: &str) -> RenderMode {
    if playlist_id_from_path(path).is_some() && is_crawler(user_agent) {
        RenderMode::Snapshot
    } else {
        RenderMode::Interactive
    }
}

/// Middleware answering crawlers on playlist paths with a snapshot.
pub async fn negotiate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !matches!(*request.method(), Method::GET | Method::HEAD) {
        return next.run(request).await;
    }

    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());
    let path = request.uri().path();

    if classify(user_agent, path) == RenderMode::Interactive {
        return next.run(request).await;
    }

    let Some(raw_id) = playlist_id_from_path(path) else {
        return next.run(request).await;
    };

    tracing::debug!(path = %path, user_agent = ?user_agent, "serving crawler snapshot");

    let background_color = query_param(request.uri().query(), "bgColor");
    match snapshot_response(&state, raw_id, path, background_color.as_deref()).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Resolve, pick an image and render the snapshot page.
async fn snapshot_response(
    state: &AppState,
    raw_id: &str,
    path: &str,
    background_color: Option<&str>,
) -> Result<Response, ShareError> {
    let playlist_id = resolve::validate_playlist_id(raw_id)?;

    let options = ShareOptions {
        path: Some(path),
        background_color,
    };
    let resolution = resolve::resolve(state, playlist_id, options).await;
    let image = image::resolve_image(
        &resolution.metadata,
        state.config.verify_mode,
        &state.probe(),
        &state.config.default_icon_url(),
    )
    .await;

    let html = snapshot::render(&state.config, &resolution.metadata, &image).into_string();
    Ok(build_response(html, resolution.is_complete()))
}

/// HTML response with security, ETag and cache headers.
fn build_response(html: String, complete: bool) -> Response {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );

    // Security headers
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(components::CSP_HEADER),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));

    // ETag (xxHash of content)
    let hash = xxhash_rust::xxh3::xxh3_64(html.as_bytes());
    let etag = format!("\"{}\"", hex_fmt::HexFmt(&hash.to_be_bytes()));
    if let Ok(val) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, val);
    }

    // Fallback pages must not be pinned by the CDN.
    let cache_control = if complete {
        "public, max-age=60, s-maxage=600, stale-while-revalidate=300"
    } else {
        "no-store"
    };
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));

    (StatusCode::OK, headers, html).into_response()
}

/// First value of a query parameter, percent-decoded.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
