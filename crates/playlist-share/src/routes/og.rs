//! Generated playlist preview images.
//!
//! `GET /og/playlist/{id}[.png]?bgColor=<hex>` renders the playlist card
//! described in [`crate::render::og_image`]. HEAD is answered by the same
//! handler, which is what the image probe relies on.
//!
//! Images are cached in-memory by `(id, color)` to avoid regeneration on
//! repeated requests. Cards rendered from fallback metadata are not cached.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::color::Rgb;
use crate::error::ShareError;
use crate::render::og_image::{self, PlaylistCard};
use crate::resolve::{self, ShareOptions};
use crate::state::AppState;

/// Budget for downloading a cover to embed.
const COVER_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Covers larger than this are not embedded.
const MAX_COVER_BYTES: usize = 5_000_000;

#[derive(Debug, Deserialize)]
pub struct ImageParams {
    #[serde(rename = "bgColor")]
    bg_color: Option<String>,
}

/// Handle a request for a playlist preview image.
pub async fn og_image_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(params): Query<ImageParams>,
) -> Result<Response, ShareError> {
    let identifier = identifier.strip_suffix(".png").unwrap_or(&identifier);
    let playlist_id = resolve::validate_playlist_id(identifier)?;

    let background = Rgb::from_param(params.bg_color.as_deref());
    let cache_key = format!("{playlist_id}:{background}");

    if let Some(cached) = state.og_cache.get(&cache_key).await {
        tracing::debug!(key = %cache_key, "og image cache hit");
        return Ok(png_response(&cached, true));
    }

    tracing::debug!(key = %cache_key, "og image cache miss, generating");

    let color = background.to_string();
    let options = ShareOptions {
        path: None,
        background_color: Some(&color),
    };
    let resolution = resolve::resolve(&state, playlist_id, options).await;
    let metadata = &resolution.metadata;

    let cover = match &metadata.cover_image_url {
        Some(url) => fetch_cover(&state.http, url).await,
        None => None,
    };

    let card = PlaylistCard {
        title: &metadata.title,
        owner_name: &metadata.owner_name,
        video_count: metadata.video_count,
        background,
        brand: &state.config.site_name,
    };
    let png_bytes = Arc::new(og_image::render_card(&card, cover.as_deref()));

    if resolution.is_complete() {
        state.og_cache.insert(cache_key, png_bytes.clone()).await;
    }

    Ok(png_response(&png_bytes, resolution.is_complete()))
}

/// Build an HTTP response with PNG content and cache headers.
fn png_response(png_bytes: &[u8], cacheable: bool) -> Response {
    let cache_control = if cacheable {
        "public, max-age=3600, s-maxage=86400"
    } else {
        "no-store"
    };
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
        (header::CACHE_CONTROL, HeaderValue::from_static(cache_control)),
    ];

    (StatusCode::OK, headers, png_bytes.to_vec()).into_response()
}

/// Fetch a cover image for embedding.
///
/// Returns the raw image bytes, or `None` if the fetch fails.
async fn fetch_cover(http: &reqwest::Client, url: &str) -> Option<Vec<u8>> {
    let resp = match http.get(url).timeout(COVER_FETCH_TIMEOUT).send().await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(url = %url, error = %err, "cover fetch failed, using placeholder");
            return None;
        }
    };

    if !resp.status().is_success() {
        tracing::warn!(url = %url, status = resp.status().as_u16(), "cover fetch rejected, using placeholder");
        return None;
    }

    if resp
        .content_length()
        .is_some_and(|len| len > MAX_COVER_BYTES as u64)
    {
        tracing::warn!(url = %url, "cover too large, using placeholder");
        return None;
    }

    // Limit to 5MB to avoid memory issues
    let bytes = resp.bytes().await.ok()?;
    if bytes.len() > MAX_COVER_BYTES {
        tracing::warn!(url = %url, "cover too large, using placeholder");
        return None;
    }

    Some(bytes.to_vec())
}
