//! JSON share metadata for the interactive client.
//!
//! `GET /api/share/{id}?bgColor=<hex>` runs the same resolver and image
//! chain as the crawler snapshot, so both surfaces agree on every field.
//!
//! Format:
//! ```json
//! {
//!   "metadata": { "playlistId": "...", "title": "...", ... },
//!   "image": { "url": "...", "verified": true, "source": "generated" },
//!   "errorMessage": null,
//!   "errorKind": null
//! }
//! ```

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ShareError;
use crate::image::{self, ResolvedImage};
use crate::resolve::{self, ShareMetadata, ShareOptions};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ShareParams {
    #[serde(rename = "bgColor")]
    bg_color: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShareBody<'a> {
    metadata: &'a ShareMetadata,
    image: &'a ResolvedImage,
    /// Advisory for the UI when defaults were used.
    error_message: Option<String>,
    error_kind: Option<&'static str>,
}

pub async fn share_handler(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
    Query(params): Query<ShareParams>,
) -> Result<Response, ShareError> {
    let playlist_id = resolve::validate_playlist_id(identifier.trim())?;

    let options = ShareOptions {
        path: None,
        background_color: params.bg_color.as_deref(),
    };
    let resolution = resolve::resolve(&state, playlist_id, options).await;
    let image = image::resolve_image(
        &resolution.metadata,
        state.config.verify_mode,
        &state.probe(),
        &state.config.default_icon_url(),
    )
    .await;

    let body = ShareBody {
        metadata: &resolution.metadata,
        image: &image,
        error_message: resolution.error_message(),
        error_kind: resolution.error.as_ref().map(|e| e.kind()),
    };
    let json_string =
        serde_json::to_string_pretty(&body).map_err(|e| ShareError::Internal(e.into()))?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    let cache_control = if resolution.is_complete() {
        "public, max-age=60, s-maxage=600, stale-while-revalidate=300"
    } else {
        "no-store"
    };
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    Ok((StatusCode::OK, headers, json_string).into_response())
}
