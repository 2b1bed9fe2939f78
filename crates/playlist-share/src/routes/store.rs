//! Direct app-store redirects, outside any deep-link attempt.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use crate::deeplink::{DeviceClass, StoreLinks};
use crate::error::ShareError;
use crate::state::AppState;

/// `GET /get-app`: store listing for the caller's device. Only iOS callers
/// get the App Store.
pub async fn get_app(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok());
    let device = DeviceClass::from_user_agent(user_agent);
    redirect(StoreLinks::from_config(&state.config).for_direct_action(device))
}

/// `GET /get-app/{platform}`: store listing for `ios` or `android`.
pub async fn get_app_for_platform(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Response, ShareError> {
    let device = DeviceClass::from_platform(&platform)
        .ok_or_else(|| ShareError::NotFound(format!("no store listing for '{platform}'")))?;
    Ok(redirect(
        StoreLinks::from_config(&state.config).for_direct_action(device),
    ))
}

fn redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (
            StatusCode::FOUND,
            [
                (header::LOCATION, value),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
            ],
        )
            .into_response(),
        Err(err) => ShareError::Internal(anyhow::anyhow!("invalid store URL {location:?}: {err}"))
            .into_response(),
    }
}
