//! Playlist backend client.
//!
//! One bounded GET against the backend's public playlist summary endpoint.
//! Every failure mode is classified into a [`ResolverError`] so callers can
//! substitute defaults instead of failing the render.

use axum::http::header;
use serde::Deserialize;

use crate::config::Config;
use crate::error::ResolverError;

/// Owner name used when the backend gives neither a full name nor a handle.
pub const UNKNOWN_OWNER: &str = "Unknown";

/// Normalized playlist summary, as fetched from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistSummary {
    /// Playlist identifier.
    pub id: String,
    /// Display name, if the backend has a non-empty one.
    pub name: Option<String>,
    /// Owner's full name, else handle, else [`UNKNOWN_OWNER`].
    pub owner_name: String,
    /// Number of videos in the playlist.
    pub video_count: u64,
    /// Cover image reference: absolute URL or backend-relative path.
    pub image_ref: Option<String>,
}

/// Response envelope of `GET /playlists/public/{id}`.
#[derive(Debug, Deserialize)]
struct SummaryEnvelope {
    #[serde(default)]
    data: Option<PlaylistPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    owner: Option<OwnerPayload>,
    #[serde(default)]
    video_count: Option<u64>,
    #[serde(default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Error body shape the backend uses for non-2xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Fetch and normalize the public summary of a playlist.
pub async fn fetch_playlist_summary(
    http: &reqwest::Client,
    config: &Config,
    id: &str,
) -> Result<PlaylistSummary, ResolverError> {
    let url = config.playlist_summary_url(id);
    tracing::debug!(playlist_id = %id, url = %url, "fetching playlist summary");

    let mut request = http
        .get(&url)
        .timeout(config.fetch_timeout)
        .header(header::ACCEPT, "application/json");

    // Tunnelling proxies serve a browser warning page unless told otherwise.
    if config.backend_url.contains("ngrok") {
        request = request.header("ngrok-skip-browser-warning", "true");
    }

    let response = request
        .send()
        .await
        .map_err(|e| unreachable(config, &e))?;

    let status = response.status();
    let body = response.text().await.map_err(|e| unreachable(config, &e))?;

    if !status.is_success() {
        return Err(upstream_error(status, &body));
    }

    parse_summary(id, &body)
}

/// Parse a 2xx response body into a summary.
///
/// HTML is sniffed before any JSON parsing is attempted.
pub fn parse_summary(id: &str, body: &str) -> Result<PlaylistSummary, ResolverError> {
    if looks_like_html(body) {
        return Err(ResolverError::UnexpectedContentType);
    }

    let envelope: SummaryEnvelope =
        serde_json::from_str(body).map_err(|e| ResolverError::MalformedPayload {
            detail: e.to_string(),
        })?;

    let data = envelope.data.ok_or_else(|| ResolverError::MalformedPayload {
        detail: "response has no data object".to_string(),
    })?;

    let owner_name = data
        .owner
        .and_then(|o| non_empty(o.name).or_else(|| non_empty(o.username)))
        .unwrap_or_else(|| UNKNOWN_OWNER.to_string());

    Ok(PlaylistSummary {
        id: id.to_string(),
        name: non_empty(data.name),
        owner_name,
        video_count: data.video_count.unwrap_or(0),
        image_ref: non_empty(data.image_url),
    })
}

/// Whether a body is an HTML document rather than JSON.
pub fn looks_like_html(body: &str) -> bool {
    let head = body.trim_start().as_bytes();
    starts_with_ignore_case(head, b"<!doctype") || starts_with_ignore_case(head, b"<html")
}

fn starts_with_ignore_case(haystack: &[u8], prefix: &[u8]) -> bool {
    haystack.len() >= prefix.len() && haystack[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn unreachable(config: &Config, err: &reqwest::Error) -> ResolverError {
    ResolverError::BackendUnreachable {
        backend_url: config.backend_url.clone(),
        detail: err.to_string(),
    }
}

/// Build an [`ResolverError::UpstreamError`] with the best available message.
fn upstream_error(status: reqwest::StatusCode, body: &str) -> ResolverError {
    let message = if looks_like_html(body) {
        "Received HTML instead of JSON. This might be a redirect or error page.".to_string()
    } else {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| non_empty(b.error).or_else(|| non_empty(b.message)))
            .unwrap_or_else(|| {
                let reason = status
                    .canonical_reason()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
                format!("Failed to load playlist: {reason}")
            })
    };

    ResolverError::UpstreamError {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_summary() {
        let body = r#"{"data":{"name":"Leg Day","owner":{"name":"Avery","username":"avery"},"videoCount":7,"imageUrl":"/covers/abc123.jpg"}}"#;
        let summary = parse_summary("abc123", body).unwrap();
        assert_eq!(summary.id, "abc123");
        assert_eq!(summary.name.as_deref(), Some("Leg Day"));
        assert_eq!(summary.owner_name, "Avery");
        assert_eq!(summary.video_count, 7);
        assert_eq!(summary.image_ref.as_deref(), Some("/covers/abc123.jpg"));
    }

    #[test]
    fn owner_falls_back_to_username() {
        let body = r#"{"data":{"name":"x","owner":{"username":"avery"}}}"#;
        assert_eq!(parse_summary("id", body).unwrap().owner_name, "avery");
    }

    #[test]
    fn owner_empty_name_falls_back_to_username() {
        let body = r#"{"data":{"name":"x","owner":{"name":"","username":"avery"}}}"#;
        assert_eq!(parse_summary("id", body).unwrap().owner_name, "avery");
    }

    #[test]
    fn owner_missing_is_unknown() {
        let body = r#"{"data":{"name":"x"}}"#;
        let summary = parse_summary("id", body).unwrap();
        assert_eq!(summary.owner_name, UNKNOWN_OWNER);
        assert_eq!(summary.video_count, 0);
        assert!(summary.image_ref.is_none());
    }

    #[test]
    fn blank_name_is_none() {
        let body = r#"{"data":{"name":"   ","videoCount":2}}"#;
        assert!(parse_summary("id", body).unwrap().name.is_none());
    }

    #[test]
    fn html_body_is_unexpected_content_type() {
        let body = "<!doctype html><html><body>You are about to visit...</body></html>";
        assert_eq!(
            parse_summary("id", body).unwrap_err(),
            ResolverError::UnexpectedContentType
        );
    }

    #[test]
    fn html_sniff_ignores_case_and_leading_whitespace() {
        assert!(looks_like_html("\n  <!DOCTYPE HTML>"));
        assert!(looks_like_html("<HTML lang=en>"));
        assert!(!looks_like_html("{\"data\":{}}"));
        assert!(!looks_like_html(""));
        assert!(!looks_like_html("<!do"));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_summary("id", "{not json").unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn missing_data_is_malformed() {
        let err = parse_summary("id", r#"{"message":"ok"}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn negative_count_is_malformed() {
        let err = parse_summary("id", r#"{"data":{"videoCount":-3}}"#).unwrap_err();
        assert_eq!(err.kind(), "malformed_payload");
    }

    #[test]
    fn upstream_message_from_error_field() {
        let err = upstream_error(
            reqwest::StatusCode::NOT_FOUND,
            r#"{"error":"Playlist not found"}"#,
        );
        assert_eq!(
            err,
            ResolverError::UpstreamError {
                status: 404,
                message: "Playlist not found".to_string()
            }
        );
    }

    #[test]
    fn upstream_message_from_message_field() {
        let err = upstream_error(
            reqwest::StatusCode::FORBIDDEN,
            r#"{"message":"Playlist is private"}"#,
        );
        assert_eq!(err.to_string(), "Playlist is private");
    }

    #[test]
    fn upstream_message_generic_when_body_empty() {
        let err = upstream_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(
            err.to_string(),
            "Failed to load playlist: Internal Server Error"
        );
    }

    #[test]
    fn upstream_html_error_page() {
        let err = upstream_error(reqwest::StatusCode::BAD_GATEWAY, "<html>502</html>");
        assert!(err.to_string().contains("HTML instead of JSON"));
    }
}
