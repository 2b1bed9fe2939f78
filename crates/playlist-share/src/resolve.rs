//! Share metadata resolution.
//!
//! Turns a playlist identifier into a [`ShareMetadata`] value. This is the
//! single source of metadata truth: the crawler snapshot, the JSON endpoint
//! used by the interactive client, and the generated image all go through
//! [`resolve`].
//!
//! Resolution never fails. When the backend cannot be used, the metadata is
//! filled with defaults and the [`ResolverError`] is carried alongside so the
//! UI can show an advisory.

use serde::Serialize;
use url::form_urlencoded;

use crate::backend::{self, PlaylistSummary, UNKNOWN_OWNER};
use crate::color::Rgb;
use crate::config::Config;
use crate::error::{ResolverError, ShareError};
use crate::state::AppState;

/// Per-request inputs that shape the canonical URL and generated image.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShareOptions<'a> {
    /// Request path to use for the canonical URL. Defaults to `/PlaylistDetail/{id}`.
    pub path: Option<&'a str>,
    /// Raw `bgColor` query value, with or without `#`.
    pub background_color: Option<&'a str>,
}

/// One entry of the candidate image chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImageCandidate {
    /// Composite preview rendered by this service.
    Generated { url: String },
    /// The playlist's own cover image.
    Cover { url: String },
}

impl ImageCandidate {
    pub fn url(&self) -> &str {
        match self {
            Self::Generated { url } | Self::Cover { url } => url,
        }
    }
}

/// Everything a share surface needs to describe a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMetadata {
    pub playlist_id: String,
    pub title: String,
    pub description: String,
    pub owner_name: String,
    pub video_count: u64,
    pub canonical_url: String,
    pub deep_link: String,
    /// Normalized `#rrggbb` background color.
    pub background_color: String,
    /// Absolute cover URL, if the playlist has one.
    pub cover_image_url: Option<String>,
    /// Image candidates, highest priority first. Empty when defaults were used.
    pub candidate_images: Vec<ImageCandidate>,
}

/// Resolved metadata plus the reason defaults were used, if any.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub metadata: ShareMetadata,
    pub error: Option<ResolverError>,
}

impl Resolution {
    /// Human-readable advisory for the UI, if resolution fell back to defaults.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// Whether the metadata came from the backend rather than defaults.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Resolve share metadata for a playlist.
///
/// Performs exactly one bounded backend request. Any failure yields default
/// metadata together with the classified error.
pub async fn resolve(state: &AppState, playlist_id: &str, options: ShareOptions<'_>) -> Resolution {
    let config = &state.config;

    match backend::fetch_playlist_summary(&state.http, config, playlist_id).await {
        Ok(summary) => Resolution {
            metadata: build_metadata(config, playlist_id, Some(&summary), options),
            error: None,
        },
        Err(err) => {
            tracing::warn!(
                playlist_id = %playlist_id,
                kind = err.kind(),
                error = %err,
                "playlist summary unavailable, using default metadata"
            );
            Resolution {
                metadata: build_metadata(config, playlist_id, None, options),
                error: Some(err),
            }
        }
    }
}

/// Derive share metadata from an optional summary.
///
/// `None` produces the default metadata used when the backend is unavailable.
pub fn build_metadata(
    config: &Config,
    playlist_id: &str,
    summary: Option<&PlaylistSummary>,
    options: ShareOptions<'_>,
) -> ShareMetadata {
    let requested_color = options.background_color.and_then(Rgb::parse_hex);
    let background = requested_color.unwrap_or(Rgb::BLACK);

    let canonical_url = canonical_url(config, playlist_id, options.path, requested_color);
    let deep_link = deep_link(&config.deep_link_scheme, playlist_id);

    let Some(summary) = summary else {
        return ShareMetadata {
            playlist_id: playlist_id.to_string(),
            title: default_title(&config.site_name),
            description: default_description(&config.site_name),
            owner_name: UNKNOWN_OWNER.to_string(),
            video_count: 0,
            canonical_url,
            deep_link,
            background_color: background.to_string(),
            cover_image_url: None,
            candidate_images: Vec::new(),
        };
    };

    let title = summary
        .name
        .clone()
        .unwrap_or_else(|| default_title(&config.site_name));

    let cover_image_url = summary
        .image_ref
        .as_deref()
        .map(|r| absolute_image_url(r, &config.base_url, &config.backend_url));

    let mut candidate_images = vec![ImageCandidate::Generated {
        url: generated_image_url(&config.base_url, playlist_id, background),
    }];
    if let Some(url) = &cover_image_url {
        candidate_images.push(ImageCandidate::Cover { url: url.clone() });
    }

    ShareMetadata {
        playlist_id: playlist_id.to_string(),
        title,
        description: format!(
            "Playlist {}",
            owner_caption(&summary.owner_name, summary.video_count)
        ),
        owner_name: summary.owner_name.clone(),
        video_count: summary.video_count,
        canonical_url,
        deep_link,
        background_color: background.to_string(),
        cover_image_url,
        candidate_images,
    }
}

/// Title used when the playlist has no name or could not be fetched.
pub fn default_title(site_name: &str) -> String {
    format!("{site_name} Playlist")
}

/// Description used when the playlist could not be fetched.
pub fn default_description(site_name: &str) -> String {
    format!("Explore fitness and lifestyle content on {site_name}")
}

/// "1 video" / "N videos".
pub fn video_count_label(count: u64) -> String {
    if count == 1 {
        "1 video".to_string()
    } else {
        format!("{count} videos")
    }
}

/// "by {owner} • {n} video(s)", shared by the description and the image caption.
pub fn owner_caption(owner: &str, count: u64) -> String {
    format!("by {owner} • {}", video_count_label(count))
}

/// Resolve a cover reference to an absolute URL.
///
/// - scheme present: unchanged
/// - leading `/`: prefixed with the site's base URL
/// - otherwise: prefixed with the backend's base URL and `/`
pub fn absolute_image_url(image_ref: &str, site_base: &str, backend_base: &str) -> String {
    if has_scheme(image_ref) {
        image_ref.to_string()
    } else if image_ref.starts_with('/') {
        format!("{site_base}{image_ref}")
    } else {
        format!("{backend_base}/{image_ref}")
    }
}

/// Stable URL of the generated preview image for a playlist and color.
pub fn generated_image_url(base_url: &str, playlist_id: &str, background: Rgb) -> String {
    format!(
        "{base_url}/og/playlist/{}?bgColor={}",
        encode(playlist_id),
        encode(&background.to_string())
    )
}

/// Custom-scheme URI the native app handles.
pub fn deep_link(scheme: &str, playlist_id: &str) -> String {
    format!("{scheme}://PlaylistDetail?id={}", encode(playlist_id))
}

/// Longest accepted playlist identifier.
pub const MAX_ID_LEN: usize = 128;

/// Check a playlist identifier from a request path.
///
/// Accepts 1 to [`MAX_ID_LEN`] characters from `[A-Za-z0-9_-]`.
pub fn validate_playlist_id(id: &str) -> Result<&str, ShareError> {
    if id.is_empty() {
        return Err(ShareError::InvalidIdentifier("empty identifier".to_string()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(ShareError::InvalidIdentifier(format!(
            "identifier longer than {MAX_ID_LEN} characters"
        )));
    }
    if let Some(c) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(ShareError::InvalidIdentifier(format!(
            "unexpected character {c:?}"
        )));
    }
    Ok(id)
}

fn canonical_url(
    config: &Config,
    playlist_id: &str,
    path: Option<&str>,
    color: Option<Rgb>,
) -> String {
    let path = match path {
        Some(p) => p.to_string(),
        None => format!("/PlaylistDetail/{}", encode(playlist_id)),
    };
    match color {
        Some(c) => format!(
            "{}{path}?bgColor={}",
            config.base_url,
            encode(&c.to_string())
        ),
        None => format!("{}{path}", config.base_url),
    }
}

/// RFC 3986 scheme: a letter followed by letters, digits, `+`, `-` or `.`, then `:`.
fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
