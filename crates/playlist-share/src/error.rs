//! Error types for the share service.
//!
//! [`ResolverError`] never reaches an HTTP client directly: every variant is
//! recovered by substituting default metadata, and its `Display` text is the
//! advisory shown to humans. [`ShareError`] is the HTTP-facing error and is
//! rendered as a small HTML page, since this is a user-facing HTML service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use maud::{DOCTYPE, html};

/// Why playlist metadata could not be resolved from the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolverError {
    /// Connection-level failure (refused, DNS, timeout).
    #[error("Cannot connect to backend server at {backend_url}. Please ensure the backend is running.")]
    BackendUnreachable {
        /// Backend base URL that could not be reached.
        backend_url: String,
        /// Transport error detail, for logs.
        detail: String,
    },

    /// Backend answered with a non-2xx status.
    #[error("{message}")]
    UpstreamError {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Message taken from the response body, or a generic one.
        message: String,
    },

    /// Backend answered with HTML (proxy interstitial, warning page) instead of JSON.
    #[error(
        "Received HTML instead of JSON. The backend might be returning an error page or proxy warning."
    )]
    UnexpectedContentType,

    /// Body did not parse as the expected playlist summary shape.
    #[error("Invalid JSON response from server")]
    MalformedPayload {
        /// Parser detail, for logs.
        detail: String,
    },
}

impl ResolverError {
    /// Short machine-readable kind, used in logs and the JSON endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BackendUnreachable { .. } => "backend_unreachable",
            Self::UpstreamError { .. } => "upstream_error",
            Self::UnexpectedContentType => "unexpected_content_type",
            Self::MalformedPayload { .. } => "malformed_payload",
        }
    }
}

/// HTTP-facing error type.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    /// The playlist identifier in the path is not acceptable.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Unknown store platform requested.
    #[error("not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ShareError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            Self::InvalidIdentifier(msg) => (
                StatusCode::BAD_REQUEST,
                "Invalid Playlist Link",
                format!("This link does not point to a valid playlist: {msg}"),
            ),
            Self::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Nothing to see here: {msg}"),
            ),
            Self::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Error",
                    "An internal error occurred. Please try again later.".to_string(),
                )
            }
        };

        let markup = html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    meta name="viewport" content="width=device-width, initial-scale=1";
                    title { (title) }
                    meta name="robots" content="noindex";
                    style { (maud::PreEscaped(crate::render::components::ERROR_CSS)) }
                }
                body {
                    main class="error-page" {
                        h1 { (title) }
                        p { (message) }
                        a href="/" { "Back to home" }
                    }
                }
            }
        };

        (status, markup).into_response()
    }
}
