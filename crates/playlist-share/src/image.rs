//! Image resolution chain.
//!
//! Picks the single preview image to advertise for a playlist:
//!
//! 1. the generated composite image
//! 2. the playlist cover
//! 3. the default brand icon
//!
//! Candidates can be checked with a HEAD probe first. A non-2xx answer
//! rejects the candidate. A probe that times out or fails in transport is
//! inconclusive and the candidate is used anyway (soft-fail).

use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::resolve::{ImageCandidate, ShareMetadata};

/// User-Agent sent with liveness probes.
const PROBE_USER_AGENT: &str = concat!("playlist-share-probe/", env!("CARGO_PKG_VERSION"));

/// Query parameter used to bust edge caches on cover images.
const CACHE_BUST_PARAM: &str = "v";

/// Which candidates get a liveness probe before being accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyMode {
    /// Accept the first candidate without probing.
    Skip,
    /// Probe the generated image only.
    #[default]
    Generated,
    /// Probe the generated image and the cover.
    All,
}

impl FromStr for VerifyMode {
    type Err = String;

    /// Parse `skip`, `generated` or `all`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "generated" => Ok(Self::Generated),
            "all" => Ok(Self::All),
            other => Err(format!("unknown image verify mode '{other}'")),
        }
    }
}

impl VerifyMode {
    fn applies_to(self, candidate: &ImageCandidate) -> bool {
        match (self, candidate) {
            (Self::Skip, _) => false,
            (Self::Generated, ImageCandidate::Generated { .. }) => true,
            (Self::Generated, ImageCandidate::Cover { .. }) => false,
            (Self::All, _) => true,
        }
    }
}

/// Result of a liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 2xx response.
    Live,
    /// Non-2xx response; the candidate is rejected.
    Missing(u16),
    /// Timed out or failed in transport; the candidate is used anyway.
    Inconclusive(String),
}

/// Lightweight existence check against a URL.
pub trait ImageProbe {
    fn probe(&self, url: &str) -> impl Future<Output = ProbeOutcome> + Send;
}

/// HEAD-request probe with a bounded timeout.
#[derive(Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self { http, timeout }
    }
}

impl ImageProbe for HttpProbe {
    async fn probe(&self, url: &str) -> ProbeOutcome {
        let result = self
            .http
            .head(url)
            .timeout(self.timeout)
            .header(reqwest::header::USER_AGENT, PROBE_USER_AGENT)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Live,
            Ok(resp) => ProbeOutcome::Missing(resp.status().as_u16()),
            Err(err) if err.is_timeout() => ProbeOutcome::Inconclusive("probe timed out".to_string()),
            Err(err) => ProbeOutcome::Inconclusive(err.to_string()),
        }
    }
}

/// Where the chosen image came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Generated,
    Cover,
    DefaultIcon,
}

/// The image to advertise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImage {
    pub url: String,
    /// True only when a probe answered 2xx for this URL.
    pub verified: bool,
    pub source: ImageSource,
}

/// Walk the candidate chain and pick one image.
///
/// Always returns an image: the default icon is the last resort.
pub async fn resolve_image<P: ImageProbe>(
    metadata: &ShareMetadata,
    mode: VerifyMode,
    probe: &P,
    default_icon_url: &str,
) -> ResolvedImage {
    for candidate in &metadata.candidate_images {
        let verified = if mode.applies_to(candidate) {
            match probe.probe(candidate.url()).await {
                ProbeOutcome::Live => true,
                ProbeOutcome::Missing(status) => {
                    tracing::info!(
                        playlist_id = %metadata.playlist_id,
                        url = %candidate.url(),
                        status,
                        "image candidate rejected by probe"
                    );
                    continue;
                }
                ProbeOutcome::Inconclusive(reason) => {
                    tracing::warn!(
                        playlist_id = %metadata.playlist_id,
                        url = %candidate.url(),
                        reason = %reason,
                        "image probe inconclusive, using candidate unverified"
                    );
                    false
                }
            }
        } else {
            false
        };

        return match candidate {
            ImageCandidate::Generated { url } => ResolvedImage {
                url: url.clone(),
                verified,
                source: ImageSource::Generated,
            },
            ImageCandidate::Cover { url } => ResolvedImage {
                url: with_cache_bust(url, chrono::Utc::now().timestamp_millis()),
                verified,
                source: ImageSource::Cover,
            },
        };
    }

    tracing::debug!(playlist_id = %metadata.playlist_id, "no usable image candidate, using default icon");
    ResolvedImage {
        url: default_icon_url.to_string(),
        verified: false,
        source: ImageSource::DefaultIcon,
    }
}

/// Append `v=<token>` unless the URL already carries a `v` parameter.
pub fn with_cache_bust(raw: &str, token: i64) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            if parsed.query_pairs().any(|(k, _)| k == CACHE_BUST_PARAM) {
                return raw.to_string();
            }
            parsed
                .query_pairs_mut()
                .append_pair(CACHE_BUST_PARAM, &token.to_string());
            parsed.into()
        }
        Err(_) => raw.to_string(),
    }
}
