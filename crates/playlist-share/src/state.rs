//! Application state shared across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::config::Config;
use crate::image::HttpProbe;

/// Type alias for the generated image cache (`{id}:{color}` -> PNG bytes).
pub type OgImageCache = Cache<String, Arc<Vec<u8>>>;

/// OG image cache capacity.
/// Each image is ~50-150KB PNG, so 2K entries ~= 100-300MB.
const OG_CACHE_CAPACITY: u64 = 2_000;

/// OG image cache TTL. Short enough that renamed playlists catch up quickly.
const OG_CACHE_TTL: Duration = Duration::from_secs(600);

/// User-Agent sent on every outbound request.
const USER_AGENT: &str = concat!("playlist-share/", env!("CARGO_PKG_VERSION"));

/// Shared application state available to all request handlers.
///
/// Holds only read-only configuration, a pooled HTTP client and the rendered
/// image cache. Share metadata itself is never cached.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,

    /// Pooled HTTP client for backend fetches, probes and cover downloads.
    pub http: reqwest::Client,

    /// In-memory cache of generated preview images.
    pub og_cache: OgImageCache,
}

impl AppState {
    /// Create a new application state from configuration.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.fetch_timeout)
            .build()?;

        let og_cache = Cache::builder()
            .max_capacity(OG_CACHE_CAPACITY)
            .time_to_live(OG_CACHE_TTL)
            .build();

        tracing::info!(
            og_cache_capacity = OG_CACHE_CAPACITY,
            og_cache_ttl_secs = OG_CACHE_TTL.as_secs(),
            "application state initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            http,
            og_cache,
        })
    }

    /// Liveness probe backed by this state's HTTP client.
    pub fn probe(&self) -> HttpProbe {
        HttpProbe::new(self.http.clone(), self.config.probe_timeout)
    }
}
