//! Application configuration loaded from environment variables.

use std::time::Duration;

use anyhow::Context;

use crate::image::VerifyMode;

/// Application configuration.
///
/// Loaded once at startup and shared read-only across all requests.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:3000").
    pub bind_addr: String,

    /// Public base URL of this site (used in canonical URLs and OG tags).
    pub base_url: String,

    /// Base URL of the playlist backend. Relative cover paths resolve against it.
    pub backend_url: String,

    /// Path prefix of the backend's public API (e.g., "/api/v1").
    pub backend_api_prefix: String,

    /// Product name shown in OG tags, default titles and the image badge.
    pub site_name: String,

    /// Directory holding the built interactive client bundle.
    pub client_dir: String,

    /// Facebook application ID for `fb:app_id`.
    pub facebook_app_id: String,

    /// Numeric App Store ID of the iOS app.
    pub ios_app_store_id: String,

    /// Android package name of the app.
    pub android_package: String,

    /// App Store listing URL.
    pub ios_store_url: String,

    /// Play Store listing URL.
    pub android_store_url: String,

    /// Custom URL scheme the native app registers (without "://").
    pub deep_link_scheme: String,

    /// Budget for the playlist summary fetch.
    pub fetch_timeout: Duration,

    /// Budget for image liveness probes.
    pub probe_timeout: Duration,

    /// How long a deep-link attempt waits before falling back to the store.
    pub deep_link_timeout: Duration,

    /// Which image candidates get a HEAD check before being advertised.
    pub verify_mode: VerifyMode,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - None (all have defaults for local development)
    ///
    /// Optional:
    /// - `SHARE_BIND_ADDR`: Server bind address (default: "0.0.0.0:3000")
    /// - `SHARE_BASE_URL`: Public site URL (default: "http://localhost:3000")
    /// - `SHARE_BACKEND_URL`: Playlist backend URL (default: "http://localhost:5000")
    /// - `SHARE_BACKEND_API_PREFIX`: Backend API prefix (default: "/api/v1")
    /// - `SHARE_SITE_NAME`: Product name (default: "FITN")
    /// - `SHARE_CLIENT_DIR`: Interactive bundle directory (default: "dist")
    /// - `SHARE_FACEBOOK_APP_ID`, `SHARE_IOS_APP_STORE_ID`, `SHARE_ANDROID_PACKAGE`
    /// - `SHARE_IOS_STORE_URL`, `SHARE_ANDROID_STORE_URL`
    /// - `SHARE_DEEP_LINK_SCHEME`: Native app URL scheme (default: "myapp")
    /// - `SHARE_FETCH_TIMEOUT_MS` (default 5000), `SHARE_PROBE_TIMEOUT_MS` (default 3000),
    ///   `SHARE_DEEP_LINK_TIMEOUT_MS` (default 1000)
    /// - `SHARE_VERIFY_IMAGES`: `skip`, `generated` or `all` (default: "generated")
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env_or("SHARE_BIND_ADDR", "0.0.0.0:3000");
        let base_url = trim_url(env_or("SHARE_BASE_URL", "http://localhost:3000"));
        let backend_url = trim_url(env_or("SHARE_BACKEND_URL", "http://localhost:5000"));

        let backend_api_prefix = {
            let raw = env_or("SHARE_BACKEND_API_PREFIX", "/api/v1");
            let trimmed = raw.trim_matches('/');
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("/{trimmed}")
            }
        };

        let site_name = env_or("SHARE_SITE_NAME", "FITN");
        let client_dir = env_or("SHARE_CLIENT_DIR", "dist");

        let facebook_app_id = env_or("SHARE_FACEBOOK_APP_ID", "923362986389142");
        let ios_app_store_id = env_or("SHARE_IOS_APP_STORE_ID", "1660781140");
        let android_package = env_or("SHARE_ANDROID_PACKAGE", "com.georgefitnlifestyle.fitn");
        let ios_store_url = env_or(
            "SHARE_IOS_STORE_URL",
            &format!("https://apps.apple.com/app/id{ios_app_store_id}"),
        );
        let android_store_url = env_or(
            "SHARE_ANDROID_STORE_URL",
            &format!("https://play.google.com/store/apps/details?id={android_package}"),
        );
        let deep_link_scheme = env_or("SHARE_DEEP_LINK_SCHEME", "myapp")
            .trim_end_matches("://")
            .to_string();

        let fetch_timeout = millis_from_env("SHARE_FETCH_TIMEOUT_MS", 5000)?;
        let probe_timeout = millis_from_env("SHARE_PROBE_TIMEOUT_MS", 3000)?;
        let deep_link_timeout = millis_from_env("SHARE_DEEP_LINK_TIMEOUT_MS", 1000)?;
        let verify_mode = match std::env::var("SHARE_VERIFY_IMAGES") {
            Ok(raw) => raw.parse::<VerifyMode>().map_err(|err| {
                anyhow::anyhow!("SHARE_VERIFY_IMAGES must be skip, generated or all: {err}")
            })?,
            Err(_) => VerifyMode::default(),
        };

        tracing::info!(
            bind_addr = %bind_addr,
            base_url = %base_url,
            backend_url = %backend_url,
            backend_api_prefix = %backend_api_prefix,
            site_name = %site_name,
            client_dir = %client_dir,
            fetch_timeout_ms = fetch_timeout.as_millis() as u64,
            probe_timeout_ms = probe_timeout.as_millis() as u64,
            verify_mode = ?verify_mode,
            "share configuration loaded"
        );

        Ok(Self {
            bind_addr,
            base_url,
            backend_url,
            backend_api_prefix,
            site_name,
            client_dir,
            facebook_app_id,
            ios_app_store_id,
            android_package,
            ios_store_url,
            android_store_url,
            deep_link_scheme,
            fetch_timeout,
            probe_timeout,
            deep_link_timeout,
            verify_mode,
        })
    }

    /// URL of the backend's public playlist summary for `id`.
    pub fn playlist_summary_url(&self, id: &str) -> String {
        format!(
            "{}{}/playlists/public/{id}",
            self.backend_url, self.backend_api_prefix
        )
    }

    /// URL of the default brand icon, the last resort of the image chain.
    pub fn default_icon_url(&self) -> String {
        format!("{}/icon-light-32x32.png", self.base_url)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn millis_from_env(key: &str, default_ms: u64) -> anyhow::Result<Duration> {
    match std::env::var(key) {
        Ok(raw) => {
            let ms: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{key} must be a whole number of milliseconds, got '{raw}'"))?;
            Ok(Duration::from_millis(ms))
        }
        Err(_) => Ok(Duration::from_millis(default_ms)),
    }
}

#[cfg(test)]
pub(crate) fn test_config(base_url: &str, backend_url: &str) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        base_url: base_url.trim_end_matches('/').to_string(),
        backend_url: backend_url.trim_end_matches('/').to_string(),
        backend_api_prefix: "/api/v1".to_string(),
        site_name: "FITN".to_string(),
        client_dir: "dist".to_string(),
        facebook_app_id: "923362986389142".to_string(),
        ios_app_store_id: "1660781140".to_string(),
        android_package: "com.georgefitnlifestyle.fitn".to_string(),
        ios_store_url: "https://apps.apple.com/app/id1660781140".to_string(),
        android_store_url: "https://play.google.com/store/apps/details?id=com.georgefitnlifestyle.fitn"
            .to_string(),
        deep_link_scheme: "myapp".to_string(),
        fetch_timeout: Duration::from_secs(5),
        probe_timeout: Duration::from_secs(3),
        deep_link_timeout: Duration::from_millis(1000),
        verify_mode: VerifyMode::Generated,
    }
}
