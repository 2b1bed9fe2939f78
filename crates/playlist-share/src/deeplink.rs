//! Opening a playlist in the native app, with an app-store fallback.
//!
//! An attempt navigates to the app's custom-scheme URI and then races two
//! signals:
//!
//! - losing the foreground, taken to mean the OS handed control to the app
//! - a fixed timer, after which the store listing opens in a new context
//!
//! Whichever fires first wins and the other is dropped. The race itself is
//! a pure state machine ([`DeepLinkAttempt`]); [`DeepLinkResolver`] drives it
//! with tokio timers against an [`AppLauncher`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::resolve;

/// Coarse device class, used to pick a store listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Ios,
    Android,
    Desktop,
}

impl DeviceClass {
    /// Classify a user-agent. Missing or unrecognized user-agents are desktop.
    pub fn from_user_agent(user_agent: Option<&str>) -> Self {
        let Some(ua) = user_agent else {
            return Self::Desktop;
        };
        let ua = ua.to_ascii_lowercase();
        if ["iphone", "ipad", "ipod"].iter().any(|t| ua.contains(t)) {
            Self::Ios
        } else if ua.contains("android") {
            Self::Android
        } else {
            Self::Desktop
        }
    }

    /// Parse a platform name from a URL (`ios` or `android`).
    pub fn from_platform(platform: &str) -> Option<Self> {
        match platform.to_ascii_lowercase().as_str() {
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            _ => None,
        }
    }
}

/// App-store listings per platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLinks {
    pub ios: String,
    pub android: String,
}

impl StoreLinks {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ios: config.ios_store_url.clone(),
            android: config.android_store_url.clone(),
        }
    }

    /// Listing for a device class. Desktop gets the iOS listing.
    pub fn for_device(&self, device: DeviceClass) -> &str {
        match device {
            DeviceClass::Ios | DeviceClass::Desktop => &self.ios,
            DeviceClass::Android => &self.android,
        }
    }

    /// Listing for an explicit "get the app" action. Only iOS gets the App
    /// Store; desktop and everything else get the Play Store listing.
    pub fn for_direct_action(&self, device: DeviceClass) -> &str {
        match device {
            DeviceClass::Ios => &self.ios,
            DeviceClass::Android | DeviceClass::Desktop => &self.android,
        }
    }
}

/// State of a single deep-link attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    /// Waiting for either signal. Holds the store listing chosen at start.
    Attempting { store_url: String },
    AppLaunchDetected,
    FallbackTriggered,
    /// The hosting view went away before either signal.
    Cancelled,
}

/// Inputs that move an attempt forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    ForegroundLost,
    TimerElapsed,
    Teardown,
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Navigate the current context to the custom-scheme URI.
    Navigate(String),
    /// Open the store listing in a new browsing context.
    OpenStore(String),
}

/// One deep-link attempt.
///
/// Terminal states ignore every further signal, so the store listing opens
/// at most once per attempt.
#[derive(Debug, Clone)]
pub struct DeepLinkAttempt {
    state: AttemptState,
}

impl Default for DeepLinkAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl DeepLinkAttempt {
    pub fn new() -> Self {
        Self {
            state: AttemptState::Idle,
        }
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    /// `Idle -> Attempting`. Returns the navigation to perform, or `None` if
    /// the attempt was already started.
    pub fn start(&mut self, deep_link: String, store_url: String) -> Option<Effect> {
        if self.state != AttemptState::Idle {
            return None;
        }
        self.state = AttemptState::Attempting { store_url };
        Some(Effect::Navigate(deep_link))
    }

    /// Feed a signal. Only the first signal while `Attempting` has an effect.
    pub fn on(&mut self, signal: Signal) -> Option<Effect> {
        let AttemptState::Attempting { store_url } = &self.state else {
            return None;
        };

        match signal {
            Signal::ForegroundLost => {
                self.state = AttemptState::AppLaunchDetected;
                None
            }
            Signal::TimerElapsed => {
                let effect = Effect::OpenStore(store_url.clone());
                self.state = AttemptState::FallbackTriggered;
                Some(effect)
            }
            Signal::Teardown => {
                self.state = AttemptState::Cancelled;
                None
            }
        }
    }
}

/// Host environment the resolver acts on.
pub trait AppLauncher {
    /// Navigate the current context (used for the custom-scheme URI).
    fn navigate(&self, uri: &str);
    /// Open a URL in a new browsing context.
    fn open_in_new_context(&self, url: &str);
}

/// How an attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    AppLaunchDetected,
    FallbackTriggered { store_url: String },
    Cancelled,
    /// Another attempt was already in flight.
    Ignored,
}

/// Drives deep-link attempts for one hosting view.
pub struct DeepLinkResolver<L> {
    launcher: L,
    scheme: String,
    stores: StoreLinks,
    timeout: Duration,
    device: DeviceClass,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an attempt finishes or is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<L: AppLauncher> DeepLinkResolver<L> {
    /// Resolver for a view whose device class is detected from `user_agent`.
    pub fn new(launcher: L, config: &Config, user_agent: Option<&str>) -> Self {
        Self {
            launcher,
            scheme: config.deep_link_scheme.clone(),
            stores: StoreLinks::from_config(config),
            timeout: config.deep_link_timeout,
            device: DeviceClass::from_user_agent(user_agent),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    /// Try to open `playlist_id` in the app.
    ///
    /// `foreground_lost` resolves when the hosting page loses the foreground;
    /// `teardown` resolves when the hosting view is dismissed. Both are
    /// dropped when the attempt ends, which deregisters them.
    pub async fn open_deep_link<F, T>(
        &self,
        playlist_id: &str,
        device_override: Option<DeviceClass>,
        foreground_lost: F,
        teardown: T,
    ) -> AttemptOutcome
    where
        F: Future<Output = ()>,
        T: Future<Output = ()>,
    {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(playlist_id = %playlist_id, "deep link attempt already in flight, ignoring");
            return AttemptOutcome::Ignored;
        }
        let _in_flight = InFlight(&self.in_flight);

        let device = device_override.unwrap_or(self.device);
        let store_url = self.stores.for_device(device).to_string();
        let deep_link = resolve::deep_link(&self.scheme, playlist_id);

        let mut attempt = DeepLinkAttempt::new();
        if let Some(effect) = attempt.start(deep_link, store_url) {
            self.apply(effect);
        }

        let signal = tokio::select! {
            biased;
            () = teardown => Signal::Teardown,
            () = foreground_lost => Signal::ForegroundLost,
            () = tokio::time::sleep(self.timeout) => Signal::TimerElapsed,
        };

        if let Some(effect) = attempt.on(signal) {
            self.apply(effect);
        }

        let outcome = match attempt.state() {
            AttemptState::AppLaunchDetected => AttemptOutcome::AppLaunchDetected,
            AttemptState::FallbackTriggered => AttemptOutcome::FallbackTriggered {
                store_url: self.stores.for_device(device).to_string(),
            },
            _ => AttemptOutcome::Cancelled,
        };
        tracing::info!(playlist_id = %playlist_id, ?device, ?outcome, "deep link attempt finished");
        outcome
    }

    /// Open a store listing immediately, outside any attempt.
    ///
    /// `device` defaults to the detected one. Unlike the attempt fallback,
    /// a desktop caller lands on the Play Store listing.
    pub fn open_store(&self, device: Option<DeviceClass>) {
        let device = device.unwrap_or(self.device);
        self.launcher
            .open_in_new_context(self.stores.for_direct_action(device));
    }

    fn apply(&self, effect: Effect) {
        match effect {
            Effect::Navigate(uri) => self.launcher.navigate(&uri),
            Effect::OpenStore(url) => self.launcher.open_in_new_context(&url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;
    use std::sync::Mutex;

    use tokio::time::{Instant, sleep};

    use crate::config::test_config;

    const IOS_STORE: &str = "https://apps.apple.com/app/id1660781140";
    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";
    const PIXEL: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0 Mobile";
    const MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Safari/605.1.15";

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Navigate(String),
        Open(String),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn store_opens(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, Call::Open(_)))
                .count()
        }
    }

    impl AppLauncher for &Recorder {
        fn navigate(&self, uri: &str) {
            self.calls.lock().unwrap().push(Call::Navigate(uri.to_string()));
        }

        fn open_in_new_context(&self, url: &str) {
            self.calls.lock().unwrap().push(Call::Open(url.to_string()));
        }
    }

    fn resolver<'a>(recorder: &'a Recorder, ua: Option<&str>) -> DeepLinkResolver<&'a Recorder> {
        let config = test_config("https://share.example.com", "https://api.example.com");
        DeepLinkResolver::new(recorder, &config, ua)
    }

    #[test]
    fn device_detection() {
        assert_eq!(DeviceClass::from_user_agent(Some(IPHONE)), DeviceClass::Ios);
        assert_eq!(DeviceClass::from_user_agent(Some("Mozilla/5.0 (iPad; CPU OS 16_0)")), DeviceClass::Ios);
        assert_eq!(DeviceClass::from_user_agent(Some(PIXEL)), DeviceClass::Android);
        assert_eq!(DeviceClass::from_user_agent(Some(MAC)), DeviceClass::Desktop);
        assert_eq!(DeviceClass::from_user_agent(None), DeviceClass::Desktop);
    }

    #[test]
    fn platform_names() {
        assert_eq!(DeviceClass::from_platform("ios"), Some(DeviceClass::Ios));
        assert_eq!(DeviceClass::from_platform("Android"), Some(DeviceClass::Android));
        assert_eq!(DeviceClass::from_platform("windows"), None);
    }

    #[test]
    fn desktop_gets_ios_listing() {
        let stores = StoreLinks {
            ios: "ios".to_string(),
            android: "android".to_string(),
        };
        assert_eq!(stores.for_device(DeviceClass::Desktop), "ios");
        assert_eq!(stores.for_device(DeviceClass::Android), "android");
    }

    #[test]
    fn direct_action_sends_non_ios_to_play_store() {
        let stores = StoreLinks {
            ios: "ios".to_string(),
            android: "android".to_string(),
        };
        assert_eq!(stores.for_direct_action(DeviceClass::Ios), "ios");
        assert_eq!(stores.for_direct_action(DeviceClass::Android), "android");
        assert_eq!(stores.for_direct_action(DeviceClass::Desktop), "android");
    }

    #[test]
    fn late_signals_are_no_ops() {
        let mut attempt = DeepLinkAttempt::new();
        assert_eq!(
            attempt.start("myapp://x".to_string(), "store".to_string()),
            Some(Effect::Navigate("myapp://x".to_string()))
        );
        assert_eq!(attempt.on(Signal::TimerElapsed), Some(Effect::OpenStore("store".to_string())));
        assert_eq!(attempt.on(Signal::ForegroundLost), None);
        assert_eq!(attempt.on(Signal::TimerElapsed), None);
        assert_eq!(attempt.state(), &AttemptState::FallbackTriggered);
        assert_eq!(attempt.start("myapp://y".to_string(), "store".to_string()), None);
    }

    #[test]
    fn foreground_loss_wins_over_later_timer() {
        let mut attempt = DeepLinkAttempt::new();
        attempt.start("myapp://x".to_string(), "store".to_string());
        assert_eq!(attempt.on(Signal::ForegroundLost), None);
        assert_eq!(attempt.on(Signal::TimerElapsed), None);
        assert_eq!(attempt.state(), &AttemptState::AppLaunchDetected);
    }

    #[test]
    fn signals_before_start_are_ignored() {
        let mut attempt = DeepLinkAttempt::new();
        assert_eq!(attempt.on(Signal::TimerElapsed), None);
        assert_eq!(attempt.state(), &AttemptState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn foreground_loss_before_timeout_never_opens_store() {
        for at_ms in [0, 1, 500, 999] {
            let recorder = Recorder::default();
            let resolver = resolver(&recorder, Some(IPHONE));

            let outcome = resolver
                .open_deep_link(
                    "abc123",
                    None,
                    sleep(Duration::from_millis(at_ms)),
                    pending(),
                )
                .await;

            assert_eq!(outcome, AttemptOutcome::AppLaunchDetected, "signal at {at_ms}ms");
            assert_eq!(recorder.store_opens(), 0);
            assert_eq!(
                recorder.calls(),
                vec![Call::Navigate("myapp://PlaylistDetail?id=abc123".to_string())]
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn no_signal_opens_store_exactly_once_after_timeout() {
        let recorder = Recorder::default();
        let resolver = resolver(&recorder, Some(PIXEL));
        let started = Instant::now();

        let outcome = resolver
            .open_deep_link("abc123", None, pending(), pending())
            .await;

        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(
            outcome,
            AttemptOutcome::FallbackTriggered {
                store_url: "https://play.google.com/store/apps/details?id=com.georgefitnlifestyle.fitn".to_string()
            }
        );
        assert_eq!(recorder.store_opens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn desktop_click_falls_back_to_ios_listing() {
        let recorder = Recorder::default();
        let resolver = resolver(&recorder, Some(MAC));
        assert_eq!(resolver.device(), DeviceClass::Desktop);

        let outcome = resolver
            .open_deep_link("abc123", None, pending(), pending())
            .await;

        assert_eq!(
            outcome,
            AttemptOutcome::FallbackTriggered {
                store_url: IOS_STORE.to_string()
            }
        );
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Navigate("myapp://PlaylistDetail?id=abc123".to_string()),
                Call::Open(IOS_STORE.to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn device_override_picks_listing() {
        let recorder = Recorder::default();
        let resolver = resolver(&recorder, Some(IPHONE));

        resolver
            .open_deep_link("abc123", Some(DeviceClass::Android), pending(), pending())
            .await;

        assert_eq!(
            recorder.calls().last(),
            Some(&Call::Open(
                "https://play.google.com/store/apps/details?id=com.georgefitnlifestyle.fitn".to_string()
            ))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_without_opening_store() {
        let recorder = Recorder::default();
        let resolver = resolver(&recorder, Some(IPHONE));

        let outcome = resolver
            .open_deep_link("abc123", None, pending(), sleep(Duration::from_millis(300)))
            .await;

        assert_eq!(outcome, AttemptOutcome::Cancelled);
        sleep(Duration::from_secs(5)).await;
        assert_eq!(recorder.store_opens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_attempt_is_ignored() {
        let recorder = Recorder::default();
        let resolver = resolver(&recorder, Some(IPHONE));

        let (first, second) = tokio::join!(
            resolver.open_deep_link("abc123", None, pending(), pending()),
            resolver.open_deep_link("abc123", None, pending(), pending()),
        );

        assert!(matches!(first, AttemptOutcome::FallbackTriggered { .. }));
        assert_eq!(second, AttemptOutcome::Ignored);
        assert_eq!(recorder.store_opens(), 1);

        // The flag is released once the first attempt is over.
        let third = resolver
            .open_deep_link("abc123", None, sleep(Duration::from_millis(10)), pending())
            .await;
        assert_eq!(third, AttemptOutcome::AppLaunchDetected);
    }

    #[test]
    fn direct_store_action_bypasses_race() {
        let recorder = Recorder::default();
        let resolver = resolver(&recorder, Some(IPHONE));
        resolver.open_store(Some(DeviceClass::Android));
        assert_eq!(recorder.store_opens(), 1);
        assert!(recorder.calls().iter().all(|c| !matches!(c, Call::Navigate(_))));
    }

    #[test]
    fn direct_store_action_defaults_to_detected_device() {
        let config = test_config("https://share.example.com", "https://api.example.com");

        let recorder = Recorder::default();
        resolver(&recorder, Some(IPHONE)).open_store(None);
        assert_eq!(recorder.calls(), vec![Call::Open(IOS_STORE.to_string())]);

        for ua in [Some(PIXEL), Some(MAC), None] {
            let recorder = Recorder::default();
            resolver(&recorder, ua).open_store(None);
            assert_eq!(
                recorder.calls(),
                vec![Call::Open(config.android_store_url.clone())],
                "{ua:?}"
            );
        }
    }
}
