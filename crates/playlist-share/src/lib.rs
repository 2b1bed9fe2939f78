//! Playlist Share - link previews and app hand-off for shared playlists.
//!
//! A shared playlist link has to work for two very different callers:
//!
//! - **Crawlers** (Facebook, Twitter, Slack, iMessage...) that never run
//!   JavaScript and need Open Graph tags in the first response.
//! - **People**, who get the interactive client and a button that tries to
//!   open the native app before falling back to the app store.
//!
//! # Architecture
//!
//! - **Resolve**: one bounded backend fetch turned into [`ShareMetadata`],
//!   with defaults and a classified error when the backend is unusable
//! - **Image**: candidate chain (generated card, cover, default icon) with
//!   optional HEAD probes
//! - **Negotiate**: crawler detection on playlist paths, answered with a
//!   server-rendered snapshot page
//! - **Render**: maud snapshot pages and resvg-rendered preview cards
//! - **Deep link**: custom-scheme launch raced against a store fallback timer
//!
//! # Security
//!
//! - Every dynamic value is escaped, single quotes included
//! - Snapshot pages carry a strict Content-Security-Policy and no scripts
//! - Playlist identifiers are restricted to `[A-Za-z0-9_-]{1,128}`

pub mod backend;
pub mod color;
pub mod config;
pub mod deeplink;
pub mod error;
pub mod image;
pub mod negotiate;
pub mod render;
pub mod resolve;
pub mod routes;
pub mod state;

pub use config::Config;
pub use resolve::ShareMetadata;
pub use routes::router;
pub use state::AppState;
