//! Crawler snapshot document.
//!
//! A complete, self-contained HTML page carrying the share metadata as
//! Open Graph, Twitter card and App Links tags. It never references the
//! interactive client bundle.

use maud::{DOCTYPE, Markup, PreEscaped, html};

use super::components::{PAGE_CSS, Text};
use super::og_image::{OG_HEIGHT, OG_WIDTH};
use crate::config::Config;
use crate::image::ResolvedImage;
use crate::resolve::ShareMetadata;

/// Render the snapshot page for a resolved playlist.
pub fn render(config: &Config, meta: &ShareMetadata, image: &ResolvedImage) -> Markup {
    let site_name = config.site_name.as_str();
    let favicon = format!("{}/icon.svg", config.base_url);
    let og_width = OG_WIDTH.to_string();
    let og_height = OG_HEIGHT.to_string();

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (Text(&meta.title)) }
                meta name="description" content=(Text(&meta.description));
                link rel="canonical" href=(Text(&meta.canonical_url));
                link rel="icon" type="image/svg+xml" href=(Text(&favicon));

                // Open Graph
                meta property="og:type" content="music.playlist";
                meta property="og:url" content=(Text(&meta.canonical_url));
                meta property="og:title" content=(Text(&meta.title));
                meta property="og:description" content=(Text(&meta.description));
                meta property="og:image" content=(Text(&image.url));
                meta property="og:image:width" content=(og_width);
                meta property="og:image:height" content=(og_height);
                meta property="og:site_name" content=(Text(site_name));
                meta property="og:locale" content="en_US";
                meta property="fb:app_id" content=(Text(&config.facebook_app_id));

                // Twitter Card
                meta name="twitter:card" content="summary_large_image";
                meta name="twitter:url" content=(Text(&meta.canonical_url));
                meta name="twitter:title" content=(Text(&meta.title));
                meta name="twitter:description" content=(Text(&meta.description));
                meta name="twitter:image" content=(Text(&image.url));

                // App Links
                meta property="al:ios:url" content=(Text(&meta.deep_link));
                meta property="al:ios:app_store_id" content=(Text(&config.ios_app_store_id));
                meta property="al:ios:app_name" content=(Text(site_name));
                meta property="al:android:url" content=(Text(&meta.deep_link));
                meta property="al:android:package" content=(Text(&config.android_package));
                meta property="al:android:app_name" content=(Text(site_name));
                meta property="al:web:url" content=(Text(&meta.canonical_url));

                style { (PreEscaped(PAGE_CSS)) }
            }
            body {
                main class="share" {
                    img class="share-image" src=(Text(&image.url)) alt=(Text(&meta.title));
                    h1 class="share-title" { (Text(&meta.title)) }
                    p class="share-description" { (Text(&meta.description)) }
                    div class="actions" {
                        a class="open-app" href=(Text(&meta.deep_link)) { "Open in " (Text(site_name)) }
                        div class="store-links" {
                            a href=(Text(&config.ios_store_url)) { "Get the app for iOS" }
                            a href=(Text(&config.android_store_url)) { "Get the app for Android" }
                        }
                    }
                }
            }
        }
    }
}
