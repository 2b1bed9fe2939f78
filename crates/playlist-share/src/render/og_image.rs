//! Generated playlist preview image.
//!
//! Layout (1200x630, standard OG dimensions):
//! - vertical gradient from the background color to a darkened variant
//! - square cover centered near the top, or a placeholder tile with a note glyph
//! - playlist title and "by {owner} • {n} videos" caption
//! - brand badge at the bottom
//!
//! The card is described as SVG and rasterized with resvg. Rendering never
//! fails outward: if the full card cannot be produced it is re-rendered
//! without the cover, then as a plain gradient, and as a last resort a
//! black PNG baked into the binary is returned.

use std::sync::{Arc, LazyLock};

use base64::Engine;
use resvg::tiny_skia;
use resvg::usvg;

use super::components::{escape_html, truncate};
use crate::color::Rgb;
use crate::resolve::owner_caption;

/// OG image dimensions (standard Open Graph).
pub const OG_WIDTH: u32 = 1200;
pub const OG_HEIGHT: u32 = 630;

/// Cover tile size and position.
const COVER_SIZE: u32 = 300;
const COVER_TOP: u32 = 50;

/// Longest title (in bytes) drawn before truncation.
const MAX_TITLE_LEN: usize = 40;

/// Black 1200x630 PNG served when nothing can be rasterized.
const FALLBACK_PNG: &[u8] = include_bytes!("fallback.png");

const PLACEHOLDER_FILL: &str = "#353539";
const MUTED_TEXT: &str = "#A8A7AD";
const BRAND_COLOR: &str = "#24FF96";

/// Font family string for SVG text (sans single quotes that confuse `format!`).
const FONT_FAMILY: &str = "Inter, -apple-system, BlinkMacSystemFont, Segoe UI, Roboto, sans-serif";

/// System fonts, loaded once on first render.
static FONTS: LazyLock<Arc<usvg::fontdb::Database>> = LazyLock::new(|| {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded system fonts for OG images");
    Arc::new(db)
});

/// Why a card could not be rasterized.
#[derive(Debug, thiserror::Error)]
pub enum RenderFailure {
    #[error("SVG parse error: {0}")]
    Svg(String),
    #[error("failed to allocate pixmap")]
    Pixmap,
    #[error("PNG encode error: {0}")]
    Encode(String),
}

/// Inputs of the preview card.
#[derive(Debug, Clone)]
pub struct PlaylistCard<'a> {
    pub title: &'a str,
    pub owner_name: &'a str,
    pub video_count: u64,
    pub background: Rgb,
    /// Text shown in the brand badge.
    pub brand: &'a str,
}

/// Render the card as PNG bytes. Always returns an image.
pub fn render_card(card: &PlaylistCard<'_>, cover: Option<&[u8]>) -> Vec<u8> {
    if cover.is_some() {
        match rasterize(&card_svg(card, cover)) {
            Ok(png) => return png,
            Err(err) => {
                tracing::warn!(error = %err, "card render with cover failed, retrying without it");
            }
        }
    }

    match rasterize(&card_svg(card, None)) {
        Ok(png) => png,
        Err(err) => {
            tracing::error!(error = %err, "card render failed, falling back to plain gradient");
            plain_gradient(card.background).unwrap_or_else(|err| {
                tracing::error!(error = %err, "plain gradient render failed, serving baked fallback");
                FALLBACK_PNG.to_vec()
            })
        }
    }
}

/// Build the SVG document for a card.
fn card_svg(card: &PlaylistCard<'_>, cover: Option<&[u8]>) -> String {
    let top = card.background;
    let bottom = top.darkened();
    let mut svg = String::with_capacity(8192);

    svg.push_str(&format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><defs><linearGradient id="bg" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{top}"/><stop offset="1" stop-color="{bottom}"/></linearGradient><clipPath id="cc"><rect x="{cx}" y="{cy}" width="{s}" height="{s}" rx="12"/></clipPath></defs><rect width="{w}" height="{h}" fill="url(#bg)"/>"##,
        w = OG_WIDTH,
        h = OG_HEIGHT,
        cx = (OG_WIDTH - COVER_SIZE) / 2,
        cy = COVER_TOP,
        s = COVER_SIZE,
    ));

    // The placeholder sits under the cover, so an undecodable cover still
    // leaves the tile visible.
    svg.push_str(&placeholder_tile());

    if let Some(bytes) = cover {
        let mime = detect_image_mime(bytes);
        let b64 = base64::engine::general_purpose::STANDARD.encode(bytes);
        svg.push_str(&format!(
            r##"<image href="data:{mime};base64,{b64}" x="{x}" y="{y}" width="{s}" height="{s}" clip-path="url(#cc)" preserveAspectRatio="xMidYMid slice"/>"##,
            x = (OG_WIDTH - COVER_SIZE) / 2,
            y = COVER_TOP,
            s = COVER_SIZE,
        ));
    }

    let title = escape_html(&truncate(card.title, MAX_TITLE_LEN));
    let caption = escape_html(&owner_caption(card.owner_name, card.video_count));
    let center = OG_WIDTH / 2;

    svg.push_str(&format!(
        r##"<text x="{center}" y="420" text-anchor="middle" font-family="{FONT_FAMILY}" font-size="56" font-weight="700" fill="#FFFFFF">{title}</text>"##
    ));
    svg.push_str(&format!(
        r##"<text x="{center}" y="476" text-anchor="middle" font-family="{FONT_FAMILY}" font-size="32" fill="{MUTED_TEXT}">{caption}</text>"##
    ));

    svg.push_str(&brand_badge(card.brand));
    svg.push_str("</svg>");
    svg
}

/// Rounded tile with a music note glyph, drawn where the cover goes.
fn placeholder_tile() -> String {
    let x = (OG_WIDTH - COVER_SIZE) / 2;
    let cx = OG_WIDTH / 2;
    let cy = COVER_TOP + COVER_SIZE / 2;
    format!(
        r##"<rect x="{x}" y="{y}" width="{s}" height="{s}" rx="12" fill="{PLACEHOLDER_FILL}"/><g fill="{MUTED_TEXT}"><ellipse cx="{hx}" cy="{hy}" rx="30" ry="24"/><rect x="{sx}" y="{sy}" width="10" height="110"/><path d="M{fx} {sy} q50 12 52 62 q-18 -28 -52 -30 z"/></g>"##,
        y = COVER_TOP,
        s = COVER_SIZE,
        hx = cx - 20,
        hy = cy + 45,
        sx = cx,
        sy = cy - 65,
        fx = cx + 10,
    )
}

/// Outlined badge with the brand name, centered at the bottom.
fn brand_badge(brand: &str) -> String {
    let label = escape_html(brand);
    // Bold 24px glyphs average ~16px wide.
    let width = brand.chars().count() as u32 * 16 + 48;
    let x = (OG_WIDTH - width.min(OG_WIDTH)) / 2;
    format!(
        r##"<rect x="{x}" y="520" width="{width}" height="52" rx="8" fill="{BRAND_COLOR}" fill-opacity="0.2" stroke="{BRAND_COLOR}" stroke-width="2"/><text x="{center}" y="555" text-anchor="middle" font-family="{FONT_FAMILY}" font-size="24" font-weight="700" fill="{BRAND_COLOR}">{label}</text>"##,
        center = OG_WIDTH / 2,
    )
}

/// Parse and render an SVG document to PNG bytes.
fn rasterize(svg: &str) -> Result<Vec<u8>, RenderFailure> {
    let options = usvg::Options {
        fontdb: FONTS.clone(),
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| RenderFailure::Svg(e.to_string()))?;

    let mut pixmap = tiny_skia::Pixmap::new(OG_WIDTH, OG_HEIGHT).ok_or(RenderFailure::Pixmap)?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| RenderFailure::Encode(e.to_string()))
}

/// Background gradient only, drawn without the SVG pipeline.
fn plain_gradient(background: Rgb) -> Result<Vec<u8>, RenderFailure> {
    let mut pixmap = tiny_skia::Pixmap::new(OG_WIDTH, OG_HEIGHT).ok_or(RenderFailure::Pixmap)?;
    let bottom = background.darkened();

    let shader = tiny_skia::LinearGradient::new(
        tiny_skia::Point::from_xy(0.0, 0.0),
        tiny_skia::Point::from_xy(0.0, OG_HEIGHT as f32),
        vec![
            tiny_skia::GradientStop::new(0.0, to_skia(background)),
            tiny_skia::GradientStop::new(1.0, to_skia(bottom)),
        ],
        tiny_skia::SpreadMode::Pad,
        tiny_skia::Transform::identity(),
    );

    match shader {
        Some(shader) => {
            let paint = tiny_skia::Paint {
                shader,
                ..tiny_skia::Paint::default()
            };
            let rect = tiny_skia::Rect::from_xywh(0.0, 0.0, OG_WIDTH as f32, OG_HEIGHT as f32)
                .ok_or(RenderFailure::Pixmap)?;
            pixmap.fill_rect(rect, &paint, tiny_skia::Transform::identity(), None);
        }
        // Degenerate gradient (identical stops), a flat fill is equivalent.
        None => pixmap.fill(to_skia(background)),
    }

    pixmap
        .encode_png()
        .map_err(|e| RenderFailure::Encode(e.to_string()))
}

fn to_skia(c: Rgb) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba8(c.r, c.g, c.b, 255)
}

/// Detect MIME type from image bytes (basic magic byte detection).
fn detect_image_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"\xFF\xD8\xFF") {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP") {
        "image/webp"
    } else {
        // Most covers are JPEG
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(title: &str, count: u64) -> PlaylistCard<'_> {
        PlaylistCard {
            title,
            owner_name: "Avery",
            video_count: count,
            background: Rgb { r: 0x1d, g: 0xb9, b: 0x54 },
            brand: "FITN",
        }
    }

    /// Width and height from a PNG IHDR chunk.
    fn png_dimensions(png: &[u8]) -> (u32, u32) {
        assert!(png.starts_with(b"\x89PNG\r\n\x1a\n"), "not a PNG");
        let w = u32::from_be_bytes(png[16..20].try_into().unwrap());
        let h = u32::from_be_bytes(png[20..24].try_into().unwrap());
        (w, h)
    }

    #[test]
    fn svg_has_gradient_from_color_to_darkened() {
        let svg = card_svg(&card("Leg Day", 7), None);
        assert!(svg.contains(r##"stop-color="#1db954""##));
        assert!(svg.contains(r##"stop-color="#009b36""##));
    }

    #[test]
    fn svg_caption_pluralizes() {
        assert!(card_svg(&card("Leg Day", 7), None).contains("by Avery • 7 videos"));
        assert!(card_svg(&card("Leg Day", 1), None).contains("by Avery • 1 video<"));
    }

    #[test]
    fn svg_escapes_title() {
        let svg = card_svg(&card("<Arms & Abs>", 3), None);
        assert!(svg.contains("&lt;Arms &amp; Abs&gt;"));
        assert!(!svg.contains("<Arms"));
    }

    #[test]
    fn svg_truncates_long_title() {
        let long = "a".repeat(100);
        let svg = card_svg(&card(&long, 3), None);
        assert!(svg.contains(&format!("{}...", "a".repeat(MAX_TITLE_LEN))));
    }

    #[test]
    fn svg_without_cover_has_placeholder_only() {
        let svg = card_svg(&card("Leg Day", 7), None);
        assert!(svg.contains(PLACEHOLDER_FILL));
        assert!(!svg.contains("<image"));
    }

    #[test]
    fn svg_with_cover_embeds_data_uri() {
        let svg = card_svg(&card("Leg Day", 7), Some(b"\x89PNG\r\n\x1a\nrest"));
        assert!(svg.contains(r#"href="data:image/png;base64,"#));
        assert!(svg.contains(PLACEHOLDER_FILL));
    }

    #[test]
    fn renders_standard_dimensions() {
        let png = render_card(&card("Leg Day", 7), None);
        assert_eq!(png_dimensions(&png), (OG_WIDTH, OG_HEIGHT));
    }

    #[test]
    fn garbage_cover_still_renders() {
        let png = render_card(&card("Leg Day", 7), Some(b"definitely not an image"));
        assert_eq!(png_dimensions(&png), (OG_WIDTH, OG_HEIGHT));
    }

    #[test]
    fn plain_gradient_has_standard_dimensions() {
        let png = plain_gradient(Rgb::BLACK).unwrap();
        assert_eq!(png_dimensions(&png), (OG_WIDTH, OG_HEIGHT));
    }

    #[test]
    fn baked_fallback_is_a_standard_png() {
        assert_eq!(png_dimensions(FALLBACK_PNG), (OG_WIDTH, OG_HEIGHT));
        assert!(FALLBACK_PNG.ends_with(b"IEND\xAEB`\x82"));
    }

    #[test]
    fn detect_mime_types() {
        assert_eq!(detect_image_mime(b"\xFF\xD8\xFF\xE0"), "image/jpeg");
        assert_eq!(detect_image_mime(b"GIF89a"), "image/gif");
        assert_eq!(detect_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
        assert_eq!(detect_image_mime(b"????"), "image/jpeg");
    }
}
