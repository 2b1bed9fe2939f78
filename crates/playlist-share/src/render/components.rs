//! Shared rendering pieces: escaping, truncation, inline CSS and headers.

use maud::{Markup, PreEscaped, Render};

/// Text that is HTML-escaped when spliced into a maud template.
///
/// Unlike maud's built-in `&str` rendering this also escapes `'`, so values
/// stay inert in single-quoted attribute contexts too.
#[derive(Debug, Clone, Copy)]
pub struct Text<'a>(pub &'a str);

impl Render for Text<'_> {
    fn render_to(&self, buffer: &mut String) {
        escape_into(self.0, buffer);
    }

    fn render(&self) -> Markup {
        PreEscaped(escape_html(self.0))
    }
}

/// Escape `&`, `<`, `>`, `"` and `'`. Safe for HTML text, attributes and SVG.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 16);
    escape_into(s, &mut out);
    out
}

fn escape_into(s: &str, buffer: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buffer.push_str("&amp;"),
            '<' => buffer.push_str("&lt;"),
            '>' => buffer.push_str("&gt;"),
            '"' => buffer.push_str("&quot;"),
            '\'' => buffer.push_str("&#39;"),
            _ => buffer.push(c),
        }
    }
}

/// Inline CSS for the snapshot page.
pub const PAGE_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
:root{--bg:#000;--fg:#fff;--fg2:#a8a7ad;--accent:#24ff96;--surface:#161618;--border:#353539}
body{font-family:Inter,-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;line-height:1.5;color:var(--fg);background:var(--bg);min-height:100vh;display:flex;align-items:center;justify-content:center;padding:1.5rem 1rem}
main.share{max-width:480px;width:100%;text-align:center}
.share-image{width:100%;aspect-ratio:1200/630;object-fit:cover;border-radius:12px;background:var(--surface);margin-bottom:1.5rem}
.share-title{font-size:1.75rem;font-weight:700;letter-spacing:-.01em}
.share-description{color:var(--fg2);margin-top:.5rem}
.actions{margin-top:1.5rem;display:flex;flex-direction:column;gap:.75rem;align-items:center}
.open-app{display:inline-block;padding:.6rem 1.4rem;background:var(--accent);color:#000;border-radius:8px;font-weight:600;text-decoration:none}
.store-links{display:flex;gap:1rem;font-size:.9rem}
.store-links a{color:var(--fg2)}
"#;

/// Inline CSS for error pages.
pub const ERROR_CSS: &str = r#"
*{margin:0;padding:0;box-sizing:border-box}
body{font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,sans-serif;display:flex;justify-content:center;align-items:center;min-height:100vh;background:#000;color:#fff;padding:1rem}
.error-page{text-align:center;max-width:400px}
.error-page h1{font-size:1.5rem;margin-bottom:.75rem}
.error-page p{color:#a8a7ad;margin-bottom:1rem;line-height:1.5}
.error-page a{color:#24ff96}
"#;

/// Content-Security-Policy for snapshot pages.
///
/// Snapshots are inert documents: no scripts at all.
pub const CSP_HEADER: &str = "default-src 'none'; style-src 'unsafe-inline'; img-src https: http: data:; form-action 'none'; frame-ancestors 'none'";

/// Truncate a string to a maximum byte length, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let mut end = max_len;
        while !s.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maud::html;

    #[test]
    fn escapes_all_five() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn escape_leaves_plain_text() {
        assert_eq!(escape_html("Leg Day • 7 videos"), "Leg Day • 7 videos");
    }

    #[test]
    fn text_escapes_in_body_and_attributes() {
        let name = r#"x' onload='alert(1)" <b>"#;
        let markup = html! {
            p title=(Text(name)) { (Text(name)) }
        };
        let out = markup.into_string();
        assert!(!out.contains("<b>"));
        assert!(!out.contains("' onload"));
        assert!(out.contains("&#39; onload=&#39;alert(1)&quot; &lt;b&gt;"));
    }

    // -- truncate() tests --

    #[test]
    fn truncate_shorter_than_max() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn truncate_longer_than_max() {
        assert_eq!(truncate("hello world", 5), "hello...");
    }

    #[test]
    fn truncate_unicode_multibyte() {
        // 'é' is 2 bytes; byte 4 lands inside it, so it backs up to byte 3
        assert_eq!(truncate("café", 4), "caf...");
    }

    #[test]
    fn truncate_unicode_emoji() {
        assert_eq!(truncate("🎉hello", 2), "...");
    }
}
