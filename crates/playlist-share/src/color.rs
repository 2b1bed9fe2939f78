//! Background color handling for share pages and generated images.

use std::fmt;

/// Amount subtracted from each channel for the bottom of the gradient.
const DARKEN_DELTA: u8 = 30;

/// An opaque RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };

    /// Parse `#rrggbb` or `rrggbb` (case-insensitive).
    pub fn parse_hex(input: &str) -> Option<Self> {
        let hex = input.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Parse an optional query value, falling back to black.
    pub fn from_param(input: Option<&str>) -> Self {
        input.and_then(Self::parse_hex).unwrap_or(Self::BLACK)
    }

    /// Each channel reduced by a fixed delta, floored at 0.
    pub fn darkened(self) -> Self {
        Self {
            r: self.r.saturating_sub(DARKEN_DELTA),
            g: self.g.saturating_sub(DARKEN_DELTA),
            b: self.b.saturating_sub(DARKEN_DELTA),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}
