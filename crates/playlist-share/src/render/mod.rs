//! Rendering of share surfaces.
//!
//! - [`snapshot`]: the self-contained HTML page served to crawlers
//! - [`og_image`]: the generated 1200x630 preview PNG
//!
//! HTML uses [maud](https://maud.lambda.xyz/) for compile-time templates.
//! Every dynamic value goes through [`components::Text`], which escapes
//! single quotes in addition to maud's defaults.

pub mod components;
pub mod og_image;
pub mod snapshot;
