//! Colour tokens and pixel blending.
//!
//! Colours travel through settings and slide backgrounds as CSS-style hex
//! tokens (`#F97316`, `#fff`). They are only turned into pixels at composite
//! time.

use image::{Rgb, RgbImage};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color {0:?}: expected #RGB or #RRGGBB")]
pub struct InvalidColor(pub String);

/// Parse a `#RGB` or `#RRGGBB` token (case-insensitive, `#` optional).
pub fn parse_hex_color(token: &str) -> Result<Rgb<u8>, InvalidColor> {
    let invalid = || InvalidColor(token.to_string());
    let digits = token.trim().trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return Err(invalid()),
    };
    let bytes = hex::decode(&expanded).map_err(|_| invalid())?;
    Ok(Rgb([bytes[0], bytes[1], bytes[2]]))
}

/// Alpha-blend `color` over one pixel.
#[inline]
pub fn blend_pixel(dst: &mut Rgb<u8>, color: Rgb<u8>, alpha: f32) {
    let a = alpha.clamp(0.0, 1.0);
    let inv = 1.0 - a;
    for c in 0..3 {
        dst.0[c] = (color.0[c] as f32 * a + dst.0[c] as f32 * inv).round() as u8;
    }
}

/// Fill the whole canvas with `color` blended at `alpha`.
pub fn fill_blended(canvas: &mut RgbImage, color: Rgb<u8>, alpha: f32) {
    if alpha <= 0.0 {
        return;
    }
    if alpha >= 1.0 {
        canvas.pixels_mut().for_each(|p| *p = color);
        return;
    }
    for p in canvas.pixels_mut() {
        blend_pixel(p, color, alpha);
    }
}
