//! Pure calculation functions for crop regions.
//!
//! All functions here are pure and testable without any I/O or images.

/// A rectangle inside a source image, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    /// The region covering the whole source.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Centered crop that fills a frame of `target_ratio` (width / height).
///
/// Mirrors CSS `background-size: cover; background-position: center`:
/// - source relatively wider → keep full height, trim the sides equally
/// - otherwise → keep full width, trim top and bottom equally
///
/// The cropped edge is rounded to whole pixels and never exceeds the source.
///
/// # Examples
/// ```
/// # use carousel_export::imaging::{CropRegion, cover_crop_region};
/// // 1000x500 landscape into a square frame → centered 500x500
/// assert_eq!(
///     cover_crop_region((1000, 500), 1.0),
///     CropRegion { x: 250, y: 0, width: 500, height: 500 }
/// );
/// ```
pub fn cover_crop_region(source: (u32, u32), target_ratio: f64) -> CropRegion {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return CropRegion::full(src_w, src_h);
    }
    let src_ratio = src_w as f64 / src_h as f64;

    if src_ratio > target_ratio {
        // Source is wider: height matches, width is trimmed
        let width = ((src_h as f64 * target_ratio).round() as u32).clamp(1, src_w);
        CropRegion {
            x: (src_w - width) / 2,
            y: 0,
            width,
            height: src_h,
        }
    } else {
        // Source is taller (or equal): width matches, height is trimmed
        let height = ((src_w as f64 / target_ratio).round() as u32).clamp(1, src_h);
        CropRegion {
            x: 0,
            y: (src_h - height) / 2,
            width: src_w,
            height,
        }
    }
}
