//! Shared test utilities for the carousel-export test suite.
//!
//! Provides synthetic images, a ready-made carousel, fake fonts with fixed
//! metrics, and archive inspection helpers.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let carousel = sample_carousel(5);
//! let painter = BlockPainter::default();
//! // export with Loaded(painter), then:
//! assert_eq!(zip_entry_names(&outcome.archive)[0], "slide-1.jpeg");
//! ```

use crate::imaging::color::blend_pixel;
use crate::imaging::{Quality, encode_jpeg};
use crate::render::{GlyphPainter, LineMetrics, TextMeasure};
use crate::settings::Colors;
use crate::slides::Carousel;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Synthetic images
// =========================================================================

/// Diagonal RGB gradient, so crops and resizes have something to show.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

pub fn png_bytes(img: &RgbImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn jpeg_bytes(img: &RgbImage) -> Vec<u8> {
    encode_jpeg(img, Quality::default()).unwrap()
}

// =========================================================================
// Carousels
// =========================================================================

/// An `n`-slide carousel with the default colours and small JPEG covers.
pub fn sample_carousel(n: u32) -> Carousel {
    let texts = (1..=n)
        .map(|i| format!("Slide {i}\nA ++short++ line of **body** text."))
        .collect();
    Carousel::from_parts(
        texts,
        jpeg_bytes(&gradient_image(64, 64)),
        jpeg_bytes(&gradient_image(80, 48)),
        &Colors::default(),
    )
}

/// Entry names of a zip, in archive order.
pub fn zip_entry_names(archive: &[u8]) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

// =========================================================================
// Fake fonts
// =========================================================================

/// Monospace metrics: every char advances `0.5 * px`, ascent `0.8 * px`,
/// descent `0.2 * px`.
pub struct FixedMeasure;

impl TextMeasure for FixedMeasure {
    fn advance(&self, text: &str, px: f32, _bold: bool) -> f32 {
        text.chars().count() as f32 * 0.5 * px
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: 0.8 * px,
            descent: 0.2 * px,
        }
    }
}

/// Draws each non-space character as a solid block, with [`FixedMeasure`]
/// metrics.
#[derive(Default)]
pub struct BlockPainter;

impl TextMeasure for BlockPainter {
    fn advance(&self, text: &str, px: f32, bold: bool) -> f32 {
        FixedMeasure.advance(text, px, bold)
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        FixedMeasure.line_metrics(px)
    }
}

impl GlyphPainter for BlockPainter {
    fn draw(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        px: f32,
        _bold: bool,
        x: f32,
        baseline: f32,
        color: Rgb<u8>,
        opacity: f32,
    ) {
        let advance = 0.5 * px;
        let top = (baseline - 0.7 * px).round().max(0.0) as u32;
        let bottom = (baseline.round().max(0.0) as u32).min(canvas.height());
        for (i, ch) in text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let left = (x + i as f32 * advance).round().max(0.0) as u32;
            let right = ((x + i as f32 * advance + 0.6 * advance).round().max(0.0) as u32)
                .max(left + 1)
                .min(canvas.width());
            for py in top..bottom {
                for px in left..right {
                    blend_pixel(canvas.get_pixel_mut(px, py), color, opacity);
                }
            }
        }
    }
}
