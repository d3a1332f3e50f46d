//! Slide compositing: background, overlay, then text.
//!
//! Image backgrounds are cover-fitted with the same centered crop the
//! [`crop`](crate::imaging::crop) helper uses, then resized to the frame and
//! tinted by the flat overlay. Colour backgrounds fill the frame. Text follows
//! [`compute_text_layout`]; on image backgrounds each run is first drawn as a
//! half-transparent black shadow offset by one preview pixel.

use super::layout::{Frame, TextLayout, compute_text_layout};
use super::markup::Emphasis;
use super::text::GlyphPainter;
use crate::imaging::color::fill_blended;
use crate::imaging::{ImagingError, InvalidColor, cover_crop_region, decode, parse_hex_color};
use crate::settings::VisualSettings;
use crate::slides::{BackgroundKind, ReadyBackground};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use thiserror::Error;

/// Shadow offset in preview pixels.
const SHADOW_OFFSET: f32 = 1.0;
const SHADOW_OPACITY: f32 = 0.5;
const SHADOW_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Decode(#[from] ImagingError),
    #[error("{field}: {source}")]
    Color { field: &'static str, source: InvalidColor },
}

fn color(field: &'static str, token: &str) -> Result<Rgb<u8>, RenderError> {
    parse_hex_color(token).map_err(|source| RenderError::Color { field, source })
}

/// Paint the background into a new frame-sized canvas.
pub fn composite_background(
    background: ReadyBackground<'_>,
    visual: &VisualSettings,
    frame: Frame,
) -> Result<RgbImage, RenderError> {
    match background {
        ReadyBackground::Color(token) => {
            let fill = color("background", token)?;
            Ok(RgbImage::from_pixel(frame.width, frame.height, fill))
        }
        ReadyBackground::Image(bytes) => {
            let overlay = color("overlay_color", &visual.colors.overlay_color)?;
            let img = decode(bytes)?;
            let region = cover_crop_region((img.width(), img.height()), frame.ratio());
            let cropped = img
                .crop_imm(region.x, region.y, region.width, region.height)
                .to_rgb8();
            let mut canvas = if cropped.dimensions() == (frame.width, frame.height) {
                cropped
            } else {
                imageops::resize(&cropped, frame.width, frame.height, FilterType::Lanczos3)
            };
            fill_blended(&mut canvas, overlay, visual.style.overlay_opacity);
            Ok(canvas)
        }
    }
}

/// Draw laid-out text onto `canvas`.
pub fn draw_text(
    canvas: &mut RgbImage,
    layout: &TextLayout,
    painter: &dyn GlyphPainter,
    visual: &VisualSettings,
    kind: BackgroundKind,
    frame: Frame,
) -> Result<(), RenderError> {
    let base = if kind.wants_light_text() {
        color("text_light", &visual.colors.text_light)?
    } else {
        color("text_dark", &visual.colors.text_dark)?
    };
    let highlight = color("highlight", &visual.colors.highlight)?;
    let shadow = (kind == BackgroundKind::Image).then_some(SHADOW_OFFSET * frame.scale);

    for line in &layout.lines {
        for run in line.runs.iter().filter(|r| !r.text.trim().is_empty()) {
            if let Some(offset) = shadow {
                painter.draw(
                    canvas,
                    &run.text,
                    line.px,
                    run.bold,
                    run.x + offset,
                    line.baseline + offset,
                    SHADOW_COLOR,
                    SHADOW_OPACITY,
                );
            }
            let fill = match run.emphasis {
                Emphasis::Highlight => highlight,
                Emphasis::Plain | Emphasis::Bold => base,
            };
            painter.draw(canvas, &run.text, line.px, run.bold, run.x, line.baseline, fill, 1.0);
        }
    }
    Ok(())
}

/// Composite one slide: background, overlay, text.
pub fn render_frame(
    text: &str,
    background: ReadyBackground<'_>,
    kind: BackgroundKind,
    visual: &VisualSettings,
    frame: Frame,
    painter: &dyn GlyphPainter,
) -> Result<RgbImage, RenderError> {
    let mut canvas = composite_background(background, visual, frame)?;
    let layout = compute_text_layout(text, visual, frame, painter);
    draw_text(&mut canvas, &layout, painter, visual, kind, frame)?;
    Ok(canvas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{BlockPainter, gradient_image, png_bytes};

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            width,
            height,
            scale: 1.0,
        }
    }

    /// Small margin and type so text fits test-sized frames.
    fn compact() -> VisualSettings {
        let mut v = VisualSettings::default();
        v.style.margin = 5.0;
        v.typography.title_font_size = 16.0;
        v.typography.description_font_size = 10.0;
        v
    }

    #[test]
    fn colour_background_fills_frame() {
        let canvas = composite_background(
            ReadyBackground::Color("#112233"),
            &VisualSettings::default(),
            frame(40, 50),
        )
        .unwrap();
        assert_eq!(canvas.dimensions(), (40, 50));
        assert!(canvas.pixels().all(|p| *p == Rgb([0x11, 0x22, 0x33])));
    }

    #[test]
    fn image_background_is_cover_fitted_with_overlay() {
        let mut visual = VisualSettings::default();
        visual.style.overlay_opacity = 0.5;
        visual.colors.overlay_color = "#000000".into();
        let white = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        let bytes = png_bytes(&white);
        let canvas =
            composite_background(ReadyBackground::Image(&bytes), &visual, frame(40, 50)).unwrap();
        assert_eq!(canvas.dimensions(), (40, 50));
        let p = canvas.get_pixel(20, 25);
        assert!(p.0.iter().all(|&c| (126..=129).contains(&c)), "{p:?}");
    }

    #[test]
    fn cover_fit_keeps_the_center() {
        // Red | green | blue thirds; a square frame shows only green.
        let src = RgbImage::from_fn(300, 100, |x, _| match x {
            0..100 => Rgb([255, 0, 0]),
            100..200 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let mut visual = VisualSettings::default();
        visual.style.overlay_opacity = 0.0;
        let canvas =
            composite_background(ReadyBackground::Image(&png_bytes(&src)), &visual, frame(50, 50))
                .unwrap();
        for (x, y) in [(5, 5), (25, 25), (44, 44)] {
            let p = canvas.get_pixel(x, y);
            assert!(p[1] > 200 && p[0] < 60 && p[2] < 60, "({x},{y}) = {p:?}");
        }
    }

    #[test]
    fn undecodable_image_is_decode_error() {
        let err = composite_background(
            ReadyBackground::Image(b"nope"),
            &VisualSettings::default(),
            frame(10, 10),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::Decode(ImagingError::Decode(_))));
    }

    #[test]
    fn bad_colour_token_names_the_field() {
        let err = composite_background(
            ReadyBackground::Color("tomato"),
            &VisualSettings::default(),
            frame(10, 10),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("background:"));
    }

    #[test]
    fn text_colour_follows_background_kind() {
        let painter = BlockPainter::default();
        let visual = compact();
        let light = render_frame(
            "IIII",
            ReadyBackground::Color("#FFFFFF"),
            BackgroundKind::Light,
            &visual,
            frame(100, 100),
            &painter,
        )
        .unwrap();
        assert!(light.pixels().any(|p| *p == Rgb([0, 0, 0])));

        let dark = render_frame(
            "IIII",
            ReadyBackground::Color("#000000"),
            BackgroundKind::Dark,
            &visual,
            frame(100, 100),
            &painter,
        )
        .unwrap();
        assert!(dark.pixels().any(|p| *p == Rgb([255, 255, 255])));
    }

    #[test]
    fn highlight_runs_use_highlight_colour() {
        let painter = BlockPainter::default();
        let canvas = render_frame(
            "++HOT++",
            ReadyBackground::Color("#FFFFFF"),
            BackgroundKind::Light,
            &compact(),
            frame(200, 100),
            &painter,
        )
        .unwrap();
        assert!(canvas.pixels().any(|p| *p == Rgb([0xF9, 0x73, 0x16])));
        assert!(!canvas.pixels().any(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn image_slides_get_a_shadow() {
        let painter = BlockPainter::default();
        let mut visual = compact();
        visual.style.overlay_opacity = 0.0;
        let bright = png_bytes(&RgbImage::from_pixel(100, 100, Rgb([200, 200, 200])));
        let canvas = render_frame(
            "Title",
            ReadyBackground::Image(&bright),
            BackgroundKind::Image,
            &visual,
            frame(100, 100),
            &painter,
        )
        .unwrap();
        // Text pixels are white; shadow pixels darken the grey background.
        assert!(canvas.pixels().any(|p| *p == Rgb([255, 255, 255])));
        assert!(canvas.pixels().any(|p| p[0] < 150));
    }

    #[test]
    fn rendered_frame_matches_frame_size() {
        let painter = BlockPainter::default();
        let bytes = png_bytes(&gradient_image(64, 64));
        let canvas = render_frame(
            "Cover\nBody",
            ReadyBackground::Image(&bytes),
            BackgroundKind::Image,
            &VisualSettings::default(),
            frame(108, 135),
            &painter,
        )
        .unwrap();
        assert_eq!(canvas.dimensions(), (108, 135));
    }
}
