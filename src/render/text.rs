//! Glyph rasterizing and font loading.
//!
//! [`GlyphPainter`] is the seam between layout/compositing and an actual font
//! rasterizer. The production painter, [`RusttypePainter`], wraps a regular
//! face and an optional bold face; without a bold face, bold runs are
//! emboldened by overstriking.
//!
//! Fonts are resolved from a directory by family name:
//!
//! ```text
//! <font_dir>/
//! ├── Inter-Regular.ttf     ← "Inter, sans-serif"
//! ├── Inter-Bold.ttf        (optional)
//! └── PlayfairDisplay-Regular.ttf  ← "'Playfair Display', serif"
//! ```
//!
//! Loading happens on a background thread ([`FontLoader`]). The export's sync
//! stage waits on it with a timeout through the [`FontSource`] trait.

use super::layout::{LineMetrics, TextMeasure};
use crate::imaging::color::blend_pixel;
use image::{Rgb, RgbImage};
use rusttype::{Font, Scale, point};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;
use thiserror::Error;

/// Measures and draws text onto an RGB canvas.
pub trait GlyphPainter: TextMeasure {
    /// Draw `text` with its baseline starting at `(x, baseline)`, blending
    /// `color` at `opacity`.
    #[allow(clippy::too_many_arguments)]
    fn draw(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        px: f32,
        bold: bool,
        x: f32,
        baseline: f32,
        color: Rgb<u8>,
        opacity: f32,
    );
}

#[derive(Error, Debug)]
pub enum FontError {
    #[error("No font file for family {family:?} in {dir}")]
    NotFound { family: String, dir: PathBuf },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0} is not a usable TrueType/OpenType font")]
    Parse(PathBuf),
}

/// Why a font source could not provide a painter.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("fonts not ready after {0:?}")]
    Timeout(Duration),
    #[error("font loading failed: {0}")]
    Failed(String),
}

/// Something that eventually yields a painter.
pub trait FontSource {
    /// Block until the painter is ready or `timeout` elapses.
    fn wait_ready(&mut self, timeout: Duration) -> Result<&dyn GlyphPainter, SyncError>;
}

/// A painter that is already available.
pub struct Loaded<P>(pub P);

impl<P: GlyphPainter> FontSource for Loaded<P> {
    fn wait_ready(&mut self, _timeout: Duration) -> Result<&dyn GlyphPainter, SyncError> {
        Ok(&self.0)
    }
}

// ============================================================================
// rusttype painter
// ============================================================================

pub struct RusttypePainter {
    regular: Font<'static>,
    bold: Option<Font<'static>>,
}

impl RusttypePainter {
    pub fn new(regular: Font<'static>, bold: Option<Font<'static>>) -> Self {
        Self { regular, bold }
    }

    /// Face and overstrike offset for a run.
    fn face(&self, bold: bool, px: f32) -> (&Font<'static>, f32) {
        match (bold, &self.bold) {
            (true, Some(face)) => (face, 0.0),
            (true, None) => (&self.regular, (px / 24.0).max(1.0)),
            (false, _) => (&self.regular, 0.0),
        }
    }
}

impl TextMeasure for RusttypePainter {
    fn advance(&self, text: &str, px: f32, bold: bool) -> f32 {
        let (font, overstrike) = self.face(bold, px);
        let scale = Scale::uniform(px);
        let mut width = 0.0;
        let mut previous = None;
        for ch in text.chars() {
            let glyph = font.glyph(ch).scaled(scale);
            if let Some(prev) = previous {
                width += font.pair_kerning(scale, prev, glyph.id());
            }
            width += glyph.h_metrics().advance_width;
            previous = Some(glyph.id());
        }
        if width > 0.0 { width + overstrike } else { 0.0 }
    }

    fn line_metrics(&self, px: f32) -> LineMetrics {
        let v = self.regular.v_metrics(Scale::uniform(px));
        LineMetrics {
            ascent: v.ascent,
            descent: -v.descent,
        }
    }
}

impl GlyphPainter for RusttypePainter {
    fn draw(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        px: f32,
        bold: bool,
        x: f32,
        baseline: f32,
        color: Rgb<u8>,
        opacity: f32,
    ) {
        let (font, overstrike) = self.face(bold, px);
        let scale = Scale::uniform(px);
        let passes = if overstrike > 0.0 { vec![0.0, overstrike] } else { vec![0.0] };
        for offset in passes {
            let mut caret = x + offset;
            let mut previous = None;
            for ch in text.chars() {
                let base = font.glyph(ch).scaled(scale);
                if let Some(prev) = previous {
                    caret += font.pair_kerning(scale, prev, base.id());
                }
                previous = Some(base.id());
                let advance = base.h_metrics().advance_width;
                let glyph = base.positioned(point(caret, baseline));
                if let Some(bb) = glyph.pixel_bounding_box() {
                    glyph.draw(|gx, gy, v| {
                        let cx = gx as i32 + bb.min.x;
                        let cy = gy as i32 + bb.min.y;
                        if cx < 0 || cy < 0 || v <= 0.0 {
                            return;
                        }
                        let (cx, cy) = (cx as u32, cy as u32);
                        if cx >= canvas.width() || cy >= canvas.height() {
                            return;
                        }
                        blend_pixel(canvas.get_pixel_mut(cx, cy), color, v * opacity);
                    });
                }
                caret += advance;
            }
        }
    }
}

// ============================================================================
// Font files
// ============================================================================

/// Font files for a family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFiles {
    pub regular: PathBuf,
    pub bold: Option<PathBuf>,
}

/// `"Playfair Display"` → `PlayfairDisplay`.
fn file_stem(family: &str) -> String {
    family.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Find the files for `family` in `dir`.
///
/// Tried in order: `<Stem>-Regular.{ttf,otf}`, `<Stem>.{ttf,otf}`. The bold
/// face is `<Stem>-Bold.{ttf,otf}` when present.
pub fn resolve_font_files(dir: &Path, family: &str) -> Result<FontFiles, FontError> {
    let stem = file_stem(family);
    let first_existing = |names: &[String]| {
        names
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    };
    let regular = first_existing(&[
        format!("{stem}-Regular.ttf"),
        format!("{stem}-Regular.otf"),
        format!("{stem}.ttf"),
        format!("{stem}.otf"),
    ])
    .ok_or_else(|| FontError::NotFound {
        family: family.to_string(),
        dir: dir.to_path_buf(),
    })?;
    let bold = first_existing(&[format!("{stem}-Bold.ttf"), format!("{stem}-Bold.otf")]);
    Ok(FontFiles { regular, bold })
}

fn read_font(path: &Path) -> Result<Font<'static>, FontError> {
    let data = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Font::try_from_vec(data).ok_or_else(|| FontError::Parse(path.to_path_buf()))
}

/// Load a painter synchronously.
pub fn load_painter(files: &FontFiles) -> Result<RusttypePainter, FontError> {
    let regular = read_font(&files.regular)?;
    let bold = files.bold.as_deref().map(read_font).transpose()?;
    Ok(RusttypePainter::new(regular, bold))
}

enum LoaderState {
    Waiting(Receiver<Result<RusttypePainter, FontError>>),
    Ready(RusttypePainter),
    Failed(String),
}

/// Loads fonts on a background thread; the first successful wait caches the
/// painter.
pub struct FontLoader {
    state: LoaderState,
}

impl FontLoader {
    pub fn spawn(files: FontFiles) -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            tracing::debug!(regular = %files.regular.display(), "loading fonts");
            // Receiver may be gone if the export was abandoned.
            let _ = tx.send(load_painter(&files));
        });
        Self {
            state: LoaderState::Waiting(rx),
        }
    }
}

impl FontSource for FontLoader {
    fn wait_ready(&mut self, timeout: Duration) -> Result<&dyn GlyphPainter, SyncError> {
        if let LoaderState::Waiting(rx) = &self.state {
            self.state = match rx.recv_timeout(timeout) {
                Ok(Ok(painter)) => LoaderState::Ready(painter),
                Ok(Err(e)) => LoaderState::Failed(e.to_string()),
                Err(RecvTimeoutError::Timeout) => return Err(SyncError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => {
                    LoaderState::Failed("font loader thread exited".to_string())
                }
            };
        }
        match &self.state {
            LoaderState::Ready(painter) => Ok(painter),
            LoaderState::Failed(message) => Err(SyncError::Failed(message.clone())),
            LoaderState::Waiting(_) => Err(SyncError::Timeout(timeout)),
        }
    }
}
