//! Slide rendering.
//!
//! | Stage | Module |
//! |---|---|
//! | Inline markup (`++x++`, `**x**`) | [`markup`] |
//! | Text layout (pure) | [`layout`] |
//! | Glyph painting, font loading | [`text`] |
//! | Background + overlay + text | [`compose`] |
//!
//! The same path renders previews and export frames; only the frame size
//! differs.

pub mod compose;
pub mod layout;
pub mod markup;
pub mod text;

pub use compose::{RenderError, render_frame};
pub use layout::{Frame, LineMetrics, TextLayout, TextMeasure, compute_text_layout};
pub use markup::{Emphasis, Run, parse_line};
pub use text::{
    FontError, FontFiles, FontLoader, FontSource, GlyphPainter, Loaded, RusttypePainter,
    SyncError, load_painter, resolve_font_files,
};
