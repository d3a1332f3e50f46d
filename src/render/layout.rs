//! Pure text layout for a slide.
//!
//! [`compute_text_layout`] reproduces the slide preview's box model in frame
//! pixels, so the preview and the export place text identically:
//!
//! ```text
//! ┌──────────── frame ─────────────┐
//! │ margin                          │
//! │   ┌──── content box ────────┐   │
//! │   │                         │   │  title and description stacked,
//! │   │  Title (bold)           │   │  centered vertically as a group
//! │   │  ── 12px gap ──         │   │
//! │   │  Description lines      │   │
//! │   │                         │   │
//! │   └─────────────────────────┘   │
//! └─────────────────────────────────┘
//! ```
//!
//! All preview quantities (font sizes, margin, the 12px gap) are multiplied by
//! [`Frame::scale`]. Lines wrap at whitespace; a word wider than the content box
//! breaks between characters. Whitespace inside a line is preserved and the
//! spaces at a soft break hang past the line end.
//!
//! Glyph measurement is abstracted behind [`TextMeasure`] so layout stays pure
//! and testable with fixed-advance fake fonts.

use super::markup::{Emphasis, parse_line};
use crate::ratio::Dimensions;
use crate::settings::{TextAlignment, VisualSettings};
use crate::slides::split_title;

/// Gap between title and description, in preview pixels.
pub const DESCRIPTION_GAP: f32 = 12.0;

/// Vertical font metrics at a given size. Both values are positive distances
/// from the baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

/// Font measurement needed for layout.
pub trait TextMeasure {
    /// Horizontal advance of `text` at `px`.
    fn advance(&self, text: &str, px: f32, bold: bool) -> f32;
    fn line_metrics(&self, px: f32) -> LineMetrics;
}

/// The render surface geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Frame pixels per preview pixel.
    pub scale: f32,
}

impl Frame {
    pub fn new(dims: Dimensions, preview_width: f32) -> Self {
        let scale = if preview_width > 0.0 {
            dims.width as f32 / preview_width
        } else {
            1.0
        };
        Self {
            width: dims.width,
            height: dims.height,
            scale,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Title,
    Description,
}

/// A styled fragment placed on a line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRun {
    pub text: String,
    /// Left edge in frame pixels.
    pub x: f32,
    pub width: f32,
    pub emphasis: Emphasis,
    pub bold: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaidLine {
    pub block: Block,
    pub px: f32,
    /// Baseline y in frame pixels.
    pub baseline: f32,
    /// Left edge of the visible line.
    pub x: f32,
    /// Width without hanging whitespace.
    pub width: f32,
    pub runs: Vec<PlacedRun>,
}

impl LaidLine {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextLayout {
    pub lines: Vec<LaidLine>,
    /// Top of the text group in frame pixels.
    pub top: f32,
    /// Height of the text group in frame pixels.
    pub height: f32,
}

impl TextLayout {
    pub fn lines_of(&self, block: Block) -> impl Iterator<Item = &LaidLine> {
        self.lines.iter().filter(move |l| l.block == block)
    }
}

/// One unbreakable piece during wrapping.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    emphasis: Emphasis,
    bold: bool,
    space: bool,
    width: f32,
}

#[derive(Default)]
struct Wrapped {
    tokens: Vec<Token>,
}

impl Wrapped {
    fn has_word(&self) -> bool {
        self.tokens.iter().any(|t| !t.space)
    }

    fn total_width(&self) -> f32 {
        self.tokens.iter().map(|t| t.width).sum()
    }

    fn visible_width(&self) -> f32 {
        let end = self
            .tokens
            .iter()
            .rposition(|t| !t.space)
            .map_or(0, |i| i + 1);
        self.tokens[..end].iter().map(|t| t.width).sum()
    }
}

fn tokenize<M: TextMeasure + ?Sized>(line: &str, block: Block, px: f32, measure: &M) -> Vec<Token> {
    let mut tokens = Vec::new();
    for run in parse_line(line) {
        let bold = block == Block::Title || run.emphasis.is_bold();
        let mut current = String::new();
        let mut current_space = false;
        for ch in run.text.chars() {
            let space = ch.is_whitespace();
            if !current.is_empty() && space != current_space {
                let text = std::mem::take(&mut current);
                let width = measure.advance(&text, px, bold);
                tokens.push(Token {
                    text,
                    emphasis: run.emphasis,
                    bold,
                    space: current_space,
                    width,
                });
            }
            current_space = space;
            current.push(ch);
        }
        if !current.is_empty() {
            let width = measure.advance(&current, px, bold);
            tokens.push(Token {
                text: current,
                emphasis: run.emphasis,
                bold,
                space: current_space,
                width,
            });
        }
    }
    tokens
}

/// Break a word wider than `max` between characters.
fn break_word<M: TextMeasure + ?Sized>(token: Token, max: f32, px: f32, measure: &M) -> Vec<Token> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in token.text.chars() {
        let mut candidate = current.clone();
        candidate.push(ch);
        if !current.is_empty() && measure.advance(&candidate, px, token.bold) > max {
            let width = measure.advance(&current, px, token.bold);
            pieces.push(Token {
                text: std::mem::take(&mut current),
                width,
                ..token.clone()
            });
            current.push(ch);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        let width = measure.advance(&current, px, token.bold);
        pieces.push(Token {
            text: current,
            width,
            ..token
        });
    }
    pieces
}

fn wrap_line<M: TextMeasure + ?Sized>(
    tokens: Vec<Token>,
    max: f32,
    px: f32,
    measure: &M,
) -> Vec<Wrapped> {
    let mut lines = Vec::new();
    let mut current = Wrapped::default();
    let mut soft_broken = false;

    for token in tokens {
        if token.space {
            // Spaces at a soft break hang on the previous line.
            if current.tokens.is_empty() && soft_broken {
                continue;
            }
            current.tokens.push(token);
            continue;
        }
        if current.has_word() && current.total_width() + token.width > max {
            lines.push(std::mem::take(&mut current));
            soft_broken = true;
        }
        if token.width > max && !current.has_word() {
            let mut pieces = break_word(token, max, px, measure).into_iter();
            if let Some(first) = pieces.next() {
                current.tokens.push(first);
            }
            for piece in pieces {
                lines.push(std::mem::take(&mut current));
                soft_broken = true;
                current.tokens.push(piece);
            }
            continue;
        }
        current.tokens.push(token);
    }
    lines.push(current);
    lines
}

/// Lay out a slide's text inside `frame`.
///
/// The first line of `text` is the title, the trimmed remainder the
/// description. An empty description produces no description lines and no
/// gap.
pub fn compute_text_layout<M: TextMeasure + ?Sized>(
    text: &str,
    visual: &VisualSettings,
    frame: Frame,
    measure: &M,
) -> TextLayout {
    let scale = frame.scale;
    let padding = visual.style.margin.max(0.0) * scale;
    let content_width = (frame.width as f32 - 2.0 * padding).max(1.0);
    let content_height = frame.height as f32 - 2.0 * padding;
    let spacing = visual.typography.line_spacing.max(0.0);

    let (title, description) = split_title(text);
    let mut blocks = vec![(Block::Title, title, visual.typography.title_font_size * scale)];
    if !description.is_empty() {
        blocks.push((
            Block::Description,
            description,
            visual.typography.description_font_size * scale,
        ));
    }

    // First pass: wrap and measure heights relative to the group top.
    struct PendingLine {
        block: Block,
        px: f32,
        top: f32,
        line_height: f32,
        wrapped: Wrapped,
    }
    let mut pending = Vec::new();
    let mut y = 0.0_f32;
    for (index, (block, source, px)) in blocks.into_iter().enumerate() {
        if index > 0 {
            y += DESCRIPTION_GAP * scale;
        }
        let line_height = spacing * px;
        for hard_line in source.split('\n') {
            let tokens = tokenize(hard_line, block, px, measure);
            for wrapped in wrap_line(tokens, content_width, px, measure) {
                pending.push(PendingLine {
                    block,
                    px,
                    top: y,
                    line_height,
                    wrapped,
                });
                y += line_height;
            }
        }
    }
    let group_height = y;
    let group_top = padding + (content_height - group_height) / 2.0;

    let lines = pending
        .into_iter()
        .map(|p| {
            let metrics = measure.line_metrics(p.px);
            let half_leading = (p.line_height - (metrics.ascent + metrics.descent)) / 2.0;
            let baseline = group_top + p.top + half_leading + metrics.ascent;
            let width = p.wrapped.visible_width();
            let x = match visual.style.text_alignment {
                TextAlignment::Left => padding,
                TextAlignment::Center => padding + (content_width - width) / 2.0,
                TextAlignment::Right => padding + content_width - width,
            };
            let mut cursor = x;
            let runs = p
                .wrapped
                .tokens
                .into_iter()
                .map(|t| {
                    let run = PlacedRun {
                        text: t.text,
                        x: cursor,
                        width: t.width,
                        emphasis: t.emphasis,
                        bold: t.bold,
                    };
                    cursor += t.width;
                    run
                })
                .collect();
            LaidLine {
                block: p.block,
                px: p.px,
                baseline,
                x,
                width,
                runs,
            }
        })
        .collect();

    TextLayout {
        lines,
        top: group_top,
        height: group_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FixedMeasure;

    fn frame(width: u32, height: u32) -> Frame {
        Frame {
            width,
            height,
            scale: 1.0,
        }
    }

    fn visual(margin: f32, alignment: TextAlignment) -> VisualSettings {
        let mut v = VisualSettings::default();
        v.style.margin = margin;
        v.style.text_alignment = alignment;
        v.typography.title_font_size = 20.0;
        v.typography.description_font_size = 10.0;
        v.typography.line_spacing = 1.5;
        v
    }

    fn texts(layout: &TextLayout, block: Block) -> Vec<String> {
        layout.lines_of(block).map(|l| l.text()).collect()
    }

    #[test]
    fn frame_scale_from_preview_width() {
        let f = Frame::new(Dimensions { width: 1080, height: 1350 }, 540.0);
        assert_eq!(f.scale, 2.0);
        assert_eq!(Frame::new(Dimensions { width: 10, height: 10 }, 0.0).scale, 1.0);
    }

    #[test]
    fn title_only_is_centered_vertically() {
        // FixedMeasure: advance = 0.5 * px per char, ascent 0.8 px, descent 0.2 px
        let layout = compute_text_layout("Hello", &visual(0.0, TextAlignment::Center), frame(200, 100), &FixedMeasure);
        assert_eq!(layout.lines.len(), 1);
        let line = &layout.lines[0];
        assert_eq!(line.width, 50.0);
        assert_eq!(line.x, 75.0);
        // line box 30 high, centered → top 35; half leading 5; ascent 16
        assert_eq!(layout.top, 35.0);
        assert_eq!(line.baseline, 56.0);
        assert!(line.runs.iter().all(|r| r.bold));
    }

    #[test]
    fn description_follows_gap() {
        let layout = compute_text_layout(
            "Title\n\nFirst\nSecond\n",
            &visual(0.0, TextAlignment::Left),
            frame(400, 400),
            &FixedMeasure,
        );
        assert_eq!(texts(&layout, Block::Title), vec!["Title"]);
        assert_eq!(texts(&layout, Block::Description), vec!["First", "Second"]);
        // 30 (title) + 12 (gap) + 2 * 15 (description)
        assert_eq!(layout.height, 72.0);
        let desc: Vec<&LaidLine> = layout.lines_of(Block::Description).collect();
        assert_eq!(desc[1].baseline - desc[0].baseline, 15.0);
        assert!(desc.iter().all(|l| l.x == 0.0));
        assert!(desc[0].runs.iter().all(|r| !r.bold));
    }

    #[test]
    fn wraps_at_whitespace_within_content_box() {
        // content width 100 - 2*10 = 80; 10px description → 5px per char → 16 chars
        let layout = compute_text_layout(
            "T\naaaa bbbb cccc dddd",
            &visual(10.0, TextAlignment::Left),
            frame(100, 400),
            &FixedMeasure,
        );
        assert_eq!(
            texts(&layout, Block::Description),
            vec!["aaaa bbbb cccc ", "dddd"]
        );
        let first = layout.lines_of(Block::Description).next().unwrap();
        assert_eq!(first.width, 70.0);
        assert_eq!(first.x, 10.0);
    }

    #[test]
    fn long_word_breaks_between_characters() {
        let layout = compute_text_layout(
            "T\nabcdefghijklmnopqrstuvwxyz",
            &visual(0.0, TextAlignment::Left),
            frame(50, 400),
            &FixedMeasure,
        );
        assert_eq!(
            texts(&layout, Block::Description),
            vec!["abcdefghij", "klmnopqrst", "uvwxyz"]
        );
    }

    #[test]
    fn preserves_inner_whitespace() {
        let layout = compute_text_layout(
            "T\na   b",
            &visual(0.0, TextAlignment::Left),
            frame(400, 400),
            &FixedMeasure,
        );
        assert_eq!(texts(&layout, Block::Description), vec!["a   b"]);
    }

    #[test]
    fn right_alignment_ends_at_content_edge() {
        let layout = compute_text_layout(
            "Hey\nyou",
            &visual(20.0, TextAlignment::Right),
            frame(300, 300),
            &FixedMeasure,
        );
        for line in &layout.lines {
            assert_eq!(line.x + line.width, 280.0);
        }
    }

    #[test]
    fn markup_becomes_runs() {
        let layout = compute_text_layout(
            "T\nkeep ++calm++ **now**",
            &visual(0.0, TextAlignment::Left),
            frame(400, 400),
            &FixedMeasure,
        );
        let line = layout.lines_of(Block::Description).next().unwrap();
        assert_eq!(line.text(), "keep calm now");
        let calm = line.runs.iter().find(|r| r.text == "calm").unwrap();
        assert_eq!(calm.emphasis, Emphasis::Highlight);
        assert!(calm.bold);
        assert_eq!(calm.x, 25.0);
        let now = line.runs.iter().find(|r| r.text == "now").unwrap();
        assert_eq!(now.emphasis, Emphasis::Bold);
    }

    #[test]
    fn scale_multiplies_sizes_and_margin() {
        let v = visual(10.0, TextAlignment::Left);
        let one = compute_text_layout("Hi\nthere", &v, frame(200, 200), &FixedMeasure);
        let two = compute_text_layout(
            "Hi\nthere",
            &v,
            Frame {
                width: 400,
                height: 400,
                scale: 2.0,
            },
            &FixedMeasure,
        );
        assert_eq!(two.height, one.height * 2.0);
        for (a, b) in one.lines.iter().zip(&two.lines) {
            assert_eq!(b.x, a.x * 2.0);
            assert_eq!(b.baseline, a.baseline * 2.0);
            assert_eq!(b.px, a.px * 2.0);
        }
    }

    #[test]
    fn empty_text_yields_single_empty_title_line() {
        let layout = compute_text_layout("", &visual(0.0, TextAlignment::Center), frame(100, 100), &FixedMeasure);
        assert_eq!(layout.lines.len(), 1);
        assert!(layout.lines[0].runs.is_empty());
    }
}
