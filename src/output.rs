//! CLI output formatting for every command.
//!
//! # Slide Display Contract
//!
//! Slides are shown by position and title, with details on indented context
//! lines, the same way in every command:
//!
//! 1. **Header line**: 3-digit position + title
//! 2. **Context lines**: indented `Background:`, `Text:`, entry sizes, etc.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Slides (5)
//! 001 Stop guessing
//!     Background: image, 41 KB
//!     Text: 182 chars
//! 002 The real cost
//!     Background: dark #000000
//!     Text: 312 chars (long)
//!
//! Ratio
//!     Requested: 4:5 (openai)
//!     Export: 4:5 → 1080x1350
//! ```
//!
//! ## Export
//!
//! ```text
//! 001/005 Rendering slide 1 of 5...
//! ...
//! Compressing files...
//!     slide-1.jpeg  212 KB
//!     ...
//! Wrote carousel.zip (5 slides, 1080x1350, 1.1 MB)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::config::AppConfig;
use crate::export::{ExportEvent, ExportOutcome, ExportStage, ExportState};
use crate::ratio::{
    ApiProvider, Dimensions, OPENAI_CROPPED_RATIO, export_dimensions, openai_image_size, parse_ratio,
};
use crate::render::markup::strip_markup;
use crate::slides::{Background, BackgroundKind, Carousel, CharBudget, Slide};
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

/// Human-readable byte size: `512 B`, `41 KB`, `1.1 MB`.
fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Slide header: position + title without markup.
///
/// ```text
/// 001 Stop guessing
/// 003 (untitled)
/// ```
fn slide_header(position: usize, slide: &Slide) -> String {
    let title = strip_markup(slide.title().trim());
    if title.is_empty() {
        format!("{} (untitled)", format_index(position))
    } else {
        format!("{} {}", format_index(position), truncate(&title, 60))
    }
}

fn background_label(slide: &Slide) -> String {
    match (&slide.background, slide.kind) {
        (Background::Pending, _) => "loading".to_string(),
        (Background::Image(bytes), _) => format!("image, {}", format_size(bytes.len())),
        (Background::Color(token), BackgroundKind::Dark) => format!("dark {token}"),
        (Background::Color(token), _) => format!("light {token}"),
    }
}

fn budget_label(budget: CharBudget) -> String {
    match budget {
        CharBudget::Ok(n) => format!("{n} chars"),
        CharBudget::Warning(n) => format!("{n} chars (long)"),
        CharBudget::Over(n) => format!("{n} chars (over limit)"),
    }
}

// ============================================================================
// check
// ============================================================================

/// Format the deck inventory plus the ratio that will be exported.
pub fn format_check_output(carousel: &Carousel, config: &AppConfig) -> Vec<String> {
    let mut lines = vec![format!("Slides ({})", carousel.len())];
    for (i, slide) in carousel.slides().iter().enumerate() {
        lines.push(slide_header(i + 1, slide));
        lines.push(format!("{}Background: {}", indent(1), background_label(slide)));
        lines.push(format!("{}Text: {}", indent(1), budget_label(slide.char_budget())));
    }

    let generation = &config.generation;
    let effective = generation.effective_ratio();
    lines.push(String::new());
    lines.push("Ratio".to_string());
    lines.push(format!(
        "{}Requested: {} ({})",
        indent(1),
        generation.aspect_ratio,
        generation.api_provider
    ));
    lines.push(format!(
        "{}Export: {} → {}",
        indent(1),
        effective,
        export_dimensions(effective, config.export.base_width)
    ));

    let pending = carousel.pending_ids();
    if !pending.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for id in pending {
            lines.push(format!("{}Slide {id} is still generating its image", indent(1)));
        }
    }
    lines
}

pub fn print_check_output(carousel: &Carousel, config: &AppConfig) {
    for line in format_check_output(carousel, config) {
        println!("{}", line);
    }
}

// ============================================================================
// export
// ============================================================================

/// Format one progress event. Only slide starts and run-level transitions
/// produce output; the per-stage events are left to the debug log.
pub fn format_export_event(event: &ExportEvent) -> Vec<String> {
    match (event.state, event.stage) {
        (ExportState::RenderingSlide(_), Some(ExportStage::Select)) => vec![format!(
            "{}/{} {}",
            format_index(event.current),
            format_index(event.total),
            event.message
        )],
        (ExportState::RenderingSlide(_), _) => Vec::new(),
        (ExportState::Failed, _) => vec![format!("Export failed: {}", event.message)],
        (ExportState::Idle, _) => Vec::new(),
        (ExportState::Preparing | ExportState::Archiving | ExportState::Done | ExportState::Cancelled, _) => {
            vec![event.message.clone()]
        }
    }
}

/// Format the entries and the final summary of a finished export.
pub fn format_export_summary(outcome: &ExportOutcome, archive_path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = outcome
        .entries
        .iter()
        .map(|e| format!("{}{}  {}", indent(1), e.name, format_size(e.bytes)))
        .collect();
    lines.push(format!(
        "Wrote {} ({} slides, {}, {})",
        archive_path.display(),
        outcome.entries.len(),
        outcome.dimensions,
        format_size(outcome.archive.len())
    ));
    lines
}

pub fn print_export_summary(outcome: &ExportOutcome, archive_path: &Path) {
    for line in format_export_summary(outcome, archive_path) {
        println!("{}", line);
    }
}

// ============================================================================
// ratio
// ============================================================================

/// Explain how a requested ratio resolves for a provider.
pub fn format_ratio_report(requested: &str, provider: ApiProvider, base_width: u32) -> Vec<String> {
    let supported = provider.supported_ratios();
    let effective = provider.effective_ratio(requested);
    let mut lines = vec![
        format!("Requested: {} ({:.4})", requested, parse_ratio(requested)),
        format!("Provider: {}", provider.display_name()),
        format!("{}Supported: {}", indent(1), supported.join(", ")),
    ];
    if provider == ApiProvider::OpenAi && effective == OPENAI_CROPPED_RATIO {
        lines.push(format!("{}Effective: {} (square + crop)", indent(1), effective));
    } else {
        lines.push(format!("{}Effective: {}", indent(1), effective));
    }
    if provider == ApiProvider::OpenAi {
        lines.push(format!("{}Image size: {}", indent(1), openai_image_size(effective)));
    }
    lines.push(format!("Export: {}", export_dimensions(effective, base_width)));
    lines
}

pub fn print_ratio_report(requested: &str, provider: ApiProvider, base_width: u32) {
    for line in format_ratio_report(requested, provider, base_width) {
        println!("{}", line);
    }
}

// ============================================================================
// crop / preview
// ============================================================================

/// One-line report for a file written from an image operation.
///
/// ```text
/// cover.png (1024x1024) → cover-4x5.jpeg (819x1024, 96 KB)
/// ```
pub fn format_image_written(
    source: &Path,
    source_dims: Dimensions,
    output: &Path,
    output_dims: Dimensions,
    bytes: usize,
) -> String {
    format!(
        "{} ({}) → {} ({}, {})",
        source.display(),
        source_dims,
        output.display(),
        output_dims,
        format_size(bytes)
    )
}

/// One-line report for a rendered preview.
///
/// ```text
/// Wrote preview.png (540x675, 212 KB)
/// ```
pub fn format_file_written(path: &Path, dims: Dimensions, bytes: usize) -> String {
    format!("Wrote {} ({}, {})", path.display(), dims, format_size(bytes))
}
