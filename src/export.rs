//! Carousel export: every slide rendered to JPEG and packed into one zip.
//!
//! ## Run states
//!
//! ```text
//! Idle → Preparing → RenderingSlide(1) → … → RenderingSlide(N) → Archiving → Done
//!            │               │                                      │
//!            └───────────────┴──────────────→ Failed ←──────────────┘
//!                            └──────────────→ Cancelled
//! ```
//!
//! ## Per-slide stages
//!
//! Slides are processed one at a time in ascending id order. Each goes through:
//!
//! | Stage | Work |
//! |---|---|
//! | **Select** | move the selection to the slide, activate it on the render surface |
//! | **Sync** | wait for fonts (bounded by `sync_timeout`) |
//! | **Composite** | cover-fit image + overlay, or colour fill |
//! | **Text** | lay out and draw title and description |
//! | **Rasterize** | JPEG encode at the configured quality |
//! | **Append** | add `slide-{id}.jpeg` to the archive |
//!
//! The first failure aborts the run and no archive is produced. Pending
//! backgrounds are rejected while preparing, before anything is drawn. The
//! selection held before the run is restored on every exit path.

use crate::imaging::{ImagingError, InvalidColor, Quality, encode_jpeg};
use crate::ratio::{DEFAULT_BASE_WIDTH, Dimensions, export_dimensions};
use crate::render::compose::{composite_background, draw_text};
use crate::render::{
    Frame, FontSource, GlyphPainter, RenderError, SyncError, compute_text_layout, render_frame,
};
use crate::settings::VisualSettings;
use crate::slides::{BackgroundKind, ReadyBackground, Slide};
use image::RgbImage;
use std::cell::Cell;
use std::fmt;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;
use zip::write::SimpleFileOptions;

pub const DEFAULT_ARCHIVE_NAME: &str = "carousel.zip";

/// Reference width the preview is laid out at.
pub const DEFAULT_PREVIEW_WIDTH: f32 = 540.0;

pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Slide {0} is still generating its image")]
    PendingBackground(u32),
    #[error("Slide id {0} appears more than once")]
    DuplicateSlide(u32),
    #[error("Nothing to export: the carousel has no slides")]
    EmptyDeck,
    #[error("Slide {id}: {source}")]
    Decode { id: u32, source: ImagingError },
    #[error("Slide {id}: {message}")]
    RenderSync { id: u32, message: String },
    #[error("Slide {id}: fonts not ready after {timeout:?}")]
    Timeout { id: u32, timeout: Duration },
    #[error("Slide {id}: {field}: {source}")]
    InvalidColor {
        id: u32,
        field: &'static str,
        source: InvalidColor,
    },
    #[error("Slide {id}: {source}")]
    Encode { id: u32, source: ImagingError },
    #[error("Failed to write archive: {0}")]
    Archive(String),
    #[error("Export cancelled")]
    Cancelled,
}

impl ExportError {
    fn from_render(id: u32, e: RenderError) -> Self {
        match e {
            RenderError::Decode(source) => Self::Decode { id, source },
            RenderError::Color { field, source } => Self::InvalidColor { id, field, source },
        }
    }

    fn from_sync(id: u32, e: SyncError) -> Self {
        match e {
            SyncError::Timeout(timeout) => Self::Timeout { id, timeout },
            SyncError::Failed(message) => Self::RenderSync { id, message },
        }
    }
}

impl From<zip::result::ZipError> for ExportError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Archive(e.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        Self::Archive(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Preparing,
    /// 1-based position in the run, not the slide id.
    RenderingSlide(usize),
    Archiving,
    Done,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Select,
    Sync,
    Composite,
    Text,
    Rasterize,
    Append,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Select => "select",
            Self::Sync => "sync",
            Self::Composite => "composite",
            Self::Text => "text",
            Self::Rasterize => "rasterize",
            Self::Append => "append",
        };
        f.write_str(s)
    }
}

/// Progress report sent to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEvent {
    /// 1-based slide position. `Failed` and `Cancelled` carry the last one reached.
    pub current: usize,
    pub total: usize,
    pub state: ExportState,
    pub stage: Option<ExportStage>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    pub base_width: u32,
    pub preview_width: f32,
    pub quality: Quality,
    pub sync_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            base_width: DEFAULT_BASE_WIDTH,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            quality: Quality::default(),
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }
}

/// Cooperative cancellation flag, checked between stages.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The currently selected slide of whatever is showing the carousel.
pub trait Selection {
    fn selected(&self) -> Option<u32>;
    fn select(&mut self, id: Option<u32>);
}

/// A bare selection with no UI behind it.
impl Selection for Option<u32> {
    fn selected(&self) -> Option<u32> {
        *self
    }

    fn select(&mut self, id: Option<u32>) {
        *self = id;
    }
}

/// Restores the original selection when dropped.
struct SelectionGuard<'a> {
    selection: &'a mut dyn Selection,
    saved: Option<u32>,
}

impl<'a> SelectionGuard<'a> {
    fn acquire(selection: &'a mut dyn Selection) -> Self {
        let saved = selection.selected();
        Self { selection, saved }
    }

    fn select(&mut self, id: u32) {
        self.selection.select(Some(id));
    }
}

impl Drop for SelectionGuard<'_> {
    fn drop(&mut self) {
        self.selection.select(self.saved);
    }
}

/// Collaborators of an export run.
pub struct ExportHooks<'a> {
    pub fonts: &'a mut dyn FontSource,
    pub selection: &'a mut dyn Selection,
    pub cancel: CancelToken,
    pub progress: Option<Sender<ExportEvent>>,
}

impl<'a> ExportHooks<'a> {
    pub fn new(fonts: &'a mut dyn FontSource, selection: &'a mut dyn Selection) -> Self {
        Self {
            fonts,
            selection,
            cancel: CancelToken::default(),
            progress: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: Sender<ExportEvent>) -> Self {
        self.progress = Some(progress);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub slide_id: u32,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct ExportOutcome {
    /// The finished zip.
    pub archive: Vec<u8>,
    pub entries: Vec<ArchiveEntry>,
    pub dimensions: Dimensions,
}

pub fn entry_name(slide_id: u32) -> String {
    format!("slide-{slide_id}.jpeg")
}

/// A slide that passed preparation.
struct Prepared<'a> {
    id: u32,
    text: &'a str,
    background: ReadyBackground<'a>,
    kind: BackgroundKind,
}

/// Sort by id, reject duplicates and pending backgrounds.
fn prepare(slides: &[Slide]) -> Result<Vec<Prepared<'_>>, ExportError> {
    if slides.is_empty() {
        return Err(ExportError::EmptyDeck);
    }
    let mut ordered: Vec<&Slide> = slides.iter().collect();
    ordered.sort_by_key(|s| s.id);
    if let Some(pair) = ordered.windows(2).find(|w| w[0].id == w[1].id) {
        return Err(ExportError::DuplicateSlide(pair[0].id));
    }
    ordered
        .into_iter()
        .map(|slide| {
            let background = slide
                .background
                .ready()
                .ok_or(ExportError::PendingBackground(slide.id))?;
            Ok(Prepared {
                id: slide.id,
                text: &slide.text,
                background,
                kind: slide.kind,
            })
        })
        .collect()
}

/// The frame-sized canvas slides are drawn on, owned by one run.
struct RenderSurface {
    frame: Frame,
    active: Option<u32>,
    canvas: RgbImage,
}

impl RenderSurface {
    fn new(frame: Frame) -> Self {
        Self {
            frame,
            active: None,
            canvas: RgbImage::new(frame.width, frame.height),
        }
    }

    fn activate(&mut self, id: u32) {
        self.active = Some(id);
    }
}

struct Reporter {
    progress: Option<Sender<ExportEvent>>,
    total: usize,
    /// 1-based index of the last slide whose rendering started.
    reached: Cell<usize>,
}

impl Reporter {
    fn send(&self, current: usize, state: ExportState, stage: Option<ExportStage>, message: String) {
        if let ExportState::RenderingSlide(n) = state {
            self.reached.set(n);
        }
        tracing::debug!(current, total = self.total, ?state, ?stage, "export progress");
        if let Some(tx) = &self.progress {
            // A dropped receiver only means nobody is listening.
            let _ = tx.send(ExportEvent {
                current,
                total: self.total,
                state,
                stage,
                message,
            });
        }
    }
}

/// Render every slide and pack the frames into a zip archive.
///
/// `aspect_ratio` is the effective ratio the slides were generated for.
#[tracing::instrument(skip_all, fields(slides = slides.len(), ratio = aspect_ratio))]
pub fn export(
    slides: &[Slide],
    visual: &VisualSettings,
    aspect_ratio: &str,
    options: &ExportOptions,
    hooks: ExportHooks<'_>,
) -> Result<ExportOutcome, ExportError> {
    let reporter = Reporter {
        progress: hooks.progress,
        total: slides.len(),
        reached: Cell::new(0),
    };
    let cancel = hooks.cancel;
    let fonts = hooks.fonts;
    let mut selection = SelectionGuard::acquire(hooks.selection);

    reporter.send(0, ExportState::Preparing, None, "Starting export...".to_string());
    let result = run(
        slides,
        visual,
        aspect_ratio,
        options,
        fonts,
        &mut selection,
        &cancel,
        &reporter,
    );
    match &result {
        Ok(outcome) => {
            tracing::info!(entries = outcome.entries.len(), bytes = outcome.archive.len(), "export finished");
            reporter.send(
                outcome.entries.len(),
                ExportState::Done,
                None,
                "Carousel exported".to_string(),
            );
        }
        Err(ExportError::Cancelled) => {
            tracing::info!(reached = reporter.reached.get(), "export cancelled");
            reporter.send(
                reporter.reached.get(),
                ExportState::Cancelled,
                None,
                "Export cancelled".to_string(),
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, reached = reporter.reached.get(), "export failed");
            reporter.send(reporter.reached.get(), ExportState::Failed, None, e.to_string());
        }
    }
    result
}

#[allow(clippy::too_many_arguments)]
fn run(
    slides: &[Slide],
    visual: &VisualSettings,
    aspect_ratio: &str,
    options: &ExportOptions,
    fonts: &mut dyn FontSource,
    selection: &mut SelectionGuard<'_>,
    cancel: &CancelToken,
    reporter: &Reporter,
) -> Result<ExportOutcome, ExportError> {
    let prepared = prepare(slides)?;
    let total = prepared.len();
    let dimensions = export_dimensions(aspect_ratio, options.base_width);
    let mut surface = RenderSurface::new(Frame::new(dimensions, options.preview_width));
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let file_options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut entries = Vec::with_capacity(total);

    let checkpoint = || {
        if cancel.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    };

    for (index, slide) in prepared.iter().enumerate() {
        let current = index + 1;
        let id = slide.id;
        let state = ExportState::RenderingSlide(current);
        let stage = |stage: ExportStage| {
            reporter.send(
                current,
                state,
                Some(stage),
                format!("Rendering slide {current} of {total}..."),
            );
        };

        checkpoint()?;
        stage(ExportStage::Select);
        selection.select(id);
        surface.activate(id);

        checkpoint()?;
        stage(ExportStage::Sync);
        let painter: &dyn GlyphPainter = fonts
            .wait_ready(options.sync_timeout)
            .map_err(|e| ExportError::from_sync(id, e))?;

        checkpoint()?;
        stage(ExportStage::Composite);
        surface.canvas = composite_background(slide.background, visual, surface.frame)
            .map_err(|e| ExportError::from_render(id, e))?;

        stage(ExportStage::Text);
        let layout = compute_text_layout(slide.text, visual, surface.frame, painter);
        draw_text(&mut surface.canvas, &layout, painter, visual, slide.kind, surface.frame)
            .map_err(|e| ExportError::from_render(id, e))?;

        checkpoint()?;
        stage(ExportStage::Rasterize);
        let jpeg = encode_jpeg(&surface.canvas, options.quality)
            .map_err(|source| ExportError::Encode { id, source })?;

        stage(ExportStage::Append);
        let name = entry_name(id);
        writer.start_file(name.as_str(), file_options)?;
        writer.write_all(&jpeg)?;
        tracing::debug!(slide_id = id, active = ?surface.active, bytes = jpeg.len(), "slide appended");
        entries.push(ArchiveEntry {
            name,
            slide_id: id,
            bytes: jpeg.len(),
        });
    }

    checkpoint()?;
    reporter.send(total, ExportState::Archiving, None, "Compressing files...".to_string());
    let archive = writer.finish()?.into_inner();
    Ok(ExportOutcome {
        archive,
        entries,
        dimensions,
    })
}

/// Render one slide the way the export would, for previews.
pub fn render_slide(
    slide: &Slide,
    visual: &VisualSettings,
    frame: Frame,
    painter: &dyn GlyphPainter,
) -> Result<RgbImage, ExportError> {
    let background = slide
        .background
        .ready()
        .ok_or(ExportError::PendingBackground(slide.id))?;
    render_frame(&slide.text, background, slide.kind, visual, frame, painter)
        .map_err(|e| ExportError::from_render(slide.id, e))
}
