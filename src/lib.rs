//! # Carousel Export
//!
//! Turns an article into a social-media carousel and exports it as one JPEG
//! per slide, bundled in a zip.
//!
//! # Architecture: Generate, Edit, Export
//!
//! ```text
//! 1. Generate  article  →  Carousel        (provider text + two images)
//! 2. Edit      Carousel →  Carousel        (text edits, image regeneration)
//! 3. Export    Carousel →  carousel.zip    (slide-1.jpeg … slide-N.jpeg)
//! ```
//!
//! The provider itself sits behind the [`generation::GenerationOrchestrator`]
//! trait. Everything on this side of it is deterministic: the same deck and
//! settings always render the same pixels, in the preview and in the export.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`ratio`] | Aspect-ratio parsing, provider reconciliation, export dimensions |
//! | [`imaging`] | Decode, cover crop, JPEG encode, colour tokens |
//! | [`settings`] | Generation and visual settings with their defaults |
//! | [`slides`] | Slides, background assignment, the carousel session, deck files |
//! | [`generation`] | Orchestrator trait, prompt assembly, regeneration with rollback |
//! | [`render`] | Inline markup, text layout, glyph painting, frame composition |
//! | [`export`] | The export run: per-slide render, progress, cancellation, zip |
//! | [`config`] | `carousel.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Render Path
//!
//! Previews and export frames go through the same [`render::render_frame`].
//! The export frame is the preview scaled by `base_width / preview_width`, so
//! margins, font sizes and shadows keep their proportions at any width.
//!
//! ## Ratio Reconciliation Up Front
//!
//! Users may ask for any `W:H`. Each provider supports only a few ratios, so
//! the requested one is resolved once with [`ratio::ApiProvider::effective_ratio`]
//! and everything downstream uses the result. OpenAI's 4:5 is the exception:
//! it is produced as a square image and center-cropped.
//!
//! ## Typed Pending State
//!
//! A slide whose image is being regenerated carries
//! [`slides::Background::Pending`]. The renderer only accepts
//! [`slides::ReadyBackground`], so a half-loaded slide cannot be exported.

pub mod config;
pub mod export;
pub mod generation;
pub mod imaging;
pub mod output;
pub mod ratio;
pub mod render;
pub mod settings;
pub mod slides;

#[cfg(test)]
pub(crate) mod test_helpers;
