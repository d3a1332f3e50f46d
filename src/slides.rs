//! Slides and the carousel editing session.
//!
//! A [`Carousel`] is created in one batch from a generation result, then
//! mutated in place (text edits, single-image regeneration) until it is
//! exported or discarded.
//!
//! ## Background assignment
//!
//! ```text
//! slide 1          → Image   (cover image)
//! slide N (last)   → Image   (closing image)
//! even interior    → Dark    (slide_bg_dark)
//! odd interior     → Light   (slide_bg_light)
//! ```
//!
//! The [`BackgroundKind`] chosen here decides the text colour at render time.
//!
//! ## Deck files
//!
//! The CLI reads and writes carousels as JSON. Backgrounds use the same
//! string tokens a browser would: a `data:image/...;base64,` URI, a colour
//! token, or `"loading"`.
//!
//! ```json
//! { "slides": [
//!     { "id": 1, "text": "Title\nBody", "background": "data:image/jpeg;base64,/9j/..." },
//!     { "id": 2, "text": "Second", "background": "#000000", "kind": "dark" }
//! ] }
//! ```

use crate::settings::Colors;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Soft character limit of the slide text editor.
pub const MAX_SLIDE_CHARS: usize = 350;

/// Character count past which the editor starts warning.
pub const WARN_SLIDE_CHARS: usize = 300;

const LOADING_TOKEN: &str = "loading";
const DATA_URI_PREFIX: &str = "data:image/";

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Slide ids must be 1..={expected} in order, found {found} at position {position}")]
    NonContiguousIds {
        expected: usize,
        found: u32,
        position: usize,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid image data URI: {0}")]
pub struct InvalidDataUri(pub String);

/// What a slide is painted on.
#[derive(Clone, PartialEq, Eq)]
pub enum Background {
    /// An image is being (re)generated. Never valid for export.
    Pending,
    /// A colour token such as `#000000`.
    Color(String),
    /// Encoded image bytes (JPEG, PNG or WebP).
    Image(Vec<u8>),
}

impl Background {
    /// Parse a background token: `"loading"`, a data URI, or a colour.
    pub fn from_token(token: &str) -> Result<Self, InvalidDataUri> {
        if token == LOADING_TOKEN {
            return Ok(Self::Pending);
        }
        if token.starts_with(DATA_URI_PREFIX) {
            return decode_data_uri(token).map(Self::Image);
        }
        Ok(Self::Color(token.to_string()))
    }

    /// Inverse of [`Background::from_token`]. Images are written as JPEG data URIs.
    pub fn to_token(&self) -> String {
        match self {
            Self::Pending => LOADING_TOKEN.to_string(),
            Self::Color(c) => c.clone(),
            Self::Image(bytes) => format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)),
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Borrow as a terminal background, or `None` while pending.
    pub fn ready(&self) -> Option<ReadyBackground<'_>> {
        match self {
            Self::Pending => None,
            Self::Color(c) => Some(ReadyBackground::Color(c)),
            Self::Image(bytes) => Some(ReadyBackground::Image(bytes)),
        }
    }
}

impl fmt::Debug for Background {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("Pending"),
            Self::Color(c) => f.debug_tuple("Color").field(c).finish(),
            Self::Image(bytes) => write!(f, "Image({} bytes)", bytes.len()),
        }
    }
}

/// A background in a terminal state. The render pipeline only accepts these,
/// so a pending slide cannot reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyBackground<'a> {
    Color(&'a str),
    Image(&'a [u8]),
}

/// Decode the payload of a `data:image/<type>;base64,<payload>` URI.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, InvalidDataUri> {
    let invalid = |why: &str| InvalidDataUri(why.to_string());
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| invalid("missing data:image/ prefix"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing ',' separator"))?;
    if !meta.ends_with(";base64") {
        return Err(invalid("only base64 payloads are supported"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(&e.to_string()))
}

/// Colour scheme class of a slide background; selects the text colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    Light,
    Dark,
    Image,
}

impl BackgroundKind {
    /// Kind of the slide at 1-based `position` in a carousel of `total`.
    pub fn for_position(position: u32, total: u32) -> Self {
        if position == 1 || position == total {
            Self::Image
        } else if position % 2 == 0 {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// Derive a kind for an untagged background.
    ///
    /// Only an exact match with the configured dark token counts as dark;
    /// any other colour, including the accent, is treated as light.
    pub fn classify(background: &Background, colors: &Colors) -> Self {
        match background {
            Background::Image(_) => Self::Image,
            Background::Color(c) if *c == colors.slide_bg_dark => Self::Dark,
            _ => Self::Light,
        }
    }

    /// Whether text on this background uses the light text colour.
    pub fn wants_light_text(self) -> bool {
        matches!(self, Self::Dark | Self::Image)
    }
}

/// One unit of the carousel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slide {
    /// 1-based position.
    pub id: u32,
    pub text: String,
    pub background: Background,
    pub kind: BackgroundKind,
}

impl Slide {
    /// First line of the text.
    pub fn title(&self) -> &str {
        split_title(&self.text).0
    }

    /// Remaining lines, joined and trimmed. May be empty.
    pub fn description(&self) -> &str {
        split_title(&self.text).1
    }

    pub fn char_budget(&self) -> CharBudget {
        char_budget(&self.text)
    }
}

/// Split slide text into `(title, description)`.
pub fn split_title(text: &str) -> (&str, &str) {
    match text.split_once('\n') {
        Some((title, rest)) => (title, rest.trim()),
        None => (text, ""),
    }
}

/// Editor budget state for a slide text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharBudget {
    Ok(usize),
    Warning(usize),
    Over(usize),
}

pub fn char_budget(text: &str) -> CharBudget {
    let count = text.chars().count();
    if count > MAX_SLIDE_CHARS {
        CharBudget::Over(count)
    } else if count > WARN_SLIDE_CHARS {
        CharBudget::Warning(count)
    } else {
        CharBudget::Ok(count)
    }
}

/// The ordered slides of one carousel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Carousel {
    slides: Vec<Slide>,
}

impl Carousel {
    /// Build slides from generated texts and the two background images,
    /// applying the position-based background assignment.
    pub fn from_parts(texts: Vec<String>, first_image: Vec<u8>, last_image: Vec<u8>, colors: &Colors) -> Self {
        let total = texts.len() as u32;
        let slides = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let id = index as u32 + 1;
                let kind = BackgroundKind::for_position(id, total);
                let background = match kind {
                    BackgroundKind::Image if id == 1 => Background::Image(first_image.clone()),
                    BackgroundKind::Image => Background::Image(last_image.clone()),
                    BackgroundKind::Dark => Background::Color(colors.slide_bg_dark.clone()),
                    BackgroundKind::Light => Background::Color(colors.slide_bg_light.clone()),
                };
                Slide {
                    id,
                    text,
                    background,
                    kind,
                }
            })
            .collect();
        Self { slides }
    }

    /// Wrap already-built slides, checking ids are `1..=N` in order.
    pub fn from_slides(slides: Vec<Slide>) -> Result<Self, DeckError> {
        let expected = slides.len();
        for (position, slide) in slides.iter().enumerate() {
            if slide.id as usize != position + 1 {
                return Err(DeckError::NonContiguousIds {
                    expected,
                    found: slide.id,
                    position: position + 1,
                });
            }
        }
        Ok(Self { slides })
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Slide> {
        self.slides.iter().find(|s| s.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut Slide> {
        self.slides.iter_mut().find(|s| s.id == id)
    }

    /// Whether `id` is one of the two image-backed slides.
    pub fn is_image_slide(&self, id: u32) -> bool {
        id == 1 || id as usize == self.slides.len()
    }

    /// Replace a slide's text. Returns `false` if no slide has that id.
    pub fn update_text(&mut self, id: u32, text: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(slide) => {
                slide.text = text.into();
                true
            }
            None => false,
        }
    }

    /// Ids of slides still waiting for an image.
    pub fn pending_ids(&self) -> Vec<u32> {
        self.slides
            .iter()
            .filter(|s| s.background == Background::Pending)
            .map(|s| s.id)
            .collect()
    }

    /// Load a deck file, deriving missing kinds from `colors`.
    pub fn load(path: &Path, colors: &Colors) -> Result<Self, DeckError> {
        let content = std::fs::read_to_string(path)?;
        let deck: DeckFile = serde_json::from_str(&content)?;
        deck.into_carousel(colors)
    }

    /// Write the carousel as a deck file.
    pub fn save(&self, path: &Path) -> Result<(), DeckError> {
        let json = serde_json::to_string_pretty(&DeckFile::from(self))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// On-disk JSON form of a carousel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckFile {
    pub slides: Vec<DeckSlide>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeckSlide {
    pub id: u32,
    pub text: String,
    #[serde(with = "background_token")]
    pub background: Background,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BackgroundKind>,
}

impl DeckFile {
    pub fn into_carousel(self, colors: &Colors) -> Result<Carousel, DeckError> {
        let slides = self
            .slides
            .into_iter()
            .map(|s| {
                let kind = s
                    .kind
                    .unwrap_or_else(|| BackgroundKind::classify(&s.background, colors));
                Slide {
                    id: s.id,
                    text: s.text,
                    background: s.background,
                    kind,
                }
            })
            .collect();
        Carousel::from_slides(slides)
    }
}

impl From<&Carousel> for DeckFile {
    fn from(carousel: &Carousel) -> Self {
        Self {
            slides: carousel
                .slides
                .iter()
                .map(|s| DeckSlide {
                    id: s.id,
                    text: s.text.clone(),
                    background: s.background.clone(),
                    kind: Some(s.kind),
                })
                .collect(),
        }
    }
}

mod background_token {
    use super::Background;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bg: &Background, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&bg.to_token())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Background, D::Error> {
        let token = String::deserialize(d)?;
        Background::from_token(&token).map_err(serde::de::Error::custom)
    }
}
