//! Aspect-ratio reconciliation.
//!
//! The two image providers expose different (partly disjoint) ratio sets, but
//! the settings let the user request any `"W:H"` string. Every render and
//! export path runs the requested ratio through [`ApiProvider::effective_ratio`]
//! before computing pixels.
//!
//! All functions here are pure and testable without any I/O or images.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Default export width in pixels.
pub const DEFAULT_BASE_WIDTH: u32 = 1080;

/// Ratios the Gemini image model accepts directly.
pub const GEMINI_SUPPORTED_RATIOS: &[&str] = &["1:1", "9:16", "16:9", "4:3", "3:4", "4:5"];

/// Ratios DALL-E accepts directly (as pixel sizes, see [`openai_image_size`]).
pub const OPENAI_SUPPORTED_RATIOS: &[&str] = &["1:1", "16:9", "9:16"];

/// The ratio OpenAI cannot produce natively but which is reached by cropping a
/// square image.
pub const OPENAI_CROPPED_RATIO: &str = "4:5";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid aspect ratio {0:?}: expected \"W:H\" with a non-zero height")]
pub struct InvalidRatio(pub String);

/// Strictly parse a `"W:H"` ratio.
///
/// Used by config validation, where a typo should be reported. Rendering code
/// goes through the lenient [`parse_ratio`] instead.
pub fn parse_ratio_strict(ratio: &str) -> Result<f64, InvalidRatio> {
    let invalid = || InvalidRatio(ratio.to_string());
    let mut parts = ratio.split(':');
    let (Some(w), Some(h), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let w: f64 = w.trim().parse().map_err(|_| invalid())?;
    let h: f64 = h.trim().parse().map_err(|_| invalid())?;
    if h == 0.0 {
        return Err(invalid());
    }
    let value = w / h;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid());
    }
    Ok(value)
}

/// Parse a `"W:H"` ratio into `W / H`.
///
/// Malformed input (wrong arity, non-numeric parts, zero height) yields `1.0`.
/// The result is always finite and positive.
///
/// ```
/// # use carousel_export::ratio::parse_ratio;
/// assert_eq!(parse_ratio("16:9"), 16.0 / 9.0);
/// assert_eq!(parse_ratio("banana"), 1.0);
/// ```
pub fn parse_ratio(ratio: &str) -> f64 {
    parse_ratio_strict(ratio).unwrap_or(1.0)
}

/// Pick the member of `supported` numerically closest to `target`.
///
/// - empty `target` → first supported entry
/// - `target` already supported → returned as-is (no float round trip)
/// - otherwise the minimum `|target - candidate|`; ties keep the earlier entry
///
/// `supported` must not be empty.
pub fn find_closest_supported_ratio<'a>(target: &str, supported: &[&'a str]) -> &'a str {
    if target.trim().is_empty() {
        return supported[0];
    }
    if let Some(exact) = supported.iter().copied().find(|s| *s == target) {
        return exact;
    }

    let target_value = parse_ratio(target);
    let mut closest = supported[0];
    let mut min_diff = f64::INFINITY;
    for &candidate in supported {
        let diff = (target_value - parse_ratio(candidate)).abs();
        if diff < min_diff {
            min_diff = diff;
            closest = candidate;
        }
    }
    closest
}

/// Pixel dimensions of an export frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Export frame size for `ratio` at a fixed `base_width`.
///
/// Width is always `base_width`; height is `round(base_width / ratio)`.
/// A square ratio short-circuits to `base_width × base_width`.
pub fn export_dimensions(ratio: &str, base_width: u32) -> Dimensions {
    let value = parse_ratio(ratio);
    if value == 1.0 {
        return Dimensions {
            width: base_width,
            height: base_width,
        };
    }
    let height = (base_width as f64 / value).round().max(1.0) as u32;
    Dimensions {
        width: base_width,
        height,
    }
}

/// The generative provider backing text and image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    Gemini,
    #[serde(rename = "openai")]
    #[value(name = "openai")]
    OpenAi,
}

impl ApiProvider {
    pub fn supported_ratios(self) -> &'static [&'static str] {
        match self {
            Self::Gemini => GEMINI_SUPPORTED_RATIOS,
            Self::OpenAi => OPENAI_SUPPORTED_RATIOS,
        }
    }

    /// Human-readable provider name for messages.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gemini => "Google Gemini",
            Self::OpenAi => "OpenAI",
        }
    }

    /// The ratio that will actually be rendered for a `requested` ratio.
    ///
    /// OpenAI has no 4:5 size, but a square image cropped to 4:5 is used
    /// instead, so that request is honoured verbatim.
    pub fn effective_ratio(self, requested: &str) -> &'static str {
        if self == Self::OpenAi && requested == OPENAI_CROPPED_RATIO {
            return OPENAI_CROPPED_RATIO;
        }
        find_closest_supported_ratio(requested, self.supported_ratios())
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        })
    }
}

/// DALL-E pixel size for a supported ratio. Anything else maps to square.
pub fn openai_image_size(ratio: &str) -> &'static str {
    match ratio {
        "16:9" => "1792x1024",
        "9:16" => "1024x1792",
        _ => "1024x1024",
    }
}
