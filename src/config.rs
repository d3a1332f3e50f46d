//! Application configuration.
//!
//! Handles loading, validating, and merging `carousel.toml`. Stock defaults
//! are overridden by the user's file; only the keys present in the file
//! change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [generation]
//! api_provider = "openai"          # "openai" or "gemini"
//! text_model = "gpt-4.1-mini-2025-04-14"
//! image_model = "dall-e-3"
//! aspect_ratio = "4:5"             # requested; reconciled per provider
//! # slide_prompt / image_prompt: long templates, see `carousel gen-config`
//!
//! [visual.typography]
//! font_family = "Inter, sans-serif"
//! title_font_size = 32.0           # preview pixels
//! description_font_size = 18.0
//! line_spacing = 1.5
//!
//! [visual.colors]
//! text_light = "#FFFFFF"
//! text_dark = "#000000"
//! highlight = "#F97316"
//! slide_bg_light = "#FFFFFF"
//! slide_bg_dark = "#000000"
//! slide_bg_accent = "#F3F4F6"
//! overlay_color = "#000000"
//!
//! [visual.style]
//! text_alignment = "center"        # left, center, right
//! margin = 60.0
//! overlay_opacity = 0.3
//!
//! [export]
//! base_width = 1080
//! quality = 95
//! preview_width = 540.0
//! sync_timeout_ms = 10000
//! font_dir = "fonts"
//! archive_name = "carousel.zip"
//! ```
//!
//! ## Provider Models
//!
//! Switching `api_provider` without naming models selects that provider's
//! default models, so this is enough to move to Gemini:
//!
//! ```toml
//! [generation]
//! api_provider = "gemini"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::export::{DEFAULT_ARCHIVE_NAME, DEFAULT_PREVIEW_WIDTH, DEFAULT_SYNC_TIMEOUT, ExportOptions};
use crate::imaging::{Quality, parse_hex_color};
use crate::ratio::{DEFAULT_BASE_WIDTH, parse_ratio_strict};
use crate::settings::{GenerationSettings, VisualSettings, default_models};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "carousel.toml";

/// Upper bound for `export.base_width`.
const MAX_BASE_WIDTH: u32 = 8192;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `carousel.toml`.
///
/// All fields have defaults. User files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Provider, models, requested ratio, prompt templates.
    pub generation: GenerationSettings,
    /// Typography, colours, layout style.
    pub visual: VisualSettings,
    /// Archive and rasterization settings.
    pub export: ExportConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Width of exported slides in pixels; height follows the ratio.
    pub base_width: u32,
    /// JPEG quality (1-100).
    pub quality: Quality,
    /// Width the preview is designed at; export scales by `base_width / preview_width`.
    pub preview_width: f32,
    /// How long to wait for fonts before failing a slide.
    pub sync_timeout_ms: u64,
    /// Directory holding `<Family>-Regular.ttf` (and optionally `-Bold.ttf`).
    pub font_dir: PathBuf,
    /// File name of the written archive.
    pub archive_name: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_width: DEFAULT_BASE_WIDTH,
            quality: Quality::default(),
            preview_width: DEFAULT_PREVIEW_WIDTH,
            sync_timeout_ms: DEFAULT_SYNC_TIMEOUT.as_millis() as u64,
            font_dir: PathBuf::from("fonts"),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }
}

impl ExportConfig {
    pub fn options(&self) -> ExportOptions {
        ExportOptions {
            base_width: self.base_width,
            preview_width: self.preview_width,
            quality: self.quality,
            sync_timeout: Duration::from_millis(self.sync_timeout_ms),
        }
    }
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Validation(msg));

        if let Err(e) = parse_ratio_strict(&self.generation.aspect_ratio) {
            return invalid(format!("generation.aspect_ratio: {e}"));
        }
        if self.generation.text_model.trim().is_empty() || self.generation.image_model.trim().is_empty() {
            return invalid("generation models must not be empty".into());
        }

        let typography = &self.visual.typography;
        if typography.title_font_size <= 0.0 || typography.description_font_size <= 0.0 {
            return invalid("visual.typography font sizes must be positive".into());
        }
        if typography.line_spacing <= 0.0 {
            return invalid("visual.typography.line_spacing must be positive".into());
        }
        if typography.primary_family().is_empty() {
            return invalid("visual.typography.font_family must name a family".into());
        }
        for (key, token) in self.visual.colors.entries() {
            if let Err(e) = parse_hex_color(token) {
                return invalid(format!("visual.colors.{key}: {e}"));
            }
        }
        let style = &self.visual.style;
        if style.margin < 0.0 {
            return invalid("visual.style.margin must not be negative".into());
        }
        if !(0.0..=1.0).contains(&style.overlay_opacity) {
            return invalid("visual.style.overlay_opacity must be 0.0-1.0".into());
        }

        let export = &self.export;
        if export.base_width == 0 || export.base_width > MAX_BASE_WIDTH {
            return invalid(format!("export.base_width must be 1-{MAX_BASE_WIDTH}"));
        }
        if export.preview_width <= 0.0 {
            return invalid("export.preview_width must be positive".into());
        }
        if export.sync_timeout_ms == 0 {
            return invalid("export.sync_timeout_ms must be non-zero".into());
        }
        if export.archive_name.trim().is_empty() {
            return invalid("export.archive_name must not be empty".into());
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Whether the overlay names `generation.<key>`.
fn overlay_sets(overlay: Option<&toml::Value>, key: &str) -> bool {
    overlay
        .and_then(|v| v.get("generation"))
        .and_then(|g| g.get(key))
        .is_some()
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
///
/// Models the overlay leaves unset follow the resolved provider.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let (text_set, image_set) = (
        overlay_sets(overlay.as_ref(), "text_model"),
        overlay_sets(overlay.as_ref(), "image_model"),
    );
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let mut config: AppConfig = merged.try_into()?;
    let (text_model, image_model) = default_models(config.generation.api_provider);
    if !text_set {
        config.generation.text_model = text_model.to_string();
    }
    if !image_set {
        config.generation.image_model = image_model.to_string();
    }
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `carousel.toml`.
///
/// Used by the `gen-config` CLI command. Prompt templates are left out: they
/// are long and rarely edited, and the built-in ones apply when absent.
pub fn stock_config_toml() -> &'static str {
    r##"# Carousel Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Content generation
# ---------------------------------------------------------------------------
[generation]
# "openai" or "gemini". Models left unset follow the provider's defaults.
api_provider = "openai"
text_model = "gpt-4.1-mini-2025-04-14"
image_model = "dall-e-3"

# Requested ratio. Each provider supports a fixed set; the closest one is
# used. OpenAI 4:5 is produced by generating a square and cropping it.
#   gemini: 1:1, 9:16, 16:9, 4:3, 3:4, 4:5
#   openai: 1:1, 16:9, 9:16 (+ 4:5 by cropping)
aspect_ratio = "4:5"

# Templates. [TESE_PRINCIPAL] is replaced by the article's extracted thesis.
# slide_prompt = "..."
# image_prompt = "..."

# ---------------------------------------------------------------------------
# Slide appearance (sizes in preview pixels)
# ---------------------------------------------------------------------------
[visual.typography]
font_family = "Inter, sans-serif"
title_font_size = 32.0
description_font_size = 18.0
line_spacing = 1.5

[visual.colors]
text_light = "#FFFFFF"       # On dark and image backgrounds
text_dark = "#000000"        # On light backgrounds
highlight = "#F97316"        # ++highlighted++ words
slide_bg_light = "#FFFFFF"
slide_bg_dark = "#000000"
slide_bg_accent = "#F3F4F6"
overlay_color = "#000000"    # Tint over image backgrounds

[visual.style]
text_alignment = "center"    # left, center, right
margin = 60.0
overlay_opacity = 0.3        # 0.0-1.0

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
base_width = 1080            # Slide width in pixels; height follows the ratio
quality = 95                 # JPEG quality (1-100)
preview_width = 540.0        # Width the preview is designed at
sync_timeout_ms = 10000      # Max wait for fonts per slide
font_dir = "fonts"           # Holds <Family>-Regular.ttf and <Family>-Bold.ttf
archive_name = "carousel.zip"
"##
}
