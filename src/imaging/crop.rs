//! Center-crop an encoded image to an aspect ratio.
//!
//! Used for provider images that cannot be generated at the requested ratio
//! (OpenAI 4:5 is produced as a square and cropped here). The crop follows the
//! same centering rule as the export compositor, so a cropped background
//! looks identical in preview and export.

use super::calculations::{CropRegion, cover_crop_region};
use super::codec::{ImagingError, decode, encode_jpeg};
use super::params::Quality;
use crate::ratio::parse_ratio;

/// Crop `source` (any decodable format) to `target_ratio` and re-encode as
/// JPEG at the default quality.
///
/// The output dimensions are exactly the crop region; no resampling happens.
pub fn crop_to_ratio(source: &[u8], target_ratio: &str) -> Result<Vec<u8>, ImagingError> {
    crop_to_ratio_with_quality(source, target_ratio, Quality::default())
}

pub fn crop_to_ratio_with_quality(
    source: &[u8],
    target_ratio: &str,
    quality: Quality,
) -> Result<Vec<u8>, ImagingError> {
    let img = decode(source)?;
    let CropRegion {
        x,
        y,
        width,
        height,
    } = cover_crop_region((img.width(), img.height()), parse_ratio(target_ratio));
    tracing::debug!(
        source_width = img.width(),
        source_height = img.height(),
        x,
        y,
        width,
        height,
        target_ratio,
        "cropping image"
    );
    let cropped = img.crop_imm(x, y, width, height).to_rgb8();
    encode_jpeg(&cropped, quality)
}
