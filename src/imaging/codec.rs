//! Decoding and JPEG encoding on top of the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` (format sniffed from magic bytes) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |
//! | Crop | `image::DynamicImage::crop_imm` |
//! | Resize | `image::imageops::resize` with `Lanczos3` |

use super::params::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbImage};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagingError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode JPEG: {0}")]
    Encode(String),
}

/// Decode an in-memory image, sniffing its format.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, ImagingError> {
    if bytes.is_empty() {
        return Err(ImagingError::Decode("empty image data".into()));
    }
    image::load_from_memory(bytes).map_err(|e| ImagingError::Decode(e.to_string()))
}

/// Encode an RGB frame as baseline JPEG.
///
/// An empty result is treated as a failure: a zero-byte entry in the archive
/// would look like success to the caller.
pub fn encode_jpeg(frame: &RgbImage, quality: Quality) -> Result<Vec<u8>, ImagingError> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.value())
        .encode_image(frame)
        .map_err(|e| ImagingError::Encode(e.to_string()))?;
    if out.is_empty() {
        return Err(ImagingError::Encode("encoder produced no data".into()));
    }
    Ok(out)
}
