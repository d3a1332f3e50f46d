//! Image processing in pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` |
//! | **Cover crop** | [`cover_crop_region`] + `crop_imm` |
//! | **Encode** | `JpegEncoder` at quality 95 |
//! | **Colours** | `hex` token decoding + alpha blending |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop-region math (unit testable)
//! - **Parameters**: Encoding quality
//! - **Codec**: decode / JPEG encode
//! - **Crop**: the ratio cropper used on provider images

mod calculations;
pub mod codec;
pub mod color;
pub mod crop;
mod params;

pub use calculations::{CropRegion, cover_crop_region};
pub use codec::{ImagingError, decode, encode_jpeg};
pub use color::{InvalidColor, parse_hex_color};
pub use crop::{crop_to_ratio, crop_to_ratio_with_quality};
pub use params::Quality;
