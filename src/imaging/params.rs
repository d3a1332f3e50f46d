//! Parameter types for image operations.
//!
//! - [`Quality`]: JPEG encoding quality (1-100, default 95). Clamped on construction.

use serde::{Deserialize, Serialize};

/// Quality setting for JPEG encoding (1-100).
///
/// The default of 95 matches what a browser canvas produces for
/// `toBlob('image/jpeg', 0.95)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

impl From<u8> for Quality {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}
