//! Payload decoder and orientation correction.
//!
//! Turns the bytes after the frame header back into an RGB image and
//! applies the fixed rotation that compensates for the sender's sensor
//! mount. The rotation is a local constant of the capture/display
//! pairing; nothing about it travels on the wire.

use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::error::PeercamError;
use crate::header::FrameHeader;
use crate::media::types::DisplayFrame;

// ── Rotation ─────────────────────────────────────────────────────

/// Orientation correction applied to every decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    /// Leave the image as decoded.
    None,
    /// 90° clockwise.
    Cw90,
    /// 180°.
    #[serde(rename = "180")]
    Half,
    /// 90° counter-clockwise (front camera mounted sideways).
    #[default]
    Ccw90,
}

impl Rotation {
    /// Rotate `img` according to this correction.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Rotation::None => img,
            Rotation::Cw90 => img.rotate90(),
            Rotation::Half => img.rotate180(),
            Rotation::Ccw90 => img.rotate270(),
        }
    }
}

// ── FrameDecoder ─────────────────────────────────────────────────

/// Decodes JPEG payloads into orientation-corrected [`DisplayFrame`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDecoder {
    rotation: Rotation,
}

impl FrameDecoder {
    pub fn new(rotation: Rotation) -> Self {
        Self { rotation }
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Decode `payload` and rotate it. Malformed payloads yield
    /// [`PeercamError::Decode`].
    pub fn decode(
        &self,
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<DisplayFrame, PeercamError> {
        if payload.is_empty() {
            return Err(PeercamError::Decode("empty payload".into()));
        }
        let img = image::load_from_memory_with_format(payload, ImageFormat::Jpeg)?;
        let image = self.rotation.apply(img).into_rgb8();

        Ok(DisplayFrame {
            sequence: header.sequence,
            capture_timestamp_ms: header.capture_timestamp_ms,
            image,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────
