//! Shared frame types for the capture → encode and decode → display stages.
//!
//! These are **internal** image representations. The only thing that ever
//! crosses the wire is the compressed payload behind a
//! [`FrameHeader`](crate::header::FrameHeader).

use std::time::Instant;

use image::RgbImage;

use crate::error::PeercamError;

// ── YuvFrame ─────────────────────────────────────────────────────

/// One planar YUV 4:2:0 sample as delivered by the capture source.
///
/// Planes are tightly packed: luma is `width * height` bytes, each chroma
/// plane is `ceil(width / 2) * ceil(height / 2)` bytes in natural
/// U-then-V order.
#[derive(Debug, Clone)]
pub struct YuvFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Luma plane.
    pub y: Vec<u8>,
    /// Cb plane.
    pub u: Vec<u8>,
    /// Cr plane.
    pub v: Vec<u8>,
    /// Monotonic capture instant.
    pub captured_at: Instant,
}

impl YuvFrame {
    /// Build a sample, checking plane sizes against the geometry.
    pub fn new(
        width: u32,
        height: u32,
        y: Vec<u8>,
        u: Vec<u8>,
        v: Vec<u8>,
    ) -> Result<Self, PeercamError> {
        let frame = Self {
            width,
            height,
            y,
            u,
            v,
            captured_at: Instant::now(),
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Width of a chroma plane.
    pub fn chroma_width(&self) -> u32 {
        self.width.div_ceil(2)
    }

    /// Height of a chroma plane.
    pub fn chroma_height(&self) -> u32 {
        self.height.div_ceil(2)
    }

    /// Checks that every plane holds enough bytes for the geometry.
    pub fn validate(&self) -> Result<(), PeercamError> {
        if self.width == 0 || self.height == 0 {
            return Err(PeercamError::InvalidSample(format!(
                "empty geometry {}x{}",
                self.width, self.height
            )));
        }
        let luma = self.width as usize * self.height as usize;
        let chroma = self.chroma_width() as usize * self.chroma_height() as usize;
        if self.y.len() < luma {
            return Err(PeercamError::InvalidSample(format!(
                "luma plane {} < {luma}",
                self.y.len()
            )));
        }
        if self.u.len() < chroma || self.v.len() < chroma {
            return Err(PeercamError::InvalidSample(format!(
                "chroma planes {}/{} < {chroma}",
                self.u.len(),
                self.v.len()
            )));
        }
        Ok(())
    }
}

// ── DisplayFrame ─────────────────────────────────────────────────

/// A decoded, orientation-corrected image ready for a display sink.
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    /// Sequence number of the datagram this image came from.
    pub sequence: u32,
    /// Sender capture timestamp (ms since UNIX epoch).
    pub capture_timestamp_ms: u64,
    /// The rotated RGB image.
    pub image: RgbImage,
}

impl DisplayFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
