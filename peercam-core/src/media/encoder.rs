//! Planar YUV → JPEG frame encoder.
//!
//! Each [`YuvFrame`] goes through two steps:
//!
//! 1. **Interleave** the planes into NV21 (full luma plane followed by
//!    V/U pairs). The chroma order is swapped relative to the natural
//!    U-then-V plane order; receivers rely on this, so it is part of the
//!    protocol rather than a tuning knob.
//! 2. **Compress** the whole frame rectangle to baseline JPEG at a fixed
//!    low quality that favours bandwidth over fidelity.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, RgbImage};

use crate::error::PeercamError;
use crate::media::types::YuvFrame;

/// Default JPEG quality (0..100 scale).
pub const DEFAULT_JPEG_QUALITY: u8 = 30;

// ── FrameEncoder ─────────────────────────────────────────────────

/// Stateless apart from counters; one instance per sender task.
pub struct FrameEncoder {
    quality: u8,
    frames_encoded: u64,
}

impl FrameEncoder {
    /// Create an encoder with the given JPEG quality (clamped to 1..=100).
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            frames_encoded: 0,
        }
    }

    /// Compress a planar sample into a self-describing JPEG payload.
    pub fn encode(&mut self, frame: &YuvFrame) -> Result<Vec<u8>, PeercamError> {
        frame.validate()?;

        let nv21 = interleave_nv21(frame);
        let rgb = nv21_to_rgb(&nv21, frame.width, frame.height);

        let img: RgbImage = ImageBuffer::from_raw(frame.width, frame.height, rgb)
            .ok_or_else(|| PeercamError::Encode("rgb buffer does not match geometry".into()))?;

        let mut out = Cursor::new(Vec::with_capacity(nv21.len() / 8));
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        img.write_with_encoder(encoder)
            .map_err(|e| PeercamError::Encode(e.to_string()))?;

        self.frames_encoded += 1;
        Ok(out.into_inner())
    }

    /// Configured JPEG quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Number of frames encoded so far.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

// ── Colour conversion ────────────────────────────────────────────

/// Pack a planar 4:2:0 sample as NV21: `Y…Y V U V U…`.
pub fn interleave_nv21(frame: &YuvFrame) -> Vec<u8> {
    let luma = frame.width as usize * frame.height as usize;
    let chroma = frame.chroma_width() as usize * frame.chroma_height() as usize;

    let mut out = Vec::with_capacity(luma + chroma * 2);
    out.extend_from_slice(&frame.y[..luma]);
    for (v, u) in frame.v[..chroma].iter().zip(&frame.u[..chroma]) {
        out.push(*v);
        out.push(*u);
    }
    out
}

/// Full-range BT.601 (JFIF) conversion of an NV21 buffer to packed RGB.
pub fn nv21_to_rgb(nv21: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    let cw = w.div_ceil(2);
    let luma = w * h;
    let mut rgb = Vec::with_capacity(luma * 3);

    for row in 0..h {
        let chroma_row = luma + (row / 2) * cw * 2;
        for col in 0..w {
            let y = nv21[row * w + col] as f32;
            let pair = chroma_row + (col / 2) * 2;
            let v = nv21[pair] as f32 - 128.0;
            let u = nv21[pair + 1] as f32 - 128.0;

            rgb.push(clamp_u8(y + 1.402 * v));
            rgb.push(clamp_u8(y - 0.344_136 * u - 0.714_136 * v));
            rgb.push(clamp_u8(y + 1.772 * u));
        }
    }
    rgb
}

#[inline]
fn clamp_u8(x: f32) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, y: u8, u: u8, v: u8) -> YuvFrame {
        let cw = w.div_ceil(2) as usize;
        let ch = h.div_ceil(2) as usize;
        YuvFrame::new(
            w,
            h,
            vec![y; (w * h) as usize],
            vec![u; cw * ch],
            vec![v; cw * ch],
        )
        .unwrap()
    }

    #[test]
    fn nv21_puts_v_before_u() {
        let frame = solid(2, 2, 10, 20, 30);
        let nv21 = interleave_nv21(&frame);
        assert_eq!(nv21, vec![10, 10, 10, 10, 30, 20]);
    }

    #[test]
    fn strong_cb_reads_as_blue() {
        // U = Cb. With the swap applied correctly the pixel must come out
        // blue, not red.
        let frame = solid(2, 2, 128, 255, 128);
        let rgb = nv21_to_rgb(&interleave_nv21(&frame), 2, 2);
        let (r, g, b) = (rgb[0], rgb[1], rgb[2]);
        assert_eq!(b, 255);
        assert_eq!(r, 128);
        assert!(g < 128);
    }

    #[test]
    fn neutral_chroma_is_grey() {
        let frame = solid(4, 4, 77, 128, 128);
        let rgb = nv21_to_rgb(&interleave_nv21(&frame), 4, 4);
        assert!(rgb.iter().all(|&c| c == 77));
    }

    #[test]
    fn encode_produces_jpeg() {
        let mut enc = FrameEncoder::default();
        let payload = enc.encode(&solid(320, 240, 90, 128, 128)).unwrap();

        assert_eq!(&payload[..2], &[0xFF, 0xD8]);
        assert_eq!(&payload[payload.len() - 2..], &[0xFF, 0xD9]);
        assert!(payload.len() < 60_000);
        assert_eq!(enc.frames_encoded(), 1);

        let decoded = image::load_from_memory(&payload).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (320, 240));
    }

    #[test]
    fn encode_odd_geometry() {
        let mut enc = FrameEncoder::new(50);
        let payload = enc.encode(&solid(17, 9, 200, 100, 150)).unwrap();
        let decoded = image::load_from_memory(&payload).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (17, 9));
    }

    #[test]
    fn quality_is_clamped() {
        assert_eq!(FrameEncoder::new(0).quality(), 1);
        assert_eq!(FrameEncoder::new(200).quality(), 100);
    }

    #[test]
    fn encode_rejects_truncated_planes() {
        let mut frame = solid(8, 8, 0, 128, 128);
        frame.y.truncate(10);
        let mut enc = FrameEncoder::default();
        assert!(enc.encode(&frame).unwrap_err().is_transient());
        assert_eq!(enc.frames_encoded(), 0);
    }
}
