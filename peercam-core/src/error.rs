//! Domain-specific error types for the peercam pipeline.
//!
//! Per-frame faults (short header, encode/decode failure, oversize frame)
//! are dropped locally by the pipeline and only ever logged. Only session
//! setup surfaces errors to the caller.

use thiserror::Error;

/// The canonical error type for the peercam pipeline.
#[derive(Debug, Error)]
pub enum PeercamError {
    // ── Wire Errors ──────────────────────────────────────────────
    /// A datagram was shorter than the fixed frame header.
    #[error("datagram too short for header: {len} bytes (need {need})")]
    HeaderTooShort { len: usize, need: usize },

    /// Header + payload would not fit the datagram threshold.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Media Errors ─────────────────────────────────────────────
    /// Plane sizes do not match the sample's declared geometry.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// The image compressor rejected the frame.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The payload is not a decodable image.
    #[error("decode failed: {0}")]
    Decode(String),

    // ── Network Errors ───────────────────────────────────────────
    /// The UDP/IO layer reported an error.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// The target host did not resolve to any address.
    #[error("cannot resolve {0}")]
    Resolve(String),

    // ── Config Errors ────────────────────────────────────────────
    /// Configuration values out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PeercamError {
    /// Whether this is a per-frame fault that drops a single frame and
    /// never terminates the session.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::HeaderTooShort { .. }
                | Self::FrameTooLarge { .. }
                | Self::InvalidSample(_)
                | Self::Encode(_)
                | Self::Decode(_)
        )
    }
}

impl From<image::ImageError> for PeercamError {
    fn from(e: image::ImageError) -> Self {
        PeercamError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = PeercamError::FrameTooLarge {
            size: 70_000,
            max: 60_000,
        };
        assert!(e.to_string().contains("70000"));
        assert!(e.to_string().contains("60000"));

        let e = PeercamError::HeaderTooShort { len: 5, need: 12 };
        assert!(e.to_string().contains("12"));
    }

    #[test]
    fn transient_classification() {
        assert!(PeercamError::Decode("bad marker".into()).is_transient());
        assert!(PeercamError::FrameTooLarge { size: 1, max: 0 }.is_transient());
        assert!(!PeercamError::InvalidConfig("fps".into()).is_transient());

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(!PeercamError::from(io).is_transient());
    }

    #[test]
    fn image_errors_are_decode_faults() {
        let err = image::load_from_memory_with_format(b"nope", image::ImageFormat::Jpeg).unwrap_err();
        let e = PeercamError::from(err);
        assert!(matches!(e, PeercamError::Decode(_)));
        assert!(e.is_transient());
    }
}
