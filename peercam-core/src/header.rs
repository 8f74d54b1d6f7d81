//! Fixed 12-byte per-datagram frame header.
//!
//! ## Wire format (big-endian)
//!
//! ```text
//! capture_timestamp_ms: u64  (8)   sender wall clock, ms since UNIX epoch
//! sequence:             u32  (4)   per-session counter, wrapping
//! payload:              [u8]       compressed image, rest of the datagram
//! ```
//!
//! There is no magic, version, length or checksum: the payload length is
//! whatever remains of the datagram.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};

use crate::error::PeercamError;

/// Encoded size of [`FrameHeader`] on the wire.
pub const HEADER_SIZE: usize = 12;

/// Per-frame metadata prepended to every datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub capture_timestamp_ms: u64,
    pub sequence: u32,
}

impl FrameHeader {
    pub fn new(capture_timestamp_ms: u64, sequence: u32) -> Self {
        Self {
            capture_timestamp_ms,
            sequence,
        }
    }

    /// Serialize to the 12 wire bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut cursor = &mut buf[..];
        cursor.put_u64(self.capture_timestamp_ms);
        cursor.put_u32(self.sequence);
        buf
    }

    /// Append the header to `dst`.
    pub fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u64(self.capture_timestamp_ms);
        dst.put_u32(self.sequence);
    }

    /// Deserialize from the first 12 bytes of `data`.
    ///
    /// Any trailing bytes are ignored; callers slice the payload off at
    /// [`HEADER_SIZE`].
    pub fn decode(data: &[u8]) -> Result<Self, PeercamError> {
        if data.len() < HEADER_SIZE {
            return Err(PeercamError::HeaderTooShort {
                len: data.len(),
                need: HEADER_SIZE,
            });
        }
        let mut cursor = &data[..HEADER_SIZE];
        Ok(Self {
            capture_timestamp_ms: cursor.get_u64(),
            sequence: cursor.get_u32(),
        })
    }
}

/// Milliseconds since the UNIX epoch on the local wall clock.
///
/// Latency figures assume peers keep roughly synchronised clocks.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        for (ts, seq) in [
            (0u64, 0u32),
            (1_700_000_000_123, 42),
            (u64::MAX, u32::MAX),
        ] {
            let hdr = FrameHeader::new(ts, seq);
            assert_eq!(FrameHeader::decode(&hdr.encode()).unwrap(), hdr);
        }
    }

    #[test]
    fn header_is_big_endian() {
        let hdr = FrameHeader::new(0x0102_0304_0506_0708, 0x0A0B_0C0D);
        assert_eq!(
            hdr.encode(),
            [1, 2, 3, 4, 5, 6, 7, 8, 0x0A, 0x0B, 0x0C, 0x0D]
        );
    }

    #[test]
    fn decode_ignores_payload() {
        let mut datagram = FrameHeader::new(99, 7).encode().to_vec();
        datagram.extend_from_slice(&[0xFF, 0xD8, 0xFF]);
        let hdr = FrameHeader::decode(&datagram).unwrap();
        assert_eq!(hdr.sequence, 7);
        assert_eq!(hdr.capture_timestamp_ms, 99);
    }

    #[test]
    fn write_to_matches_encode() {
        let hdr = FrameHeader::new(123_456, 9);
        let mut out = Vec::new();
        hdr.write_to(&mut out);
        assert_eq!(out, hdr.encode());
    }

    #[test]
    fn header_too_short() {
        let short = [0u8; 11];
        assert!(matches!(
            FrameHeader::decode(&short),
            Err(PeercamError::HeaderTooShort { len: 11, need: 12 })
        ));
    }

    #[test]
    fn clock_is_past_2020() {
        assert!(now_ms() > 1_577_836_800_000);
    }
}
