//! # peercam-core
//!
//! Real-time, loss-tolerant video streaming over UDP: one compressed frame
//! per datagram, behind a 12-byte header carrying the capture timestamp
//! and a wrapping sequence number. Loss is measured, never recovered.
//!
//! This crate contains:
//! - **Wire header**: `FrameHeader` (big-endian timestamp + sequence)
//! - **Media pipeline**: encoder, sender, receiver, stats, decoder, sinks
//! - **Session**: `VideoSession`, the start/stop lifecycle owner
//! - **Error**: `PeercamError`, a typed, `thiserror`-based error hierarchy

pub mod error;
pub mod header;
pub mod media;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use error::PeercamError;
pub use header::{FrameHeader, HEADER_SIZE, now_ms};
pub use media::{
    CaptureFeed, DisplayFrame, DisplaySink, FrameDecoder, FrameEncoder, LogSink, MemorySink,
    Rotation, SenderStatsSnapshot, SessionConfig, StatsSnapshot, VideoSession, YuvFrame,
};
