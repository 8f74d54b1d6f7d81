//! Outbound half of a session: one frame, one datagram.
//!
//! [`FrameSender`] owns the outbound sequence counter. Each call that
//! passes the streaming check consumes exactly one sequence number, even
//! when the size policy then rejects the frame, so receivers bill rejected
//! frames as loss instead of seeing a seamless sequence.
//!
//! [`SenderTask`] is the capture-feed consumer: it waits for the latest
//! sample, encodes it and hands the payload to the [`FrameSender`]. Frames
//! are sent in capture order because nothing is queued.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{BufMut, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PeercamError;
use crate::header::{FrameHeader, HEADER_SIZE, now_ms};
use crate::media::capture::LatestFrame;
use crate::media::encoder::FrameEncoder;
use crate::media::stats::SenderStats;

/// Largest UDP payload over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Header + payload must stay strictly below this many bytes.
pub const DEFAULT_MAX_DATAGRAM: usize = 60_000;

// ── SendOutcome ──────────────────────────────────────────────────

/// What happened to a frame handed to [`FrameSender::send_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Transmitted as one datagram of `bytes` bytes.
    Sent { sequence: u32, bytes: usize },
    /// Rejected by the size policy; the sequence number was consumed.
    Oversize { sequence: u32, size: usize },
    /// Session not streaming; nothing happened.
    Skipped,
}

// ── FrameSender ──────────────────────────────────────────────────

pub struct FrameSender {
    socket: Arc<UdpSocket>,
    target: SocketAddr,
    streaming: Arc<AtomicBool>,
    next_sequence: u32,
    max_datagram: usize,
    stats: Arc<SenderStats>,
}

impl FrameSender {
    /// The counter starts at 0; build a new sender for every session.
    pub fn new(
        socket: Arc<UdpSocket>,
        target: SocketAddr,
        streaming: Arc<AtomicBool>,
        max_datagram: usize,
        stats: Arc<SenderStats>,
    ) -> Self {
        Self {
            socket,
            target,
            streaming,
            next_sequence: 0,
            max_datagram,
            stats,
        }
    }

    /// Prefix `payload` with a header and send it to the target.
    ///
    /// Oversize frames are dropped with a warning, never fragmented.
    pub async fn send_frame(&mut self, payload: &[u8]) -> Result<SendOutcome, PeercamError> {
        if !self.streaming.load(Ordering::SeqCst) {
            return Ok(SendOutcome::Skipped);
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        let header = FrameHeader::new(now_ms(), sequence);

        let size = HEADER_SIZE + payload.len();
        if size >= self.max_datagram {
            self.stats.record_oversize();
            let err = PeercamError::FrameTooLarge {
                size,
                max: self.max_datagram,
            };
            warn!(seq = sequence, error = %err, "frame dropped");
            return Ok(SendOutcome::Oversize { sequence, size });
        }

        let mut datagram = BytesMut::with_capacity(size);
        header.write_to(&mut datagram);
        datagram.put_slice(payload);

        match self.socket.send_to(&datagram, self.target).await {
            Ok(bytes) => {
                self.stats.record_sent(bytes);
                debug!(seq = sequence, bytes, "frame sent");
                Ok(SendOutcome::Sent { sequence, bytes })
            }
            Err(e) => {
                self.stats.record_send_error();
                Err(PeercamError::Io(e))
            }
        }
    }

    /// Sequence number the next accepted frame will carry.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

// ── SenderTask ───────────────────────────────────────────────────

/// Capture → encode → transmit loop for one session.
pub struct SenderTask {
    sender: FrameSender,
    encoder: FrameEncoder,
    frames: watch::Receiver<LatestFrame>,
    cancel: CancellationToken,
    stats: Arc<SenderStats>,
}

impl SenderTask {
    pub fn new(
        sender: FrameSender,
        encoder: FrameEncoder,
        frames: watch::Receiver<LatestFrame>,
        cancel: CancellationToken,
    ) -> Self {
        let stats = Arc::clone(&sender.stats);
        Self {
            sender,
            encoder,
            frames,
            cancel,
            stats,
        }
    }

    pub async fn run(mut self) {
        info!(target = %self.sender.target(), "sender started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                changed = self.frames.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            let Some(frame) = self.frames.borrow_and_update().clone() else {
                continue;
            };

            let payload = match self.encoder.encode(&frame) {
                Ok(p) => p,
                Err(e) => {
                    self.stats.record_encode_failure();
                    warn!(error = %e, "frame encode failed, dropped");
                    continue;
                }
            };

            if let Err(e) = self.sender.send_frame(&payload).await {
                warn!(error = %e, "frame send failed");
            }
        }

        info!(frames = self.encoder.frames_encoded(), "sender stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────
