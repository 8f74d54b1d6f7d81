//! Inbound half of a session.
//!
//! The receive loop blocks on the shared socket until a datagram arrives
//! or the session is cancelled. Every datagram of at least
//! [`HEADER_SIZE`] bytes updates the [`StatsAggregator`]; its payload is
//! then decoded, rotated and dispatched to the display sink. Shorter
//! datagrams are ignored outright. Decode failures drop the frame and
//! leave the last good image on screen.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::header::{FrameHeader, HEADER_SIZE, now_ms};
use crate::media::decoder::FrameDecoder;
use crate::media::sender::MAX_UDP_PAYLOAD;
use crate::media::sink::SinkDispatcher;
use crate::media::stats::{StatsAggregator, StatsSnapshot};

/// Result of handling one datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatagramOutcome {
    /// Shorter than a header; no counters touched.
    Ignored,
    /// Counted and presented.
    Presented { sequence: u32 },
    /// Counted, but the payload did not decode.
    Undecodable { sequence: u32 },
}

pub struct FrameReceiver {
    socket: Arc<UdpSocket>,
    streaming: Arc<AtomicBool>,
    cancel: CancellationToken,
    stats: StatsAggregator,
    decoder: FrameDecoder,
    dispatcher: SinkDispatcher,
    snapshots: Arc<watch::Sender<StatsSnapshot>>,
}

impl FrameReceiver {
    pub fn new(
        socket: Arc<UdpSocket>,
        streaming: Arc<AtomicBool>,
        cancel: CancellationToken,
        stats: StatsAggregator,
        decoder: FrameDecoder,
        dispatcher: SinkDispatcher,
        snapshots: Arc<watch::Sender<StatsSnapshot>>,
    ) -> Self {
        Self {
            socket,
            streaming,
            cancel,
            stats,
            decoder,
            dispatcher,
            snapshots,
        }
    }

    /// Process one datagram.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> DatagramOutcome {
        let header = match FrameHeader::decode(datagram) {
            Ok(h) => h,
            Err(e) => {
                trace!(error = %e, "short datagram ignored");
                return DatagramOutcome::Ignored;
            }
        };

        if let Some(snapshot) = self.stats.record(&header, now_ms(), Instant::now()) {
            snapshot.log();
            self.snapshots.send_replace(snapshot);
        }

        match self.decoder.decode(&header, &datagram[HEADER_SIZE..]) {
            Ok(frame) => {
                self.dispatcher.dispatch(frame);
                DatagramOutcome::Presented {
                    sequence: header.sequence,
                }
            }
            Err(e) => {
                debug!(seq = header.sequence, error = %e, "payload dropped");
                DatagramOutcome::Undecodable {
                    sequence: header.sequence,
                }
            }
        }
    }

    /// Current (unclosed) window figures.
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// Run until the session is cancelled.
    ///
    /// Socket errors while streaming are logged and the loop continues;
    /// once the gate is cleared they are the expected shutdown signal.
    pub async fn run(mut self) {
        info!("receiver started");
        let mut buf = vec![0u8; MAX_UDP_PAYLOAD];

        loop {
            let recv = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                r = self.socket.recv_from(&mut buf) => r,
            };

            if !self.streaming.load(Ordering::SeqCst) {
                break;
            }

            match recv {
                Ok((len, _peer)) => {
                    self.handle_datagram(&buf[..len]);
                }
                Err(e) => {
                    warn!(error = %e, "receive failed");
                }
            }
        }

        info!("receiver stopped");
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::encoder::FrameEncoder;
    use crate::media::sink::MemorySink;
    use crate::media::stats::STATS_INTERVAL;
    use crate::media::types::YuvFrame;
    use std::time::Duration;

    async fn receiver(sink: MemorySink) -> (FrameReceiver, watch::Receiver<StatsSnapshot>) {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let cancel = CancellationToken::new();
        let (dispatcher, _handle) = SinkDispatcher::spawn(Box::new(sink), cancel.clone());
        let (tx, rx) = watch::channel(StatsSnapshot::default());
        let recv = FrameReceiver::new(
            socket,
            Arc::new(AtomicBool::new(true)),
            cancel,
            StatsAggregator::new(STATS_INTERVAL),
            FrameDecoder::default(),
            dispatcher,
            Arc::new(tx),
        );
        (recv, rx)
    }

    fn datagram(seq: u32, payload: &[u8]) -> Vec<u8> {
        let mut d = FrameHeader::new(now_ms(), seq).encode().to_vec();
        d.extend_from_slice(payload);
        d
    }

    fn jpeg() -> Vec<u8> {
        let frame = YuvFrame::new(16, 8, vec![100; 128], vec![128; 32], vec![128; 32]).unwrap();
        FrameEncoder::default().encode(&frame).unwrap()
    }

    #[tokio::test]
    async fn short_datagrams_leave_counters_alone() {
        let sink = MemorySink::new();
        let (mut recv, _) = receiver(sink.clone()).await;

        for len in 0..HEADER_SIZE {
            assert_eq!(recv.handle_datagram(&vec![0xAA; len]), DatagramOutcome::Ignored);
        }
        assert_eq!(recv.stats().received_count(), 0);
        assert_eq!(recv.stats().lost_count(), 0);
        assert_eq!(recv.stats().last_seen_sequence(), None);
        assert_eq!(recv.stats().snapshot().avg_latency_ms, 0);
    }

    #[tokio::test]
    async fn bad_payload_still_counts() {
        let (mut recv, _) = receiver(MemorySink::new()).await;

        assert_eq!(
            recv.handle_datagram(&datagram(0, b"not a jpeg")),
            DatagramOutcome::Undecodable { sequence: 0 }
        );
        // Header-only datagram: counted, nothing to show.
        assert_eq!(
            recv.handle_datagram(&datagram(3, &[])),
            DatagramOutcome::Undecodable { sequence: 3 }
        );
        assert_eq!(recv.stats().received_count(), 2);
        assert_eq!(recv.stats().lost_count(), 2);
    }

    #[tokio::test]
    async fn good_frame_is_presented_rotated() {
        let sink = MemorySink::new();
        let (mut recv, _) = receiver(sink.clone()).await;

        assert_eq!(
            recv.handle_datagram(&datagram(0, &jpeg())),
            DatagramOutcome::Presented { sequence: 0 }
        );
        for _ in 0..200 {
            if !sink.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let shown = sink.last().unwrap();
        assert_eq!((shown.width(), shown.height()), (8, 16));
    }

    #[tokio::test]
    async fn decode_failure_keeps_last_good_image() {
        let sink = MemorySink::new();
        let (mut recv, _) = receiver(sink.clone()).await;

        recv.handle_datagram(&datagram(0, &jpeg()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        recv.handle_datagram(&datagram(1, b"\xFF\xD8garbage"));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sink.sequences(), vec![0]);
    }
}
