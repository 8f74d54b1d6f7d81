//! Delivery-quality statistics.
//!
//! [`StatsAggregator`] is owned by the receive loop. It tracks sequence
//! continuity and latency over a resetting window (one second by default)
//! and yields a [`StatsSnapshot`] each time the window closes. Counts are
//! interval-scoped: the reported loss rate is a trailing per-window rate,
//! not lifetime loss.
//!
//! [`SenderStats`] holds lock-free counters for the outbound side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::header::FrameHeader;

/// Default reporting interval.
pub const STATS_INTERVAL: Duration = Duration::from_secs(1);

// ── StatsSnapshot ────────────────────────────────────────────────

/// Figures for one closed reporting window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Datagrams received in the window (equals frames per second for the
    /// default one-second interval).
    pub fps: u32,
    /// Frames inferred lost from sequence gaps in the window.
    pub lost: u32,
    /// Mean of `arrival - capture_timestamp` in ms (0 if nothing arrived).
    pub avg_latency_ms: i64,
    /// `lost / (received + lost) * 100` (0 if both are zero).
    pub loss_rate_percent: f64,
}

impl StatsSnapshot {
    /// Received count for the window.
    pub fn received(&self) -> u32 {
        self.fps
    }

    /// Emit the per-interval telemetry line.
    pub fn log(&self) {
        info!(
            target: "peercam::stats",
            fps = self.fps,
            avg_latency_ms = self.avg_latency_ms,
            loss_rate_percent = %format!("{:.2}", self.loss_rate_percent),
            "video stats"
        );
    }
}

// ── StatsAggregator ──────────────────────────────────────────────

/// Per-window receive statistics.
#[derive(Debug)]
pub struct StatsAggregator {
    interval: Duration,
    /// `None` until the first datagram of the session.
    last_seen_sequence: Option<u32>,
    received: u32,
    lost: u32,
    latency_sum_ms: i64,
    window_start: Instant,
}

impl StatsAggregator {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    /// Create an aggregator whose first window opens at `now`.
    pub fn starting_at(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_seen_sequence: None,
            received: 0,
            lost: 0,
            latency_sum_ms: 0,
            window_start: now,
        }
    }

    /// Forget everything, including the last seen sequence.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::starting_at(self.interval, now);
    }

    /// Account for one datagram that arrived at wall-clock `arrival_ms`
    /// and monotonic `now`.
    ///
    /// Returns a snapshot when this datagram closes the current window.
    pub fn record(
        &mut self,
        header: &FrameHeader,
        arrival_ms: u64,
        now: Instant,
    ) -> Option<StatsSnapshot> {
        let latency = arrival_ms.wrapping_sub(header.capture_timestamp_ms) as i64;
        self.latency_sum_ms = self.latency_sum_ms.saturating_add(latency);
        self.received = self.received.saturating_add(1);

        if let Some(last) = self.last_seen_sequence {
            // Signed distance over the wrapping counter. Reordered and
            // duplicate datagrams give gap <= 0 and are not billed.
            let gap = header.sequence.wrapping_sub(last) as i32;
            if gap > 1 {
                self.lost = self.lost.saturating_add((gap - 1) as u32);
            }
        }
        self.last_seen_sequence = Some(header.sequence);

        if now.duration_since(self.window_start) >= self.interval {
            let snapshot = self.snapshot();
            self.received = 0;
            self.lost = 0;
            self.latency_sum_ms = 0;
            self.window_start = now;
            return Some(snapshot);
        }
        None
    }

    /// Figures for the window so far, without closing it.
    pub fn snapshot(&self) -> StatsSnapshot {
        let avg_latency_ms = if self.received > 0 {
            self.latency_sum_ms / self.received as i64
        } else {
            0
        };
        let total = self.received as u64 + self.lost as u64;
        let loss_rate_percent = if total > 0 {
            self.lost as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        StatsSnapshot {
            fps: self.received,
            lost: self.lost,
            avg_latency_ms,
            loss_rate_percent,
        }
    }

    pub fn last_seen_sequence(&self) -> Option<u32> {
        self.last_seen_sequence
    }

    pub fn received_count(&self) -> u32 {
        self.received
    }

    pub fn lost_count(&self) -> u32 {
        self.lost
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(STATS_INTERVAL)
    }
}

// ── SenderStats ──────────────────────────────────────────────────

/// Counters for the outbound path, shared with whoever wants to read them.
#[derive(Debug, Default)]
pub struct SenderStats {
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    oversize_dropped: AtomicU64,
    encode_failures: AtomicU64,
    send_errors: AtomicU64,
}

/// Point-in-time copy of [`SenderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderStatsSnapshot {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub oversize_dropped: u64,
    pub encode_failures: u64,
    pub send_errors: u64,
}

impl SenderStats {
    pub fn record_sent(&self, bytes: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_oversize(&self) {
        self.oversize_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encode_failure(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SenderStatsSnapshot {
        SenderStatsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            oversize_dropped: self.oversize_dropped.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn hdr(seq: u32, ts: u64) -> FrameHeader {
        FrameHeader::new(ts, seq)
    }

    #[test]
    fn gap_of_three_counts_two_lost() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);
        for seq in [0, 1, 2, 5, 6] {
            assert!(agg.record(&hdr(seq, 1000), 1010, t0).is_none());
        }
        assert_eq!(agg.received_count(), 5);
        assert_eq!(agg.lost_count(), 2);
        assert_eq!(agg.last_seen_sequence(), Some(6));
    }

    #[test]
    fn loss_rate_percentage() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);
        // 8 received, 2 lost: 0..=4, then 7..=9.
        for seq in [0, 1, 2, 3, 4, 7, 8, 9] {
            agg.record(&hdr(seq, 0), 0, t0);
        }
        let snap = agg.snapshot();
        assert_eq!(snap.received(), 8);
        assert_eq!(snap.lost, 2);
        assert_eq!(format!("{:.2}", snap.loss_rate_percent), "20.00");
    }

    #[test]
    fn window_closes_after_interval_and_resets() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);

        agg.record(&hdr(0, 100), 130, t0);
        agg.record(&hdr(2, 100), 150, t0 + Duration::from_millis(500));
        let snap = agg
            .record(&hdr(3, 100), 110, t0 + Duration::from_millis(1000))
            .expect("window should close at exactly 1000 ms");

        assert_eq!(snap.fps, 3);
        assert_eq!(snap.lost, 1);
        assert_eq!(snap.avg_latency_ms, (30 + 50 + 10) / 3);
        assert_eq!(format!("{:.2}", snap.loss_rate_percent), "25.00");

        // Counters restart, sequence tracking carries on.
        assert_eq!(agg.received_count(), 0);
        assert_eq!(agg.lost_count(), 0);
        assert_eq!(agg.last_seen_sequence(), Some(3));

        assert!(agg
            .record(&hdr(4, 0), 0, t0 + Duration::from_millis(1999))
            .is_none());
        assert_eq!(agg.lost_count(), 0);
    }

    #[test]
    fn empty_window_reports_zeros() {
        let agg = StatsAggregator::default();
        let snap = agg.snapshot();
        assert_eq!(snap, StatsSnapshot::default());
    }

    #[test]
    fn gap_across_wraparound() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);
        agg.record(&hdr(u32::MAX - 1, 0), 0, t0);
        agg.record(&hdr(1, 0), 0, t0);
        // MAX-1 → MAX → 0 → 1: two missing.
        assert_eq!(agg.lost_count(), 2);
    }

    #[test]
    fn reorder_and_duplicate_are_not_billed() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);
        for seq in [0, 2, 1, 1] {
            agg.record(&hdr(seq, 0), 0, t0);
        }
        // 0 → 2 bills seq 1 as lost; the late 1 and its duplicate do not
        // undo or add to it.
        assert_eq!(agg.lost_count(), 1);
        assert_eq!(agg.received_count(), 4);
        assert_eq!(agg.last_seen_sequence(), Some(1));
    }

    #[test]
    fn negative_latency_from_clock_skew() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);
        agg.record(&hdr(0, 1_000), 990, t0);
        assert_eq!(agg.snapshot().avg_latency_ms, -10);
    }

    #[test]
    fn reset_clears_sequence() {
        let t0 = Instant::now();
        let mut agg = StatsAggregator::starting_at(STATS_INTERVAL, t0);
        agg.record(&hdr(10, 0), 0, t0);
        agg.reset(t0);
        assert_eq!(agg.last_seen_sequence(), None);
        agg.record(&hdr(500, 0), 0, t0);
        assert_eq!(agg.lost_count(), 0);
    }

    #[test]
    fn sender_stats_snapshot() {
        let stats = SenderStats::default();
        stats.record_sent(100);
        stats.record_sent(50);
        stats.record_oversize();
        let snap = stats.snapshot();
        assert_eq!(snap.frames_sent, 2);
        assert_eq!(snap.bytes_sent, 150);
        assert_eq!(snap.oversize_dropped, 1);
        assert_eq!(snap.send_errors, 0);
    }
}
