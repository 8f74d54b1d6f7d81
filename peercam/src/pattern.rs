//! Synthetic capture source.
//!
//! Stands in for a camera: a YUV 4:2:0 test pattern (diagonal luma ramp,
//! a bright bar sweeping left to right, chroma quadrants) pushed into the
//! session's [`CaptureFeed`] at a fixed rate.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use peercam_core::{CaptureFeed, PeercamError, YuvFrame};

/// Frame generator; each call to [`TestPattern::next_frame`] advances
/// the animation by one step.
pub struct TestPattern {
    width: u32,
    height: u32,
    tick: u32,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }

    pub fn next_frame(&mut self) -> Result<YuvFrame, PeercamError> {
        let (w, h) = (self.width, self.height);
        let bar_width = (w / 16).max(1);
        let bar_x = (self.tick.wrapping_mul(4)) % w;

        let mut y = Vec::with_capacity(w as usize * h as usize);
        for row in 0..h {
            for col in 0..w {
                let in_bar = col >= bar_x && col - bar_x < bar_width;
                let luma = if in_bar {
                    235
                } else {
                    row.wrapping_add(col).wrapping_add(self.tick) % 200 + 16
                };
                y.push(luma as u8);
            }
        }

        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        let chroma = cw as usize * ch as usize;
        let mut u = Vec::with_capacity(chroma);
        let mut v = Vec::with_capacity(chroma);
        for row in 0..ch {
            for col in 0..cw {
                let right = col >= cw / 2;
                let bottom = row >= ch / 2;
                u.push(if right { 170 } else { 90 });
                v.push(if bottom { 170 } else { 90 });
            }
        }

        self.tick = self.tick.wrapping_add(1);
        YuvFrame::new(w, h, y, u, v)
    }

    pub fn frames_generated(&self) -> u32 {
        self.tick
    }
}

/// Push test-pattern frames into `feed` at `fps` until `cancel` fires.
pub async fn run(mut pattern: TestPattern, fps: u32, feed: CaptureFeed, cancel: CancellationToken) {
    let period = Duration::from_secs(1) / fps.max(1);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(width = pattern.width, height = pattern.height, fps, "test pattern started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match pattern.next_frame() {
            Ok(frame) => feed.push(frame),
            Err(e) => {
                warn!(error = %e, "test pattern frame rejected");
                break;
            }
        }
        debug!(tick = pattern.frames_generated(), "pattern frame pushed");
    }

    info!(frames = pattern.frames_generated(), "test pattern stopped");
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_geometry() {
        let mut p = TestPattern::new(320, 240);
        let f = p.next_frame().unwrap();
        assert_eq!((f.width, f.height), (320, 240));
        assert_eq!(f.y.len(), 320 * 240);
        assert_eq!(f.u.len(), 160 * 120);
        assert_eq!(f.v.len(), 160 * 120);
    }

    #[test]
    fn odd_geometry_is_valid() {
        let mut p = TestPattern::new(17, 9);
        let f = p.next_frame().unwrap();
        assert_eq!(f.u.len(), 9 * 5);
    }

    #[test]
    fn pattern_moves() {
        let mut p = TestPattern::new(64, 48);
        let a = p.next_frame().unwrap();
        let b = p.next_frame().unwrap();
        assert_ne!(a.y, b.y);
        assert_eq!(a.u, b.u);
        assert_eq!(p.frames_generated(), 2);
    }

    #[tokio::test]
    async fn run_feeds_capture_until_cancelled() {
        let feed = CaptureFeed::new();
        let mut rx = feed.subscribe();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(TestPattern::new(32, 16), 50, feed.clone(), cancel.clone()));

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let frame = rx.borrow_and_update().clone().unwrap();
        assert_eq!((frame.width, frame.height), (32, 16));

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }
}
