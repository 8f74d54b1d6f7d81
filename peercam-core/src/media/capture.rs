//! Capture-source boundary.
//!
//! The camera lives outside this crate. It hands samples to a
//! [`CaptureFeed`], a single-slot "latest frame" channel: every push
//! replaces whatever the sender has not picked up yet, so a slow encoder
//! never builds a backlog and intermediate frames are simply skipped.

use std::sync::Arc;

use tokio::sync::watch;

use crate::media::types::YuvFrame;

/// Slot contents: the newest sample, if any.
pub type LatestFrame = Option<Arc<YuvFrame>>;

/// Cloneable handle the capture callback pushes samples into.
#[derive(Clone)]
pub struct CaptureFeed {
    tx: Arc<watch::Sender<LatestFrame>>,
}

impl CaptureFeed {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new sample, replacing any unconsumed one.
    ///
    /// Never blocks; if no session is streaming the sample is just kept as
    /// the current value and discarded by the next push.
    pub fn push(&self, frame: YuvFrame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }

    /// Receiver for the sender loop. Only samples pushed after this call
    /// are reported as changed.
    pub fn subscribe(&self) -> watch::Receiver<LatestFrame> {
        self.tx.subscribe()
    }

    /// Number of live subscribers (a streaming session holds one).
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CaptureFeed {
    fn default() -> Self {
        Self::new()
    }
}
