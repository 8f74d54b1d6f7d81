//! Peer node: one session, one synthetic camera, one display.
//!
//! Wires the [`NodeConfig`] into a [`VideoSession`], feeds it from the
//! test pattern and presents received frames on a [`NodeSink`]. Runs
//! until its stop handle is cancelled.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use peercam_core::{DisplayFrame, DisplaySink, LogSink, PeercamError, VideoSession};

use crate::config::NodeConfig;
use crate::pattern::{self, TestPattern};
use crate::snapshot::SnapshotSink;

// ── NodeSink ─────────────────────────────────────────────────────

/// Log line every few frames, plus an optional on-disk snapshot.
pub struct NodeSink {
    log: LogSink,
    snapshot: Option<SnapshotSink>,
}

impl NodeSink {
    pub fn from_config(config: &NodeConfig) -> Self {
        let snapshot = (!config.display.snapshot_path.is_empty())
            .then(|| SnapshotSink::new(&config.display.snapshot_path, config.display.snapshot_quality));
        Self {
            log: LogSink::new(config.display.log_every),
            snapshot,
        }
    }
}

impl DisplaySink for NodeSink {
    fn present(&mut self, frame: &DisplayFrame) {
        self.log.present(frame);
        if let Some(snapshot) = &mut self.snapshot {
            snapshot.present(frame);
        }
    }
}

// ── PeerNode ─────────────────────────────────────────────────────

pub struct PeerNode {
    config: NodeConfig,
    stop: CancellationToken,
}

impl PeerNode {
    pub fn new(config: NodeConfig) -> Self {
        Self {
            config,
            stop: CancellationToken::new(),
        }
    }

    /// Cancel this to end [`PeerNode::run`].
    pub fn stop_handle(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Stream until stopped, then tear the session down.
    pub async fn run(&self) -> Result<(), PeercamError> {
        self.config.validate()?;
        let net = &self.config.network;

        let mut session = VideoSession::new(self.config.to_session_config()?);
        session
            .start(&net.target_host, net.target_port, NodeSink::from_config(&self.config))
            .await?;

        if let (Some(local), Some(target)) = (session.local_addr(), session.target_addr()) {
            info!(local = %local, target = %target, "node streaming");
        }

        let camera = tokio::spawn(pattern::run(
            TestPattern::new(self.config.capture.width, self.config.capture.height),
            self.config.capture.fps,
            session.capture_feed(),
            self.stop.child_token(),
        ));

        let mut stats = session.stats_receiver();
        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                changed = stats.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if let Some(sent) = session.sender_stats() {
                        debug!(
                            frames_sent = sent.frames_sent,
                            bytes_sent = sent.bytes_sent,
                            oversize = sent.oversize_dropped,
                            "sender totals"
                        );
                    }
                }
            }
        }

        if let Err(e) = camera.await {
            warn!(error = %e, "capture task ended abnormally");
        }
        session.stop().await;
        info!("node stopped");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
