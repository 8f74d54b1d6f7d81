//! Session lifecycle controller.
//!
//! [`VideoSession`] exclusively owns the per-session state: the streaming
//! gate, the shared UDP socket, the target address and the cancellation
//! token. `start` builds all of it fresh (sequence counter at 0, empty
//! stats window) and spawns three tasks:
//!
//! ```text
//! CaptureFeed ──► SenderTask ──► FrameSender ──► socket.send_to(target)
//! socket.recv_from ──► FrameReceiver ──► SinkDispatcher ──► display task
//! ```
//!
//! `stop` clears the gate first, then cancels the pending receive and
//! releases the socket, so shutdown never surfaces as a socket fault.
//! Both calls are idempotent.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PeercamError;
use crate::header::HEADER_SIZE;
use crate::media::capture::CaptureFeed;
use crate::media::decoder::{FrameDecoder, Rotation};
use crate::media::encoder::{DEFAULT_JPEG_QUALITY, FrameEncoder};
use crate::media::receiver::FrameReceiver;
use crate::media::sender::{DEFAULT_MAX_DATAGRAM, FrameSender, MAX_UDP_PAYLOAD, SenderTask};
use crate::media::sink::{DisplaySink, SinkDispatcher};
use crate::media::stats::{SenderStats, SenderStatsSnapshot, StatsAggregator, StatsSnapshot};

// ── SessionConfig ────────────────────────────────────────────────

/// Tunables for a [`VideoSession`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local address the session socket binds to.
    pub bind_addr: String,
    /// JPEG quality (1..=100).
    pub jpeg_quality: u8,
    /// Header + payload must stay strictly below this.
    pub max_datagram_bytes: usize,
    /// Stats reporting window in milliseconds.
    pub stats_interval_ms: u64,
    /// Orientation correction for received frames.
    pub rotation: Rotation,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:0".into(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_datagram_bytes: DEFAULT_MAX_DATAGRAM,
            stats_interval_ms: 1000,
            rotation: Rotation::default(),
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), PeercamError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(PeercamError::InvalidConfig(format!(
                "jpeg_quality must be 1..=100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_datagram_bytes <= HEADER_SIZE || self.max_datagram_bytes > MAX_UDP_PAYLOAD {
            return Err(PeercamError::InvalidConfig(format!(
                "max_datagram_bytes must be in {}..={MAX_UDP_PAYLOAD}, got {}",
                HEADER_SIZE + 1,
                self.max_datagram_bytes
            )));
        }
        if self.stats_interval_ms == 0 {
            return Err(PeercamError::InvalidConfig(
                "stats_interval_ms must be > 0".into(),
            ));
        }
        Ok(())
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}

// ── ActiveSession ────────────────────────────────────────────────

/// Everything that exists only while streaming.
struct ActiveSession {
    streaming: Arc<AtomicBool>,
    cancel: CancellationToken,
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    target: SocketAddr,
    sender_stats: Arc<SenderStats>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveSession {
    /// Gate first, then unblock every pending await.
    fn signal_stop(&self) {
        self.streaming.store(false, Ordering::SeqCst);
        self.cancel.cancel();
    }
}

// ── VideoSession ─────────────────────────────────────────────────

pub struct VideoSession {
    config: SessionConfig,
    capture: CaptureFeed,
    snapshots: Arc<watch::Sender<StatsSnapshot>>,
    active: Option<ActiveSession>,
}

impl VideoSession {
    pub fn new(config: SessionConfig) -> Self {
        let (tx, _rx) = watch::channel(StatsSnapshot::default());
        Self {
            config,
            capture: CaptureFeed::new(),
            snapshots: Arc::new(tx),
            active: None,
        }
    }

    /// Start streaming to `host:port` and presenting received frames on
    /// `sink`. A no-op if already streaming.
    pub async fn start<S: DisplaySink>(
        &mut self,
        host: &str,
        port: u16,
        sink: S,
    ) -> Result<(), PeercamError> {
        if self.active.is_some() {
            debug!("start ignored, already streaming");
            return Ok(());
        }
        self.config.validate()?;

        let socket = UdpSocket::bind(&self.config.bind_addr).await?;
        let local_addr = socket.local_addr()?;
        let target = resolve(host, port, local_addr).await?;
        let socket = Arc::new(socket);

        // A fresh session starts from an empty window.
        self.snapshots.send_replace(StatsSnapshot::default());

        let streaming = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let sender_stats = Arc::new(SenderStats::default());

        let (dispatcher, display_task) = SinkDispatcher::spawn(Box::new(sink), cancel.clone());

        let receiver = FrameReceiver::new(
            Arc::clone(&socket),
            Arc::clone(&streaming),
            cancel.clone(),
            StatsAggregator::new(self.config.stats_interval()),
            FrameDecoder::new(self.config.rotation),
            dispatcher,
            Arc::clone(&self.snapshots),
        );

        let sender = FrameSender::new(
            Arc::clone(&socket),
            target,
            Arc::clone(&streaming),
            self.config.max_datagram_bytes,
            Arc::clone(&sender_stats),
        );
        let sender_task = SenderTask::new(
            sender,
            FrameEncoder::new(self.config.jpeg_quality),
            self.capture.subscribe(),
            cancel.clone(),
        );

        let tasks = vec![
            tokio::spawn(receiver.run()),
            tokio::spawn(sender_task.run()),
            display_task,
        ];

        info!(local = %local_addr, target = %target, "streaming started");

        self.active = Some(ActiveSession {
            streaming,
            cancel,
            socket,
            local_addr,
            target,
            sender_stats,
            tasks,
        });
        Ok(())
    }

    /// Stop streaming and wait for the session tasks to finish.
    /// A no-op if not streaming.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.signal_stop();
        for task in active.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        // Tasks are gone; this is the last reference.
        drop(active.socket);

        info!(target = %active.target, "streaming stopped");
    }

    pub fn is_streaming(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.streaming.load(Ordering::SeqCst))
    }

    /// Handle for the capture source callback.
    pub fn capture_feed(&self) -> CaptureFeed {
        self.capture.clone()
    }

    /// Latest closed stats window; updated once per interval.
    pub fn stats_receiver(&self) -> watch::Receiver<StatsSnapshot> {
        self.snapshots.subscribe()
    }

    /// Outbound counters for the current session.
    pub fn sender_stats(&self) -> Option<SenderStatsSnapshot> {
        self.active.as_ref().map(|a| a.sender_stats.snapshot())
    }

    /// Bound address of the session socket.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.active.as_ref().map(|a| a.local_addr)
    }

    /// Resolved destination of the current session.
    pub fn target_addr(&self) -> Option<SocketAddr> {
        self.active.as_ref().map(|a| a.target)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

impl Default for VideoSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Drop for VideoSession {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.signal_stop();
        }
    }
}

/// Resolve `host:port`, preferring an address of the socket's family.
async fn resolve(host: &str, port: u16, local: SocketAddr) -> Result<SocketAddr, PeercamError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| PeercamError::Resolve(format!("{host}:{port}: {e}")))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4() == local.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| PeercamError::Resolve(format!("{host}:{port}: no addresses")))
}

// ── Tests ────────────────────────────────────────────────────────
