//! Configuration for a peercam node.

use std::path::Path;

use serde::{Deserialize, Serialize};

use peercam_core::{PeercamError, Rotation, SessionConfig};

/// Largest accepted capture width or height.
pub const MAX_CAPTURE_DIM: u32 = 4096;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Addressing of this node and its peer.
    pub network: NetworkConfig,
    /// Synthetic capture source settings.
    pub capture: CaptureConfig,
    /// Encoding, framing and presentation tunables.
    pub stream: StreamConfig,
    /// Where received frames end up.
    pub display: DisplayConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Local UDP address to bind; port 0 picks an ephemeral one.
    pub bind: String,
    /// Peer host name or IP.
    pub target_host: String,
    /// Peer UDP port.
    pub target_port: u16,
}

/// Capture source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub width: u32,
    pub height: u32,
    /// Frames per second pushed into the session.
    pub fps: u32,
}

/// Stream tunables, mirrored into [`SessionConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// JPEG quality (1..=100).
    pub jpeg_quality: u8,
    /// Datagrams of this size or larger are dropped before sending.
    pub max_datagram_bytes: usize,
    /// Stats reporting window in milliseconds.
    pub stats_interval_ms: u64,
    /// "none", "cw90", "180" or "ccw90".
    pub rotation: Rotation,
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Write the latest received frame here as a JPEG. Empty disables it.
    pub snapshot_path: String,
    /// JPEG quality of the snapshot file (1..=100).
    pub snapshot_quality: u8,
    /// Log every Nth presented frame.
    pub log_every: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:12345".into(),
            target_host: "127.0.0.1".into(),
            target_port: 12345,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 15,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            jpeg_quality: session.jpeg_quality,
            max_datagram_bytes: session.max_datagram_bytes,
            stats_interval_ms: session.stats_interval_ms,
            rotation: session.rotation,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            snapshot_path: String::new(),
            snapshot_quality: 85,
            log_every: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Default configuration as pretty TOML.
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&Self::default())
    }

    /// Apply `--target host:port`. The port is taken from the last colon
    /// so bracketed IPv6 literals keep theirs.
    pub fn set_target(&mut self, target: &str) -> Result<(), PeercamError> {
        let (host, port) = target
            .rsplit_once(':')
            .ok_or_else(|| PeercamError::InvalidConfig(format!("target {target:?}: expected host:port")))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| PeercamError::InvalidConfig(format!("target {target:?}: {e}")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(PeercamError::InvalidConfig(format!("target {target:?}: empty host")));
        }
        self.network.target_host = host.to_string();
        self.network.target_port = port;
        Ok(())
    }

    /// Build the session settings; the result is validated.
    pub fn to_session_config(&self) -> Result<SessionConfig, PeercamError> {
        let session = SessionConfig {
            bind_addr: self.network.bind.clone(),
            jpeg_quality: self.stream.jpeg_quality,
            max_datagram_bytes: self.stream.max_datagram_bytes,
            stats_interval_ms: self.stream.stats_interval_ms,
            rotation: self.stream.rotation,
        };
        session.validate()?;
        Ok(session)
    }

    pub fn validate(&self) -> Result<(), PeercamError> {
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(PeercamError::InvalidConfig(format!(
                "capture size {}x{} is empty",
                self.capture.width, self.capture.height
            )));
        }
        if self.capture.width > MAX_CAPTURE_DIM || self.capture.height > MAX_CAPTURE_DIM {
            return Err(PeercamError::InvalidConfig(format!(
                "capture size {}x{} exceeds {MAX_CAPTURE_DIM}x{MAX_CAPTURE_DIM}",
                self.capture.width, self.capture.height
            )));
        }
        if !(1..=100).contains(&self.display.snapshot_quality) {
            return Err(PeercamError::InvalidConfig(format!(
                "snapshot_quality must be 1..=100, got {}",
                self.display.snapshot_quality
            )));
        }
        if !(1..=60).contains(&self.capture.fps) {
            return Err(PeercamError::InvalidConfig(format!(
                "capture fps must be 1..=60, got {}",
                self.capture.fps
            )));
        }
        self.to_session_config().map(|_| ())
    }
}

// ── Tests ────────────────────────────────────────────────────────
