//! # media: capture → encode → transmit / receive → decode → present
//!
//! ```text
//!  SENDER                                   RECEIVER
//! ┌──────────────────────────┐             ┌────────────────────────────┐
//! │ CaptureFeed (latest only)│             │ FrameReceiver              │
//! │   ↓                      │   UDP       │   ↓ header + stats window  │
//! │ FrameEncoder (NV21→JPEG) │ ──────────► │ FrameDecoder (JPEG, rotate)│
//! │   ↓                      │ 1 frame =   │   ↓                        │
//! │ FrameSender (hdr + seq)  │ 1 datagram  │ SinkDispatcher → sink      │
//! └──────────────────────────┘             └────────────────────────────┘
//! ```
//!
//! Both directions share one socket and are started and stopped together
//! by [`VideoSession`].
//!
//! | Module     | Purpose                                            |
//! |------------|----------------------------------------------------|
//! | `types`    | Planar capture sample and decoded display frame    |
//! | `capture`  | Single-slot capture feed                           |
//! | `encoder`  | YUV 4:2:0 → NV21 → JPEG                            |
//! | `sender`   | Header framing, sequence counter, size policy      |
//! | `stats`    | Loss / latency / fps windows, sender counters      |
//! | `receiver` | Receive loop and per-datagram processing           |
//! | `decoder`  | JPEG decode and orientation correction             |
//! | `sink`     | Display-sink trait and hand-off to its context     |
//! | `session`  | Start / stop lifecycle                             |

pub mod capture;
pub mod decoder;
pub mod encoder;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod sink;
pub mod stats;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────

pub use capture::CaptureFeed;
pub use decoder::{FrameDecoder, Rotation};
pub use encoder::FrameEncoder;
pub use receiver::{DatagramOutcome, FrameReceiver};
pub use sender::{FrameSender, SendOutcome, SenderTask};
pub use session::{SessionConfig, VideoSession};
pub use sink::{DisplaySink, LogSink, MemorySink, SinkDispatcher};
pub use stats::{SenderStats, SenderStatsSnapshot, StatsAggregator, StatsSnapshot};
pub use types::{DisplayFrame, YuvFrame};
