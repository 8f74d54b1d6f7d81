//! # peercam: two-way UDP video node
//!
//! Streams a camera feed to one peer over UDP and presents the peer's
//! feed, using the `peercam-core` session. The camera is a synthetic
//! test pattern; the display is a log line plus an optional JPEG
//! snapshot on disk.
//!
//! | Module     | Purpose                                     |
//! |------------|---------------------------------------------|
//! | `config`   | TOML node configuration and CLI overrides   |
//! | `pattern`  | Moving YUV 4:2:0 test-pattern source        |
//! | `snapshot` | Display sink writing the latest frame       |
//! | `node`     | Session wiring and run loop                 |

pub mod config;
pub mod node;
pub mod pattern;
pub mod snapshot;
