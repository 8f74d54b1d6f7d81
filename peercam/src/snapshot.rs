//! File-backed display sink.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, warn};

use peercam_core::{DisplayFrame, DisplaySink, PeercamError};

/// Keeps the latest presented frame on disk as a JPEG.
///
/// Each frame is written to a sibling `.tmp` file and renamed over the
/// target, so readers never see a half-written image.
pub struct SnapshotSink {
    path: PathBuf,
    tmp: PathBuf,
    quality: u8,
    written: u64,
}

impl SnapshotSink {
    pub fn new(path: impl Into<PathBuf>, quality: u8) -> Self {
        let path = path.into();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            path,
            tmp: tmp.into(),
            quality: quality.clamp(1, 100),
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn write(&self, frame: &DisplayFrame) -> Result<(), PeercamError> {
        let mut out = BufWriter::new(File::create(&self.tmp)?);
        let encoder = JpegEncoder::new_with_quality(&mut out, self.quality);
        frame
            .image
            .write_with_encoder(encoder)
            .map_err(|e| PeercamError::Encode(e.to_string()))?;
        out.flush()?;
        std::fs::rename(&self.tmp, &self.path)?;
        Ok(())
    }
}

impl DisplaySink for SnapshotSink {
    fn present(&mut self, frame: &DisplayFrame) {
        match self.write(frame) {
            Ok(()) => {
                self.written += 1;
                debug!(seq = frame.sequence, path = %self.path.display(), "snapshot written");
            }
            Err(e) => warn!(seq = frame.sequence, error = %e, "snapshot write failed"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
