//! Display-sink boundary and the hand-off onto its execution context.
//!
//! Decoding and rotation run on the receive loop. Presenting is the one
//! cross-context hop in the pipeline: [`SinkDispatcher`] publishes each
//! decoded frame into a latest-value slot and a dedicated display task,
//! which exclusively owns the sink, calls [`DisplaySink::present`]. If the
//! sink is slower than the network, it sees only the newest frame.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::media::types::DisplayFrame;

// ── DisplaySink ──────────────────────────────────────────────────

/// Anything that can show a decoded frame.
///
/// Called only from the display task, one frame at a time.
pub trait DisplaySink: Send + 'static {
    fn present(&mut self, frame: &DisplayFrame);
}

impl<F> DisplaySink for F
where
    F: FnMut(&DisplayFrame) + Send + 'static,
{
    fn present(&mut self, frame: &DisplayFrame) {
        self(frame)
    }
}

// ── SinkDispatcher ───────────────────────────────────────────────

/// Receive-side handle that marshals frames to the display task.
pub struct SinkDispatcher {
    tx: watch::Sender<Option<Arc<DisplayFrame>>>,
}

impl SinkDispatcher {
    /// Spawn the display task owning `sink`. The task ends when `cancel`
    /// fires or the dispatcher is dropped.
    pub fn spawn(mut sink: Box<dyn DisplaySink>, cancel: CancellationToken) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = watch::channel::<Option<Arc<DisplayFrame>>>(None);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let frame = rx.borrow_and_update().clone();
                if let Some(frame) = frame {
                    sink.present(&frame);
                }
            }
            debug!("display task stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue `frame` for presentation, replacing any frame the display
    /// task has not picked up yet.
    pub fn dispatch(&self, frame: DisplayFrame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }
}

// ── MemorySink ───────────────────────────────────────────────────

/// Sink that records presented frames; clones share storage.
///
/// Built for tests and inspection. [`MemorySink::new`] keeps every frame;
/// use [`MemorySink::bounded`] for anything long-running.
#[derive(Clone, Default)]
pub struct MemorySink {
    frames: Arc<Mutex<VecDeque<DisplayFrame>>>,
    limit: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only the newest `limit` frames (at least one).
    pub fn bounded(limit: usize) -> Self {
        Self {
            frames: Arc::default(),
            limit: Some(limit.max(1)),
        }
    }

    /// Number of frames currently retained.
    pub fn len(&self) -> usize {
        self.frames.lock().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The frame currently on screen.
    pub fn last(&self) -> Option<DisplayFrame> {
        self.frames.lock().ok().and_then(|f| f.back().cloned())
    }

    /// Sequence numbers of the retained frames, in presentation order.
    pub fn sequences(&self) -> Vec<u32> {
        self.frames
            .lock()
            .map(|f| f.iter().map(|fr| fr.sequence).collect())
            .unwrap_or_default()
    }
}

impl DisplaySink for MemorySink {
    fn present(&mut self, frame: &DisplayFrame) {
        if let Ok(mut frames) = self.frames.lock() {
            if let Some(limit) = self.limit {
                while frames.len() >= limit {
                    frames.pop_front();
                }
            }
            frames.push_back(frame.clone());
        }
    }
}

// ── LogSink ──────────────────────────────────────────────────────

/// Headless sink: logs every `every`-th frame it is given.
pub struct LogSink {
    every: u64,
    presented: u64,
}

impl LogSink {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            presented: 0,
        }
    }
}

impl DisplaySink for LogSink {
    fn present(&mut self, frame: &DisplayFrame) {
        self.presented += 1;
        if self.presented % self.every == 0 {
            info!(
                seq = frame.sequence,
                width = frame.width(),
                height = frame.height(),
                presented = self.presented,
                "frame presented"
            );
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::time::Duration;

    fn frame(seq: u32) -> DisplayFrame {
        DisplayFrame {
            sequence: seq,
            capture_timestamp_ms: 0,
            image: RgbImage::new(4, 2),
        }
    }

    async fn wait_for(sink: &MemorySink, n: usize) {
        for _ in 0..200 {
            if sink.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("sink saw {} frames, wanted {n}", sink.len());
    }

    #[tokio::test]
    async fn dispatched_frame_reaches_sink() {
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();
        let (dispatcher, handle) = SinkDispatcher::spawn(Box::new(sink.clone()), cancel.clone());

        dispatcher.dispatch(frame(7));
        wait_for(&sink, 1).await;
        assert_eq!(sink.last().unwrap().sequence, 7);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn closure_sink_and_shutdown_on_drop() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = move |f: &DisplayFrame| seen_clone.lock().unwrap().push(f.sequence);

        let (dispatcher, handle) = SinkDispatcher::spawn(Box::new(sink), CancellationToken::new());
        dispatcher.dispatch(frame(1));
        for _ in 0..200 {
            if !seen.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        drop(dispatcher);
        handle.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn slow_sink_only_sees_latest() {
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();
        let (dispatcher, handle) = SinkDispatcher::spawn(Box::new(sink.clone()), cancel.clone());

        // No await between dispatches: the display task cannot run.
        for seq in 0..5 {
            dispatcher.dispatch(frame(seq));
        }
        wait_for(&sink, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(sink.sequences(), vec![4]);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn bounded_sink_keeps_newest() {
        let sink = MemorySink::bounded(3);
        let mut presenter = sink.clone();
        for seq in 0..10 {
            presenter.present(&frame(seq));
        }
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.sequences(), vec![7, 8, 9]);
        assert_eq!(sink.last().unwrap().sequence, 9);

        let mut unbounded = MemorySink::new();
        for seq in 0..10 {
            unbounded.present(&frame(seq));
        }
        assert_eq!(unbounded.len(), 10);
    }
}
