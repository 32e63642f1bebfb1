// SPDX-License-Identifier: GPL-3.0-only

//! Single-slot frame mailbox
//!
//! At most one unconsumed frame exists at a time: one writer (the capture
//! worker), one reader (the presentation consumer). The producer publishes
//! write-then-flag; the reader checks-then-clears. When the reader has not
//! drained the slot yet, the producer drops the newest frame instead of
//! blocking or overwriting - acceptable because preview frames tolerate
//! staleness and every write fully replaces the slot content.

use crate::device::SensorFormat;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// A transformed preview-sized frame
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    pub format: SensorFormat,
    /// Device sequence number of the source frame
    pub sequence: u32,
    pub data: Vec<u8>,
}

/// Writer/reader counters, exposed for diagnostics and the mailbox
/// invariant checks in tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotStats {
    pub published: u64,
    pub consumed: u64,
    pub dropped: u64,
}

/// Capacity-1 handoff channel with a drop-newest backpressure policy
#[derive(Debug)]
pub struct FrameSlot {
    slot: Mutex<Option<PreviewFrame>>,
    ready: AtomicBool,
    published: AtomicU64,
    consumed: AtomicU64,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            ready: AtomicBool::new(false),
            published: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// True while a published frame has not been consumed yet.
    ///
    /// The producer checks this before running the transform, so a busy
    /// consumer costs the producer nothing but the dequeue.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Record a frame dropped under backpressure (transform skipped)
    pub fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Publish a frame. Returns false, dropping the frame, if the previous
    /// one has not been consumed. The slot content is fully written before
    /// the ready flag is raised.
    pub fn publish(&self, frame: PreviewFrame) -> bool {
        if self.ready.load(Ordering::Acquire) {
            self.record_drop();
            return false;
        }
        match self.slot.lock() {
            Ok(mut guard) => *guard = Some(frame),
            Err(_) => return false,
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
        true
    }

    /// Take the pending frame, clearing readiness. Returns None when no
    /// frame is pending - an idempotent no-op for the poller.
    pub fn take(&self) -> Option<PreviewFrame> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        let frame = self.slot.lock().ok()?.take();
        self.ready.store(false, Ordering::Release);
        if frame.is_some() {
            self.consumed.fetch_add(1, Ordering::Relaxed);
        }
        frame
    }

    /// Discard any pending frame (used when the stream stops)
    pub fn clear(&self) {
        let _ = self.take();
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            published: self.published.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}
