// SPDX-License-Identifier: GPL-3.0-only

//! Presentation-side frame consumption
//!
//! The consumer polls the mailbox on the caller's schedule, copies each
//! pending frame into its own presentation buffer, and notifies the display
//! integration. Polling with nothing pending is an idempotent no-op, so the
//! caller may poll as fast as it likes.

use crate::handoff::FrameSlot;
use std::sync::Arc;
use tracing::trace;

/// Display integration point. Implementations mark their output as needing
/// a redraw; the actual drawing happens on the display's own schedule.
pub trait PresentationSurface: Send + Sync {
    fn invalidate(&self);
}

/// Receives each presented frame. The data slice is only valid for the
/// duration of the call.
pub trait FrameSink: Send {
    fn on_frame(&mut self, width: u32, height: u32, data: &[u8]);
}

/// Sink that discards frames, for headless operation
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn on_frame(&mut self, _width: u32, _height: u32, _data: &[u8]) {}
}

/// Polling consumer that drains the frame mailbox into a presentation buffer
pub struct PresentationConsumer {
    slot: Arc<FrameSlot>,
    surface: Arc<dyn PresentationSurface>,
    sink: Box<dyn FrameSink>,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    frames_presented: u64,
}

impl PresentationConsumer {
    pub fn new(
        slot: Arc<FrameSlot>,
        surface: Arc<dyn PresentationSurface>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            slot,
            surface,
            sink,
            width: 0,
            height: 0,
            buffer: Vec::new(),
            frames_presented: 0,
        }
    }

    /// Present the pending frame, if any. Returns true when a new frame was
    /// presented; false leaves the presentation buffer untouched.
    pub fn poll(&mut self) -> bool {
        let Some(frame) = self.slot.take() else {
            return false;
        };

        self.width = frame.width;
        self.height = frame.height;
        self.buffer.clear();
        self.buffer.extend_from_slice(&frame.data);

        self.sink.on_frame(self.width, self.height, &self.buffer);
        self.surface.invalidate();
        self.frames_presented += 1;
        trace!(sequence = frame.sequence, "Frame presented");
        true
    }

    /// The most recently presented frame's pixels
    pub fn presentation_buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SensorFormat;
    use crate::handoff::PreviewFrame;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingSurface {
        invalidations: AtomicU64,
    }

    impl PresentationSurface for CountingSurface {
        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn frame(sequence: u32, fill: u8) -> PreviewFrame {
        PreviewFrame {
            width: 4,
            height: 2,
            format: SensorFormat::Rgb565,
            sequence,
            data: vec![fill; 16],
        }
    }

    #[test]
    fn test_poll_presents_pending_frame() {
        let slot = Arc::new(FrameSlot::new());
        let surface = Arc::new(CountingSurface {
            invalidations: AtomicU64::new(0),
        });
        let mut consumer = PresentationConsumer::new(
            Arc::clone(&slot),
            Arc::clone(&surface) as Arc<dyn PresentationSurface>,
            Box::new(NullSink),
        );

        slot.publish(frame(1, 0xAB));
        assert!(consumer.poll());
        assert_eq!(consumer.dimensions(), (4, 2));
        assert_eq!(consumer.presentation_buffer(), &[0xAB; 16]);
        assert_eq!(surface.invalidations.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_second_poll_is_a_no_op() {
        let slot = Arc::new(FrameSlot::new());
        let surface = Arc::new(CountingSurface {
            invalidations: AtomicU64::new(0),
        });
        let mut consumer = PresentationConsumer::new(
            Arc::clone(&slot),
            Arc::clone(&surface) as Arc<dyn PresentationSurface>,
            Box::new(NullSink),
        );

        slot.publish(frame(1, 0x5A));
        assert!(consumer.poll());
        let checksum: u64 = consumer
            .presentation_buffer()
            .iter()
            .map(|&b| b as u64)
            .sum();

        assert!(!consumer.poll(), "no pending frame, poll must be a no-op");
        let after: u64 = consumer
            .presentation_buffer()
            .iter()
            .map(|&b| b as u64)
            .sum();
        assert_eq!(checksum, after, "buffer must be untouched by an empty poll");
        assert_eq!(consumer.frames_presented(), 1);
        assert_eq!(surface.invalidations.load(Ordering::Relaxed), 1);
    }
}
