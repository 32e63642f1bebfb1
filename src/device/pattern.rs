// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic test-pattern frame source
//!
//! Stands in for capture hardware during development and in tests. Unlike
//! the V4L2 backend, where the driver tracks buffer ownership, this source
//! models the capture-buffer ring explicitly: each buffer is owned either
//! by the device (queued) or by the client (dequeued), never both, and
//! must be re-queued exactly once per dequeue.

use super::{FormatRequest, FrameInfo, NegotiatedFormat, SensorFormat};
use crate::errors::{CameraError, CameraResult};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferOwner {
    /// Queued: awaiting sensor data
    Device,
    /// Dequeued: being read by the client
    Client,
}

#[derive(Debug)]
struct CaptureBuffer {
    data: Vec<u8>,
    owner: BufferOwner,
}

/// Frame source producing a moving gradient pattern
#[derive(Debug)]
pub struct PatternSource {
    format: NegotiatedFormat,
    buffers: Vec<CaptureBuffer>,
    next_dequeue: usize,
    sequence: u32,
}

impl PatternSource {
    /// Open the source and queue `buffer_count` buffers.
    ///
    /// The pattern generator renders RGB565 and RGB24 natively; a YUYV
    /// request silently falls back to RGB565, mirroring real devices that
    /// substitute a default format. Callers must read the negotiated format
    /// from the returned source.
    pub fn open(request: &FormatRequest, buffer_count: u32) -> CameraResult<Self> {
        if request.width == 0 || request.height == 0 {
            return Err(CameraError::Configuration(
                "pattern size must be non-zero".to_string(),
            ));
        }
        if buffer_count == 0 {
            return Err(CameraError::Configuration(
                "buffer count must be non-zero".to_string(),
            ));
        }

        let format = match request.format {
            SensorFormat::Rgb565 | SensorFormat::Rgb24 => request.format,
            SensorFormat::Yuyv => {
                debug!("pattern source does not render YUYV, falling back to RGB565");
                SensorFormat::Rgb565
            }
        };
        let negotiated = NegotiatedFormat {
            width: request.width,
            height: request.height,
            format,
        };

        let buffers = (0..buffer_count)
            .map(|_| CaptureBuffer {
                data: vec![0u8; negotiated.frame_size()],
                owner: BufferOwner::Device,
            })
            .collect();

        debug!(format = %negotiated, buffer_count, "Pattern source opened");

        Ok(Self {
            format: negotiated,
            buffers,
            next_dequeue: 0,
            sequence: 0,
        })
    }

    pub fn negotiated(&self) -> NegotiatedFormat {
        self.format
    }

    /// Dequeue the next filled buffer. Ownership passes to the client until
    /// the buffer is re-queued.
    pub fn dequeue(&mut self) -> CameraResult<(usize, FrameInfo)> {
        let index = self.next_dequeue;
        let count = self.buffers.len();
        let buffer = &mut self.buffers[index];
        if buffer.owner == BufferOwner::Client {
            return Err(CameraError::State(format!(
                "buffer {} already dequeued",
                index
            )));
        }

        let sequence = self.sequence;
        render_pattern(&mut buffer.data, self.format, sequence);
        buffer.owner = BufferOwner::Client;
        self.sequence = self.sequence.wrapping_add(1);
        self.next_dequeue = (index + 1) % count;

        Ok((
            index,
            FrameInfo {
                sequence,
                bytes_used: self.format.frame_size(),
            },
        ))
    }

    /// Read access to a dequeued buffer
    pub fn buffer(&self, index: usize) -> CameraResult<&[u8]> {
        let buffer = self
            .buffers
            .get(index)
            .ok_or_else(|| CameraError::Configuration(format!("no buffer {}", index)))?;
        if buffer.owner != BufferOwner::Client {
            return Err(CameraError::State(format!(
                "buffer {} is not dequeued",
                index
            )));
        }
        Ok(&buffer.data)
    }

    /// Return a buffer to the device. Fails if the buffer is not currently
    /// client-owned, so double requeue is caught.
    pub fn requeue(&mut self, index: usize) -> CameraResult<()> {
        let buffer = self
            .buffers
            .get_mut(index)
            .ok_or_else(|| CameraError::Configuration(format!("no buffer {}", index)))?;
        if buffer.owner != BufferOwner::Client {
            return Err(CameraError::State(format!(
                "buffer {} is not owned by the client",
                index
            )));
        }
        buffer.owner = BufferOwner::Device;
        Ok(())
    }

    /// Dequeue, copy the frame into `dst`, and requeue - the full
    /// per-iteration buffer contract in one step.
    pub fn grab_into(&mut self, dst: &mut Vec<u8>) -> CameraResult<FrameInfo> {
        let (index, info) = self.dequeue()?;
        dst.clear();
        dst.extend_from_slice(self.buffer(index)?);
        self.requeue(index)?;
        Ok(info)
    }
}

/// Render a gradient with a moving vertical bar so consecutive frames differ
fn render_pattern(dst: &mut [u8], format: NegotiatedFormat, sequence: u32) {
    let width = format.width as usize;
    let height = format.height as usize;
    let bar = (sequence as usize * 4) % width.max(1);

    match format.format {
        SensorFormat::Rgb565 => {
            for y in 0..height {
                for x in 0..width {
                    let r5 = ((x * 31) / width.max(1)) as u16;
                    let g6 = ((y * 63) / height.max(1)) as u16;
                    let b5 = if x == bar { 31 } else { 0 };
                    let pixel = (r5 << 11) | (g6 << 5) | b5;
                    let offset = (y * width + x) * 2;
                    dst[offset..offset + 2].copy_from_slice(&pixel.to_le_bytes());
                }
            }
        }
        SensorFormat::Rgb24 => {
            for y in 0..height {
                for x in 0..width {
                    let offset = (y * width + x) * 3;
                    dst[offset] = ((x * 255) / width.max(1)) as u8;
                    dst[offset + 1] = ((y * 255) / height.max(1)) as u8;
                    dst[offset + 2] = if x == bar { 255 } else { 0 };
                }
            }
        }
        SensorFormat::Yuyv => unreachable!("pattern source never negotiates YUYV"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> FormatRequest {
        FormatRequest {
            width: 16,
            height: 8,
            format: SensorFormat::Rgb565,
        }
    }

    #[test]
    fn test_yuyv_request_falls_back() {
        let source = PatternSource::open(
            &FormatRequest {
                format: SensorFormat::Yuyv,
                ..request()
            },
            2,
        )
        .expect("open");
        assert_eq!(source.negotiated().format, SensorFormat::Rgb565);
    }

    #[test]
    fn test_dequeue_requeue_cycle() {
        let mut source = PatternSource::open(&request(), 2).expect("open");
        let (index, info) = source.dequeue().expect("dequeue");
        assert_eq!(info.bytes_used, 16 * 8 * 2);
        assert_eq!(source.buffer(index).expect("buffer").len(), 16 * 8 * 2);
        source.requeue(index).expect("requeue");
    }

    #[test]
    fn test_double_requeue_rejected() {
        let mut source = PatternSource::open(&request(), 2).expect("open");
        let (index, _) = source.dequeue().expect("dequeue");
        source.requeue(index).expect("first requeue");
        assert!(matches!(
            source.requeue(index),
            Err(CameraError::State(_))
        ));
    }

    #[test]
    fn test_buffer_unreadable_after_requeue() {
        let mut source = PatternSource::open(&request(), 2).expect("open");
        let (index, _) = source.dequeue().expect("dequeue");
        source.requeue(index).expect("requeue");
        assert!(source.buffer(index).is_err());
    }

    #[test]
    fn test_exhausting_ring_without_requeue_fails() {
        let mut source = PatternSource::open(&request(), 2).expect("open");
        source.dequeue().expect("first");
        source.dequeue().expect("second");
        // All buffers are client-owned now; the ring has nothing queued.
        assert!(matches!(source.dequeue(), Err(CameraError::State(_))));
    }

    #[test]
    fn test_consecutive_frames_differ() {
        let mut source = PatternSource::open(&request(), 2).expect("open");
        let mut first = Vec::new();
        let mut second = Vec::new();
        let a = source.grab_into(&mut first).expect("grab");
        let b = source.grab_into(&mut second).expect("grab");
        assert_eq!(b.sequence, a.sequence + 1);
        assert_ne!(first, second);
    }
}
