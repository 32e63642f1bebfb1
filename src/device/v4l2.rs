// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 frame source
//!
//! Drives real capture hardware through the `v4l` crate. The device and its
//! memory-mapped stream live on the capture worker's own thread for the
//! whole session; the stream re-queues each buffer exactly once per dequeue
//! and unmaps everything when dropped.

use super::{FormatRequest, FrameInfo, NegotiatedFormat, SensorFormat};
use crate::capture::{self, CaptureParams, CaptureShared, StartSignal};
use crate::errors::{CameraError, CameraResult};
use std::sync::Arc;
use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, Format, FourCC};

/// Device identity from VIDIOC_QUERYCAP
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    pub card: String,
    pub driver: String,
}

/// Open the device node and query its identity
pub fn probe(path: &str) -> CameraResult<DeviceCaps> {
    let dev = Device::with_path(path)
        .map_err(|e| CameraError::Device(format!("failed to open {}: {}", path, e)))?;
    let caps = dev
        .query_caps()
        .map_err(|e| CameraError::Device(format!("failed to query capabilities: {}", e)))?;
    Ok(DeviceCaps {
        card: caps.card,
        driver: caps.driver,
    })
}

/// Request a format and return what the device actually configured.
///
/// V4L2 drivers silently substitute the nearest supported format, so the
/// returned value, never the request, is authoritative for buffer sizing.
fn negotiate(dev: &Device, request: &FormatRequest) -> CameraResult<NegotiatedFormat> {
    let wanted = Format::new(
        request.width,
        request.height,
        FourCC::new(request.format.fourcc()),
    );
    let actual = dev
        .set_format(&wanted)
        .map_err(|e| CameraError::Device(format!("failed to set format: {}", e)))?;

    let format = [SensorFormat::Rgb565, SensorFormat::Rgb24, SensorFormat::Yuyv]
        .into_iter()
        .find(|f| actual.fourcc == FourCC::new(f.fourcc()))
        .ok_or_else(|| {
            CameraError::Device(format!(
                "device negotiated unsupported pixel format {:?}",
                actual.fourcc
            ))
        })?;

    if actual.width != request.width || actual.height != request.height || format != request.format
    {
        warn!(
            requested_width = request.width,
            requested_height = request.height,
            requested_format = %request.format,
            actual_width = actual.width,
            actual_height = actual.height,
            actual_format = %format,
            "Device fell back from the requested format"
        );
    }

    Ok(NegotiatedFormat {
        width: actual.width,
        height: actual.height,
        format,
    })
}

/// Open and negotiate once, without streaming. Used at init to validate the
/// device and cache the actual format.
pub fn open_and_negotiate(path: &str, request: &FormatRequest) -> CameraResult<NegotiatedFormat> {
    let dev = Device::with_path(path)
        .map_err(|e| CameraError::Device(format!("failed to open {}: {}", path, e)))?;
    negotiate(&dev, request)
}

/// Run a full capture session: open, negotiate, map buffers, signal
/// readiness, and hand the dequeue closure to the shared capture loop.
/// Returns when a stop is requested; a setup failure is returned before
/// the signal fires, so the spawning side sees it.
///
/// The dequeue wait inside `stream.next()` follows the driver's own blocking
/// discipline; there is no per-dequeue timer. A wedged driver shows up as a
/// stop-handshake stall, not as a dequeue error.
pub fn run_session(
    path: String,
    request: FormatRequest,
    buffer_count: u32,
    shared: Arc<CaptureShared>,
    params: CaptureParams,
    signal: StartSignal,
) -> CameraResult<()> {
    let dev = Device::with_path(&path)
        .map_err(|e| CameraError::Device(format!("failed to open {}: {}", path, e)))?;
    let negotiated = negotiate(&dev, &request)?;

    info!(device = %path, format = %negotiated, buffer_count, "V4L2 capture session starting");

    let mut stream = Stream::with_buffers(&dev, Type::VideoCapture, buffer_count)
        .map_err(|e| CameraError::Device(format!("failed to map capture buffers: {}", e)))?;
    signal.ready();

    capture::run_loop(&shared, negotiated, &params, |dst| {
        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::Device(format!("dequeue failed: {}", e)))?;
        dst.clear();
        dst.extend_from_slice(buf);
        Ok(FrameInfo {
            sequence: meta.sequence,
            bytes_used: meta.bytesused as usize,
        })
    });

    info!(device = %path, "V4L2 capture session ended");
    Ok(())
}
