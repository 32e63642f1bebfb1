// SPDX-License-Identifier: GPL-3.0-only

//! Capture device abstraction
//!
//! Two frame sources share the negotiation types here: the V4L2 backend
//! driving real hardware, and a synthetic pattern source for development
//! and tests.

pub mod pattern;
pub mod v4l2;

use std::fmt;

/// Stream lifecycle state, driven only through the subsystem API
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Uninitialized,
    Initialized,
    Streaming,
    /// Stop requested; terminal until the capture worker confirms exit,
    /// after which state returns to Initialized
    Stopping,
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Uninitialized => write!(f, "uninitialized"),
            StreamState::Initialized => write!(f, "initialized"),
            StreamState::Streaming => write!(f, "streaming"),
            StreamState::Stopping => write!(f, "stopping"),
        }
    }
}

/// Sensor pixel formats the subsystem understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SensorFormat {
    /// 16-bit RGB, little-endian, 5-6-5 channel packing
    Rgb565,
    /// 24-bit RGB, one byte per channel
    Rgb24,
    /// Packed YUV 4:2:2 (Y0 U Y1 V)
    Yuyv,
}

impl SensorFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            SensorFormat::Rgb565 => 2,
            SensorFormat::Rgb24 => 3,
            SensorFormat::Yuyv => 2,
        }
    }

    /// V4L2 FourCC code for this format
    pub fn fourcc(self) -> &'static [u8; 4] {
        match self {
            SensorFormat::Rgb565 => b"RGBP",
            SensorFormat::Rgb24 => b"RGB3",
            SensorFormat::Yuyv => b"YUYV",
        }
    }

    /// Map a negotiated FourCC back to a sensor format
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGBP" => Some(SensorFormat::Rgb565),
            b"RGB3" => Some(SensorFormat::Rgb24),
            b"YUYV" => Some(SensorFormat::Yuyv),
            _ => None,
        }
    }
}

impl fmt::Display for SensorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorFormat::Rgb565 => write!(f, "RGB565"),
            SensorFormat::Rgb24 => write!(f, "RGB24"),
            SensorFormat::Yuyv => write!(f, "YUYV"),
        }
    }
}

/// Format requested from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRequest {
    pub width: u32,
    pub height: u32,
    pub format: SensorFormat,
}

/// Format actually configured by the device. The device may silently fall
/// back from the request, so callers use this, never the request, for
/// buffer sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub width: u32,
    pub height: u32,
    pub format: SensorFormat,
}

impl NegotiatedFormat {
    /// Size of one full frame in bytes
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

impl fmt::Display for NegotiatedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.format)
    }
}

/// Per-frame metadata returned by a dequeue
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Device frame counter
    pub sequence: u32,
    /// Bytes of valid pixel data in the dequeued buffer
    pub bytes_used: usize,
}
