// SPDX-License-Identifier: GPL-3.0-only

//! Subsystem-wide constants

use std::time::Duration;

/// Default capture device node
pub const DEFAULT_DEVICE_PATH: &str = "/dev/video0";

/// Number of memory-mapped capture buffers requested from the device.
/// Two is enough for continuous capture: one queued for the sensor while
/// the other is being read out.
pub const CAPTURE_BUFFER_COUNT: u32 = 2;

/// Default full-resolution capture size
pub const DEFAULT_CAPTURE_WIDTH: u32 = 640;
pub const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

/// Default preview (presentation) size
pub const DEFAULT_PREVIEW_WIDTH: u32 = 360;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 270;

/// Rate cap for the capture loop, bounding producer-core utilization
pub const DEFAULT_CAPTURE_RATE_HZ: u32 = 15;

/// Digital zoom range, in percent (100 = 1.0x, 400 = 4.0x)
pub const ZOOM_MIN_PERCENT: u32 = 100;
pub const ZOOM_MAX_PERCENT: u32 = 400;

/// Delay before retrying after a failed dequeue
pub const DEQUEUE_RETRY_DELAY: Duration = Duration::from_millis(50);

/// How long start_stream() waits for the capture worker to confirm its
/// frame source is open
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(2);

/// How long stop_stream() waits for the capture worker to confirm exit
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(1);

/// Polling interval while waiting for the capture worker to exit
pub const STOP_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long a still-capture request waits for the next produced frame
pub const DEFAULT_STILL_TIMEOUT: Duration = Duration::from_secs(1);

/// BMP container layout
pub const BMP_FILE_HEADER_SIZE: usize = 14;
pub const BMP_INFO_HEADER_SIZE: usize = 40;
pub const BMP_PIXEL_DATA_OFFSET: u32 = (BMP_FILE_HEADER_SIZE + BMP_INFO_HEADER_SIZE) as u32;
pub const BMP_BITS_PER_PIXEL: u16 = 24;
