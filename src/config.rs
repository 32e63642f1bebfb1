// SPDX-License-Identifier: GPL-3.0-only

//! Camera subsystem configuration

use crate::constants;
use crate::device::{FormatRequest, SensorFormat};
use crate::errors::{CameraError, CameraResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Which frame source the subsystem drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceKind {
    /// Real capture hardware through V4L2
    #[default]
    V4l2,
    /// Synthetic test-pattern source (no hardware required)
    Pattern,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Frame source to use
    pub source: SourceKind,
    /// Capture device node (V4L2 source only)
    pub device_path: String,
    /// Requested full-resolution capture size. The device may fall back to
    /// a different size; the actual format is re-read after negotiation.
    pub capture_width: u32,
    pub capture_height: u32,
    /// Requested sensor pixel format
    pub pixel_format: SensorFormat,
    /// Preview output size produced by the zoom/crop transform
    pub preview_width: u32,
    pub preview_height: u32,
    /// Rate cap for the capture loop (frames per second)
    pub capture_rate_hz: u32,
    /// Number of capture buffers to request and map
    pub buffer_count: u32,
    /// How long stop_stream() waits for the capture worker, in milliseconds
    pub stop_timeout_ms: u64,
    /// How long a still capture waits for the next frame, in milliseconds
    pub still_timeout_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::V4l2,
            device_path: constants::DEFAULT_DEVICE_PATH.to_string(),
            capture_width: constants::DEFAULT_CAPTURE_WIDTH,
            capture_height: constants::DEFAULT_CAPTURE_HEIGHT,
            pixel_format: SensorFormat::Yuyv,
            preview_width: constants::DEFAULT_PREVIEW_WIDTH,
            preview_height: constants::DEFAULT_PREVIEW_HEIGHT,
            capture_rate_hz: constants::DEFAULT_CAPTURE_RATE_HZ,
            buffer_count: constants::CAPTURE_BUFFER_COUNT,
            stop_timeout_ms: constants::DEFAULT_STOP_TIMEOUT.as_millis() as u64,
            still_timeout_ms: constants::DEFAULT_STILL_TIMEOUT.as_millis() as u64,
        }
    }
}

impl CameraConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> CameraResult<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)
            .map_err(|e| CameraError::Configuration(format!("invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> CameraResult<()> {
        let data = serde_json::to_string_pretty(self)
            .map_err(|e| CameraError::Configuration(format!("serialize failed: {}", e)))?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> CameraResult<()> {
        if self.capture_width == 0 || self.capture_height == 0 {
            return Err(CameraError::Configuration(
                "capture size must be non-zero".to_string(),
            ));
        }
        if self.preview_width == 0 || self.preview_height == 0 {
            return Err(CameraError::Configuration(
                "preview size must be non-zero".to_string(),
            ));
        }
        if self.capture_rate_hz == 0 {
            return Err(CameraError::Configuration(
                "capture rate must be non-zero".to_string(),
            ));
        }
        if self.buffer_count == 0 {
            return Err(CameraError::Configuration(
                "buffer count must be non-zero".to_string(),
            ));
        }
        if self.source == SourceKind::V4l2 && self.device_path.is_empty() {
            return Err(CameraError::Configuration(
                "device path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The format request handed to the device for negotiation
    pub fn format_request(&self) -> FormatRequest {
        FormatRequest {
            width: self.capture_width,
            height: self.capture_height,
            format: self.pixel_format,
        }
    }

    /// Capture loop frame interval derived from the rate cap
    pub fn frame_interval(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.capture_rate_hz.max(1)))
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn still_timeout(&self) -> Duration {
        Duration::from_millis(self.still_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CameraConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.buffer_count, 2);
        assert_eq!(config.preview_width, 360);
        assert_eq!(config.preview_height, 270);
    }

    #[test]
    fn test_zero_capture_size_rejected() {
        let config = CameraConfig {
            capture_width: 0,
            ..CameraConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CameraError::Configuration(_))
        ));
    }

    #[test]
    fn test_frame_interval_from_rate() {
        let config = CameraConfig {
            capture_rate_hz: 15,
            ..CameraConfig::default()
        };
        let interval = config.frame_interval();
        assert!(interval >= Duration::from_millis(66) && interval <= Duration::from_millis(67));
    }

    #[test]
    fn test_config_file_with_stale_fields_still_loads() {
        // Saved files may carry fields from other versions of the config
        let mut value = serde_json::to_value(CameraConfig::default()).expect("serialize");
        value["dequeue_timeout_ms"] = serde_json::json!(2000);
        let parsed: CameraConfig = serde_json::from_value(value).expect("deserialize");
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = CameraConfig {
            source: SourceKind::Pattern,
            capture_rate_hz: 10,
            ..CameraConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let parsed: CameraConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.source, SourceKind::Pattern);
        assert_eq!(parsed.capture_rate_hz, 10);
    }
}
