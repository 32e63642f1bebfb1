// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the camera subsystem

use std::fmt;

/// Result type alias using CameraError
pub type CameraResult<T> = Result<T, CameraError>;

/// Camera subsystem error taxonomy
#[derive(Debug, Clone)]
pub enum CameraError {
    /// Invalid arguments or configuration values
    Configuration(String),
    /// A required shared resource is not available (bus not yet owned,
    /// device busy, no frame produced yet)
    ResourceUnavailable(String),
    /// Device open/configure/stream failure
    Device(String),
    /// Operation invalid for the current stream state
    State(String),
    /// Filesystem read/write failure
    Io(String),
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            CameraError::ResourceUnavailable(msg) => write!(f, "Resource unavailable: {}", msg),
            CameraError::Device(msg) => write!(f, "Device error: {}", msg),
            CameraError::State(msg) => write!(f, "Invalid state: {}", msg),
            CameraError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for CameraError {}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::Io(err.to_string())
    }
}
