// SPDX-License-Identifier: GPL-3.0-only

//! Viewfinder - an embedded-style camera capture and preview subsystem
//!
//! This library drives a capture device from a dedicated worker thread,
//! applies a fixed-point digital zoom/crop, and hands preview frames to a
//! polling presentation consumer through a single-slot mailbox. Stills are
//! captured from the live stream and written as BMP files.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`subsystem`]: The facade owning the stream state machine
//! - [`device`]: Frame sources (V4L2 hardware and a synthetic pattern)
//! - [`capture`]: The capture worker thread and per-frame loop
//! - [`transform`]: Fixed-point zoom/crop
//! - [`handoff`]: Single-slot frame mailbox between producer and consumer
//! - [`presentation`]: Polling consumer and display integration traits
//! - [`still`]: BMP encoding and storage
//! - [`bus`]: Shared control bus handshake
//! - [`config`]: Subsystem configuration handling

pub mod bus;
pub mod capture;
pub mod config;
pub mod constants;
pub mod convert;
pub mod device;
pub mod errors;
pub mod handoff;
pub mod presentation;
pub mod still;
pub mod subsystem;
pub mod transform;
pub mod zoom;

// Re-export commonly used types
pub use config::{CameraConfig, SourceKind};
pub use device::{NegotiatedFormat, SensorFormat, StreamState};
pub use errors::{CameraError, CameraResult};
pub use presentation::{FrameSink, NullSink, PresentationSurface};
pub use subsystem::CameraSubsystem;
