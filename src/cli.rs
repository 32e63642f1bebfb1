// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Probing the capture device
//! - Taking still photos
//! - Running a headless preview stream

use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use viewfinder::bus::SharedBus;
use viewfinder::config::{CameraConfig, SourceKind};
use viewfinder::device::v4l2;
use viewfinder::presentation::{FrameSink, PresentationSurface};
use viewfinder::subsystem::CameraSubsystem;

/// Surface for headless runs; there is no display to redraw
struct HeadlessSurface;

impl PresentationSurface for HeadlessSurface {
    fn invalidate(&self) {}
}

/// Sink that tracks the last presented frame for reporting
struct StatsSink {
    frames: u64,
    last_dimensions: (u32, u32),
}

impl FrameSink for StatsSink {
    fn on_frame(&mut self, width: u32, height: u32, _data: &[u8]) {
        self.frames += 1;
        self.last_dimensions = (width, height);
    }
}

fn build_config(device: Option<String>, pattern: bool) -> CameraConfig {
    let mut config = CameraConfig::default();
    if pattern {
        config.source = SourceKind::Pattern;
    }
    if let Some(path) = device {
        config.device_path = path;
    }
    config
}

fn default_photo_path() -> PathBuf {
    PathBuf::from(format!("IMG_{}.bmp", Local::now().format("%Y%m%d_%H%M%S")))
}

/// Probe the device and print its identity and negotiated format
pub fn probe(device: Option<String>, pattern: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(device, pattern);

    match config.source {
        SourceKind::Pattern => {
            println!("Source: synthetic test pattern (no hardware)");
        }
        SourceKind::V4l2 => {
            let caps = v4l2::probe(&config.device_path)?;
            println!("Device:  {}", config.device_path);
            println!("Card:    {}", caps.card);
            println!("Driver:  {}", caps.driver);
        }
    }

    let bus = SharedBus::claimed_by("display-driver");
    let subsystem = CameraSubsystem::init(config, &bus, Arc::new(HeadlessSurface))?;
    println!("Format:  {}", subsystem.negotiated_format());
    subsystem.deinit()?;
    Ok(())
}

/// Take a still photo and write it as a BMP file.
///
/// Stills are always the full-resolution sensor frame; digital zoom only
/// applies to the preview path.
pub fn take_photo(
    device: Option<String>,
    pattern: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(device, pattern);
    let output = output.unwrap_or_else(default_photo_path);

    let bus = SharedBus::claimed_by("display-driver");
    let mut subsystem = CameraSubsystem::init(config, &bus, Arc::new(HeadlessSurface))?;
    subsystem.start_stream(Box::new(StatsSink {
        frames: 0,
        last_dimensions: (0, 0),
    }))?;

    let result = subsystem.capture_to_file(&output);
    subsystem.stop_stream()?;
    subsystem.deinit()?;
    result?;

    println!("Photo saved to: {}", output.display());
    Ok(())
}

/// Run a headless preview stream for the given duration and report stats
pub fn run_preview(
    device: Option<String>,
    pattern: bool,
    duration: u64,
    zoom: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(device, pattern);

    let bus = SharedBus::claimed_by("display-driver");
    let mut subsystem = CameraSubsystem::init(config, &bus, Arc::new(HeadlessSurface))?;
    println!("Streaming {} for {}s...", subsystem.negotiated_format(), duration);

    subsystem.set_zoom_percent(zoom);
    subsystem.start_stream(Box::new(StatsSink {
        frames: 0,
        last_dimensions: (0, 0),
    }))?;

    let deadline = Instant::now() + Duration::from_secs(duration);
    while Instant::now() < deadline {
        subsystem.poll_preview();
        std::thread::sleep(Duration::from_millis(5));
    }

    let presented = subsystem.frames_presented();
    let stats = subsystem.slot_stats();
    subsystem.stop_stream()?;
    subsystem.deinit()?;

    println!("Frames presented: {}", presented);
    println!(
        "Frames published: {}, dropped under backpressure: {}",
        stats.published, stats.dropped
    );
    Ok(())
}
