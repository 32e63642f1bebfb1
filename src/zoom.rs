// SPDX-License-Identifier: GPL-3.0-only

//! Shared zoom state
//!
//! Written by the UI, read by the capture worker once per frame. Relaxed
//! atomics are sufficient: a stale value affects at most one frame and
//! self-corrects on the next iteration.

use crate::constants::{ZOOM_MAX_PERCENT, ZOOM_MIN_PERCENT};
use std::sync::atomic::{AtomicU32, Ordering};

/// Advisory capture resolution preset. Not applied to the device in this
/// version; carried so the UI can persist a preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolutionPreset {
    #[default]
    Full,
    Medium,
    Low,
}

impl ResolutionPreset {
    fn from_index(index: u32) -> Self {
        match index {
            1 => ResolutionPreset::Medium,
            2 => ResolutionPreset::Low,
            _ => ResolutionPreset::Full,
        }
    }

    fn index(self) -> u32 {
        match self {
            ResolutionPreset::Full => 0,
            ResolutionPreset::Medium => 1,
            ResolutionPreset::Low => 2,
        }
    }
}

/// Zoom factor and resolution preset shared between cores
#[derive(Debug)]
pub struct ZoomState {
    percent: AtomicU32,
    resolution: AtomicU32,
}

impl ZoomState {
    pub fn new() -> Self {
        Self {
            percent: AtomicU32::new(ZOOM_MIN_PERCENT),
            resolution: AtomicU32::new(ResolutionPreset::Full.index()),
        }
    }

    /// Current zoom factor in percent (100 = 1.0x)
    pub fn percent(&self) -> u32 {
        self.percent.load(Ordering::Relaxed)
    }

    /// Set the zoom factor, clamped to the supported 100-400 range
    pub fn set_percent(&self, percent: u32) {
        let clamped = percent.clamp(ZOOM_MIN_PERCENT, ZOOM_MAX_PERCENT);
        self.percent.store(clamped, Ordering::Relaxed);
    }

    pub fn resolution(&self) -> ResolutionPreset {
        ResolutionPreset::from_index(self.resolution.load(Ordering::Relaxed))
    }

    pub fn set_resolution(&self, preset: ResolutionPreset) {
        self.resolution.store(preset.index(), Ordering::Relaxed);
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new()
    }
}
