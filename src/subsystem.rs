// SPDX-License-Identifier: GPL-3.0-only

//! Camera subsystem facade
//!
//! Owns the stream state machine and wires the pieces together: bus
//! acquisition, format negotiation, the capture worker, the frame mailbox,
//! and the presentation consumer. All state transitions go through this
//! type; the worker thread never changes state on its own.

use crate::bus::{BusHandle, BusProvider};
use crate::capture::{CaptureParams, CaptureShared, CaptureWorker, StillShot, run_loop};
use crate::config::{CameraConfig, SourceKind};
use crate::constants::{DEFAULT_START_TIMEOUT, DEQUEUE_RETRY_DELAY};
use crate::device::pattern::PatternSource;
use crate::device::{NegotiatedFormat, StreamState, v4l2};
use crate::errors::{CameraError, CameraResult};
use crate::handoff::{FrameSlot, SlotStats};
use crate::presentation::{FrameSink, PresentationConsumer, PresentationSurface};
use crate::still;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

pub struct CameraSubsystem {
    config: CameraConfig,
    bus: BusHandle,
    surface: Arc<dyn PresentationSurface>,
    state: StreamState,
    negotiated: NegotiatedFormat,
    shared: Arc<CaptureShared>,
    worker: Option<CaptureWorker>,
    consumer: Option<PresentationConsumer>,
    held: Option<StillShot>,
}

impl CameraSubsystem {
    /// Initialize the subsystem: validate the configuration, acquire the
    /// shared control bus from its owning driver, and negotiate the capture
    /// format. No frames flow until `start_stream`.
    pub fn init(
        config: CameraConfig,
        bus_provider: &dyn BusProvider,
        surface: Arc<dyn PresentationSurface>,
    ) -> CameraResult<Self> {
        config.validate()?;

        let bus = bus_provider.acquire_shared_bus().ok_or_else(|| {
            CameraError::ResourceUnavailable(
                "shared control bus has not been initialized by its owning driver".to_string(),
            )
        })?;

        let request = config.format_request();
        let negotiated = match config.source {
            SourceKind::V4l2 => v4l2::open_and_negotiate(&config.device_path, &request)?,
            SourceKind::Pattern => PatternSource::open(&request, config.buffer_count)?.negotiated(),
        };

        info!(
            bus_owner = bus.owner(),
            format = %negotiated,
            source = ?config.source,
            "Camera subsystem initialized"
        );

        let slot = Arc::new(FrameSlot::new());
        Ok(Self {
            config,
            bus,
            surface,
            state: StreamState::Initialized,
            negotiated,
            shared: Arc::new(CaptureShared::new(slot)),
            worker: None,
            consumer: None,
            held: None,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state != StreamState::Uninitialized
    }

    /// The format the device actually configured at init
    pub fn negotiated_format(&self) -> NegotiatedFormat {
        self.negotiated
    }

    pub fn bus_owner(&self) -> &str {
        self.bus.owner()
    }

    pub fn slot_stats(&self) -> SlotStats {
        self.shared.slot.stats()
    }

    fn capture_params(&self) -> CaptureParams {
        CaptureParams {
            preview_width: self.config.preview_width,
            preview_height: self.config.preview_height,
            frame_interval: self.config.frame_interval(),
            retry_delay: DEQUEUE_RETRY_DELAY,
        }
    }

    /// Start streaming: spawn the capture worker and attach the
    /// presentation consumer. Fails if a stream is already running.
    pub fn start_stream(&mut self, sink: Box<dyn FrameSink>) -> CameraResult<()> {
        if self.state == StreamState::Streaming {
            return Err(CameraError::State(
                "stream is already running".to_string(),
            ));
        }
        if self.state != StreamState::Initialized {
            return Err(CameraError::State(format!(
                "cannot start streaming while {}",
                self.state
            )));
        }

        self.shared.stop.store(false, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let params = self.capture_params();
        let request = self.config.format_request();

        let worker = match self.config.source {
            SourceKind::V4l2 => {
                let path = self.config.device_path.clone();
                let buffer_count = self.config.buffer_count;
                CaptureWorker::spawn("camera-capture", DEFAULT_START_TIMEOUT, move |signal| {
                    v4l2::run_session(path, request, buffer_count, shared, params, signal)
                })?
            }
            SourceKind::Pattern => {
                let buffer_count = self.config.buffer_count;
                CaptureWorker::spawn("camera-capture", DEFAULT_START_TIMEOUT, move |signal| {
                    let mut source = PatternSource::open(&request, buffer_count)?;
                    let negotiated = source.negotiated();
                    signal.ready();
                    run_loop(&shared, negotiated, &params, |dst| source.grab_into(dst));
                    Ok(())
                })?
            }
        };

        self.worker = Some(worker);
        self.consumer = Some(PresentationConsumer::new(
            Arc::clone(&self.shared.slot),
            Arc::clone(&self.surface),
            sink,
        ));
        self.state = StreamState::Streaming;
        info!(format = %self.negotiated, "Streaming started");
        Ok(())
    }

    /// Stop streaming. A no-op when no stream is running; repeated stops
    /// are safe.
    pub fn stop_stream(&mut self) -> CameraResult<()> {
        if self.state != StreamState::Streaming && self.state != StreamState::Stopping {
            debug!(state = %self.state, "stop_stream with no active stream, ignoring");
            return Ok(());
        }

        self.state = StreamState::Stopping;
        if let Some(worker) = self.worker.as_mut() {
            if let Err(e) = worker.stop(&self.shared.stop, self.config.stop_timeout()) {
                // Stay in Stopping; the caller may retry and the stalled
                // worker can still be re-polled.
                warn!(error = %e, "Capture worker did not confirm stop");
                return Err(e);
            }
        }
        self.worker = None;

        self.consumer = None;
        self.held = None;
        self.shared.slot.clear();
        self.shared.stop.store(false, Ordering::Release);
        self.state = StreamState::Initialized;
        info!("Streaming stopped");
        Ok(())
    }

    /// Present the pending preview frame, if any. Safe to call at any rate;
    /// returns true only when a new frame was presented.
    pub fn poll_preview(&mut self) -> bool {
        match self.consumer.as_mut() {
            Some(consumer) => consumer.poll(),
            None => false,
        }
    }

    /// Pixels of the most recently presented preview frame
    pub fn presentation_buffer(&self) -> Option<&[u8]> {
        self.consumer.as_ref().map(|c| c.presentation_buffer())
    }

    pub fn frames_presented(&self) -> u64 {
        self.consumer
            .as_ref()
            .map(|c| c.frames_presented())
            .unwrap_or(0)
    }

    pub fn set_zoom_percent(&self, percent: u32) {
        self.shared.zoom.set_percent(percent);
        debug!(percent = self.shared.zoom.percent(), "Zoom updated");
    }

    pub fn zoom_percent(&self) -> u32 {
        self.shared.zoom.percent()
    }

    /// Borrow one full-resolution frame from the running stream. The frame
    /// stays held, and further `get_frame` calls fail, until
    /// `release_frame`.
    pub fn get_frame(&mut self) -> CameraResult<(u32, u32, &[u8])> {
        if self.held.is_some() {
            return Err(CameraError::State(
                "a frame is already held; release it first".to_string(),
            ));
        }
        if self.state != StreamState::Streaming {
            return Err(CameraError::State(format!(
                "cannot get a frame while {}",
                self.state
            )));
        }

        let shot = self.shared.still.capture(self.config.still_timeout())?;
        let shot = self.held.insert(shot);
        Ok((shot.width, shot.height, &shot.data))
    }

    /// Release the frame borrowed by `get_frame`
    pub fn release_frame(&mut self) -> CameraResult<()> {
        if self.held.take().is_none() {
            return Err(CameraError::State("no frame is held".to_string()));
        }
        Ok(())
    }

    /// Capture one full-resolution still and write it to `path` as BMP.
    ///
    /// Streaming continues uninterrupted: the capture worker fulfills the
    /// request from its next dequeued frame. When the subsystem is
    /// initialized but not streaming, no frames are being produced and no
    /// file is created.
    pub fn capture_to_file(&self, path: &Path) -> CameraResult<()> {
        match self.state {
            StreamState::Streaming => {
                let shot = self.shared.still.capture(self.config.still_timeout())?;
                still::write_still(path, shot.width, shot.height, shot.format, &shot.data)
            }
            StreamState::Initialized => Err(CameraError::ResourceUnavailable(
                "stream is not running, no frames are being produced".to_string(),
            )),
            state => Err(CameraError::State(format!(
                "cannot capture a still while {}",
                state
            ))),
        }
    }

    /// Shut down: stop any running stream and release the subsystem
    pub fn deinit(mut self) -> CameraResult<()> {
        self.stop_stream()?;
        info!("Camera subsystem deinitialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{NoBus, SharedBus};
    use crate::presentation::NullSink;

    struct IdleSurface;

    impl PresentationSurface for IdleSurface {
        fn invalidate(&self) {}
    }

    fn pattern_config() -> CameraConfig {
        CameraConfig {
            source: SourceKind::Pattern,
            capture_width: 64,
            capture_height: 48,
            preview_width: 32,
            preview_height: 24,
            capture_rate_hz: 100,
            ..CameraConfig::default()
        }
    }

    fn init_subsystem() -> CameraSubsystem {
        CameraSubsystem::init(
            pattern_config(),
            &SharedBus::claimed_by("display-driver"),
            Arc::new(IdleSurface),
        )
        .expect("init")
    }

    #[test]
    fn test_init_fails_without_bus() {
        let result = CameraSubsystem::init(pattern_config(), &NoBus, Arc::new(IdleSurface));
        assert!(matches!(result, Err(CameraError::ResourceUnavailable(_))));
    }

    #[test]
    fn test_init_reports_negotiated_format() {
        let subsystem = init_subsystem();
        assert!(subsystem.is_ready());
        assert_eq!(subsystem.state(), StreamState::Initialized);
        assert_eq!(subsystem.negotiated_format().width, 64);
        assert_eq!(subsystem.bus_owner(), "display-driver");
    }

    #[test]
    fn test_double_start_rejected() {
        let mut subsystem = init_subsystem();
        subsystem.start_stream(Box::new(NullSink)).expect("start");
        assert!(matches!(
            subsystem.start_stream(Box::new(NullSink)),
            Err(CameraError::State(_))
        ));
        subsystem.stop_stream().expect("stop");
    }

    #[test]
    fn test_stop_without_stream_is_a_no_op() {
        let mut subsystem = init_subsystem();
        subsystem.stop_stream().expect("first stop");
        subsystem.stop_stream().expect("second stop");
        assert_eq!(subsystem.state(), StreamState::Initialized);
    }

    #[test]
    fn test_get_frame_requires_release_before_reuse() {
        let mut subsystem = init_subsystem();
        subsystem.start_stream(Box::new(NullSink)).expect("start");

        let (width, height, data) = subsystem.get_frame().expect("get frame");
        assert_eq!((width, height), (64, 48));
        assert_eq!(data.len(), 64 * 48 * 2);

        assert!(matches!(
            subsystem.get_frame(),
            Err(CameraError::State(_))
        ));
        subsystem.release_frame().expect("release");
        subsystem.get_frame().expect("get frame after release");
        subsystem.release_frame().expect("release again");

        subsystem.stop_stream().expect("stop");
    }

    #[test]
    fn test_release_without_held_frame_fails() {
        let mut subsystem = init_subsystem();
        assert!(matches!(
            subsystem.release_frame(),
            Err(CameraError::State(_))
        ));
    }
}
