// SPDX-License-Identifier: GPL-3.0-only

//! Capture worker and frame loop
//!
//! One worker thread owns the device for the whole session. Each iteration
//! dequeues a full-resolution frame, services any pending still request from
//! it, and publishes a zoom-cropped preview frame into the mailbox unless
//! the previous one is still unconsumed. Stopping is cooperative: the owner
//! raises a flag and waits a bounded time for the thread to exit.

use crate::device::{FrameInfo, NegotiatedFormat, SensorFormat};
use crate::errors::{CameraError, CameraResult};
use crate::handoff::{FrameSlot, PreviewFrame};
use crate::transform;
use crate::zoom::ZoomState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, mpsc};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A full-resolution frame captured for a still request
#[derive(Debug, Clone)]
pub struct StillShot {
    pub width: u32,
    pub height: u32,
    pub format: SensorFormat,
    pub sequence: u32,
    pub data: Vec<u8>,
}

/// Snapshot request serviced by the capture worker.
///
/// The worker owns the device, so stills are taken from its next dequeued
/// frame rather than by opening the device a second time. The requester
/// blocks on a condvar until the worker fulfills the request or the
/// timeout expires.
#[derive(Debug)]
pub struct StillRequest {
    pending: AtomicBool,
    result: Mutex<Option<StillShot>>,
    cond: Condvar,
}

impl StillRequest {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            result: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// Request a still and wait for the worker to deliver one
    pub fn capture(&self, timeout: Duration) -> CameraResult<StillShot> {
        let mut guard = self
            .result
            .lock()
            .map_err(|_| CameraError::State("still request lock poisoned".to_string()))?;
        *guard = None;
        self.pending.store(true, Ordering::Release);

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(shot) = guard.take() {
                return Ok(shot);
            }
            let now = Instant::now();
            if now >= deadline {
                self.pending.store(false, Ordering::Release);
                return Err(CameraError::ResourceUnavailable(
                    "timed out waiting for a still frame".to_string(),
                ));
            }
            let (next, _) = self
                .cond
                .wait_timeout(guard, deadline - now)
                .map_err(|_| CameraError::State("still request lock poisoned".to_string()))?;
            guard = next;
        }
    }

    /// Worker side: if a request is pending, produce the shot and wake the
    /// requester. The producer closure only runs when a request is waiting.
    pub fn fulfill_with(&self, produce: impl FnOnce() -> StillShot) {
        if !self.pending.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Ok(mut guard) = self.result.lock() {
            *guard = Some(produce());
            self.cond.notify_all();
        }
    }
}

impl Default for StillRequest {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared between the subsystem and the capture worker thread
#[derive(Debug)]
pub struct CaptureShared {
    pub slot: Arc<FrameSlot>,
    pub zoom: ZoomState,
    pub stop: AtomicBool,
    pub still: StillRequest,
}

impl CaptureShared {
    pub fn new(slot: Arc<FrameSlot>) -> Self {
        Self {
            slot,
            zoom: ZoomState::default(),
            stop: AtomicBool::new(false),
            still: StillRequest::new(),
        }
    }
}

/// Per-session loop parameters, fixed at stream start
#[derive(Debug, Clone, Copy)]
pub struct CaptureParams {
    pub preview_width: u32,
    pub preview_height: u32,
    /// Minimum wall time per iteration; caps the preview rate
    pub frame_interval: Duration,
    /// Back-off after a failed dequeue
    pub retry_delay: Duration,
}

/// The per-frame loop shared by all sources.
///
/// `grab` fills the raw buffer with one full-resolution frame and returns
/// its metadata. A grab failure is logged and retried after a delay; the
/// loop only exits on the stop flag.
pub fn run_loop(
    shared: &CaptureShared,
    format: NegotiatedFormat,
    params: &CaptureParams,
    mut grab: impl FnMut(&mut Vec<u8>) -> CameraResult<FrameInfo>,
) {
    let mut raw = Vec::with_capacity(format.frame_size());
    let mut preview = Vec::new();

    while !shared.stop.load(Ordering::Acquire) {
        let started = Instant::now();

        let info = match grab(&mut raw) {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Frame dequeue failed, retrying");
                thread::sleep(params.retry_delay);
                continue;
            }
        };

        shared.still.fulfill_with(|| StillShot {
            width: format.width,
            height: format.height,
            format: format.format,
            sequence: info.sequence,
            data: raw.clone(),
        });

        if shared.slot.is_ready() {
            // Consumer has not drained the previous frame; skip the
            // transform entirely and drop this one.
            shared.slot.record_drop();
        } else {
            let zoom = shared.zoom.percent();
            match transform::zoom_crop(
                &raw,
                format.width,
                format.height,
                format.format.bytes_per_pixel(),
                zoom,
                &mut preview,
                params.preview_width,
                params.preview_height,
            ) {
                Ok(()) => {
                    shared.slot.publish(PreviewFrame {
                        width: params.preview_width,
                        height: params.preview_height,
                        format: format.format,
                        sequence: info.sequence,
                        data: std::mem::take(&mut preview),
                    });
                }
                Err(e) => {
                    // Fall through to the interval sleep so a persistent
                    // failure cannot spin at the raw dequeue rate.
                    warn!(error = %e, sequence = info.sequence, "Preview transform failed");
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed < params.frame_interval {
            thread::sleep(params.frame_interval - elapsed);
        }
    }

    debug!("Capture loop exiting on stop request");
}

/// One-shot startup confirmation, sent by the session once its frame
/// source is open and its buffers are mapped
pub struct StartSignal(mpsc::Sender<CameraResult<()>>);

impl StartSignal {
    pub fn ready(self) {
        let _ = self.0.send(Ok(()));
    }
}

/// Handle to the capture worker thread
#[derive(Debug)]
pub struct CaptureWorker {
    handle: Option<JoinHandle<()>>,
}

impl CaptureWorker {
    /// Spawn the worker and wait for it to confirm its source is up.
    ///
    /// `session` opens the source, signals readiness, runs the frame loop,
    /// and returns when the stop flag is raised. A session that fails
    /// before signaling surfaces its error here, so the caller learns about
    /// a dead stream at start time instead of from the log.
    pub fn spawn(
        name: &str,
        startup_timeout: Duration,
        session: impl FnOnce(StartSignal) -> CameraResult<()> + Send + 'static,
    ) -> CameraResult<Self> {
        let (tx, rx) = mpsc::channel();
        let signal_tx = tx.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || match session(StartSignal(signal_tx)) {
                Ok(()) => info!("Capture session finished"),
                Err(e) => {
                    let _ = tx.send(Err(e.clone()));
                    error!(error = %e, "Capture session failed");
                }
            })
            .map_err(|e| {
                CameraError::ResourceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        match rx.recv_timeout(startup_timeout) {
            Ok(Ok(())) => Ok(Self {
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                // Session already returned; the join is immediate.
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(CameraError::Device(
                "capture worker did not confirm startup".to_string(),
            )),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal stop through `stop_flag` and wait up to `timeout` for the
    /// thread to exit. A thread stuck past the deadline is reported as a
    /// stall; the handle is dropped rather than joined so the caller is
    /// never blocked indefinitely.
    pub fn stop(&mut self, stop_flag: &AtomicBool, timeout: Duration) -> CameraResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        stop_flag.store(true, Ordering::Release);

        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                error!(timeout_ms = timeout.as_millis() as u64, "Capture thread stalled on stop");
                // Keep the handle so a later stop can re-poll the thread.
                self.handle = Some(handle);
                return Err(CameraError::State(
                    "capture thread did not stop within the timeout".to_string(),
                ));
            }
            thread::sleep(crate::constants::STOP_POLL_INTERVAL);
        }

        handle
            .join()
            .map_err(|_| CameraError::State("capture thread panicked".to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_STOP_TIMEOUT;

    fn format() -> NegotiatedFormat {
        NegotiatedFormat {
            width: 8,
            height: 8,
            format: SensorFormat::Rgb565,
        }
    }

    fn params() -> CaptureParams {
        CaptureParams {
            preview_width: 4,
            preview_height: 4,
            frame_interval: Duration::from_millis(1),
            retry_delay: Duration::from_millis(1),
        }
    }

    fn spawn_synthetic(shared: Arc<CaptureShared>) -> CaptureWorker {
        let loop_shared = Arc::clone(&shared);
        CaptureWorker::spawn("capture-test", Duration::from_secs(1), move |signal| {
            signal.ready();
            let mut sequence = 0u32;
            run_loop(&loop_shared, format(), &params(), |dst| {
                dst.clear();
                dst.resize(format().frame_size(), sequence as u8);
                let info = FrameInfo {
                    sequence,
                    bytes_used: dst.len(),
                };
                sequence += 1;
                Ok(info)
            });
            Ok(())
        })
        .expect("spawn worker")
    }

    #[test]
    fn test_stop_handshake() {
        let shared = Arc::new(CaptureShared::new(Arc::new(FrameSlot::new())));
        let mut worker = spawn_synthetic(Arc::clone(&shared));
        assert!(worker.is_running());

        worker
            .stop(&shared.stop, DEFAULT_STOP_TIMEOUT)
            .expect("stop");
        assert!(!worker.is_running());
    }

    #[test]
    fn test_backpressure_skips_transform() {
        let shared = Arc::new(CaptureShared::new(Arc::new(FrameSlot::new())));
        let mut worker = spawn_synthetic(Arc::clone(&shared));

        // Never consume; after the first publish every frame must drop.
        let deadline = Instant::now() + Duration::from_secs(1);
        while shared.slot.stats().dropped < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        worker
            .stop(&shared.stop, DEFAULT_STOP_TIMEOUT)
            .expect("stop");

        let stats = shared.slot.stats();
        assert_eq!(stats.published, 1, "only the first frame may be published");
        assert!(stats.dropped >= 3);
    }

    #[test]
    fn test_grab_error_is_retried() {
        let shared = Arc::new(CaptureShared::new(Arc::new(FrameSlot::new())));
        let loop_shared = Arc::clone(&shared);
        let mut worker = CaptureWorker::spawn("capture-test", Duration::from_secs(1), move |signal| {
            signal.ready();
            let mut calls = 0u32;
            run_loop(&loop_shared, format(), &params(), |dst| {
                calls += 1;
                if calls == 1 {
                    return Err(CameraError::Device("transient".to_string()));
                }
                dst.clear();
                dst.resize(format().frame_size(), 0);
                Ok(FrameInfo {
                    sequence: calls,
                    bytes_used: dst.len(),
                })
            });
            Ok(())
        })
        .expect("spawn worker");

        let deadline = Instant::now() + Duration::from_secs(1);
        while shared.slot.stats().published == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        worker
            .stop(&shared.stop, DEFAULT_STOP_TIMEOUT)
            .expect("stop");
        assert!(
            shared.slot.stats().published >= 1,
            "loop must survive a failed dequeue"
        );
    }

    #[test]
    fn test_still_request_fulfilled_during_streaming() {
        let shared = Arc::new(CaptureShared::new(Arc::new(FrameSlot::new())));
        let mut worker = spawn_synthetic(Arc::clone(&shared));

        let shot = shared
            .still
            .capture(Duration::from_secs(1))
            .expect("still capture");
        assert_eq!(shot.width, 8);
        assert_eq!(shot.height, 8);
        assert_eq!(shot.data.len(), format().frame_size());

        worker
            .stop(&shared.stop, DEFAULT_STOP_TIMEOUT)
            .expect("stop");
    }

    #[test]
    fn test_still_request_times_out_without_worker() {
        let request = StillRequest::new();
        let err = request.capture(Duration::from_millis(20));
        assert!(matches!(err, Err(CameraError::ResourceUnavailable(_))));
    }

    #[test]
    fn test_spawn_surfaces_session_setup_failure() {
        let result = CaptureWorker::spawn("capture-test", Duration::from_secs(1), |_signal| {
            Err(CameraError::Device("no such device".to_string()))
        });
        assert!(matches!(result, Err(CameraError::Device(_))));
    }

    #[test]
    fn test_transform_failure_is_rate_capped() {
        use std::sync::atomic::AtomicU32;

        let shared = Arc::new(CaptureShared::new(Arc::new(FrameSlot::new())));
        let loop_shared = Arc::clone(&shared);
        let grabs = Arc::new(AtomicU32::new(0));
        let grab_count = Arc::clone(&grabs);

        let mut worker =
            CaptureWorker::spawn("capture-test", Duration::from_secs(1), move |signal| {
                signal.ready();
                let slow = CaptureParams {
                    frame_interval: Duration::from_millis(50),
                    ..params()
                };
                run_loop(&loop_shared, format(), &slow, |dst| {
                    grab_count.fetch_add(1, Ordering::Relaxed);
                    // Deliberately too small for the declared format; the
                    // transform rejects every frame.
                    dst.clear();
                    dst.resize(4, 0);
                    Ok(FrameInfo {
                        sequence: 0,
                        bytes_used: 4,
                    })
                });
                Ok(())
            })
            .expect("spawn worker");

        thread::sleep(Duration::from_millis(200));
        worker
            .stop(&shared.stop, DEFAULT_STOP_TIMEOUT)
            .expect("stop");

        let calls = grabs.load(Ordering::Relaxed);
        assert!(calls >= 2, "loop must keep running after transform failures");
        assert!(
            calls <= 10,
            "failed transforms must honor the rate cap, got {} grabs in 200ms",
            calls
        );
        assert_eq!(shared.slot.stats().published, 0);
    }
}
