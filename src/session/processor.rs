//! Session runtime
//!
//! One spawned task per session: acquire the camera and detector, then feed
//! every delivered frame through the synchronous frame callback in order.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use super::state::{Liveness, SessionState, StatusHandle};
use crate::capture::{Camera, FrameReceiver, HandDetector, VideoFrame};
use crate::compositor::{Compositor, DrawingSurface};
use crate::config::Config;
use crate::error::{Result, TryOnError};
use crate::landmarks::HandResults;
use crate::overlay::{FramePipeline, ManualScale, OverlaySlot};

/// Called with the frame id and the surface after each rendered frame
pub type FrameCallback<S> = Arc<dyn Fn(u64, &S) + Send + Sync>;

/// Acquire the capabilities for one session
///
/// Returns `Ok(None)` when the session was revoked while an await was
/// pending. A camera that finished starting after revocation is stopped
/// again before returning.
pub(crate) async fn acquire(
    camera: &dyn Camera,
    detector: &dyn HandDetector,
    config: &Config,
    liveness: &Liveness,
) -> Result<Option<FrameReceiver>> {
    if !camera.is_available() {
        return Err(TryOnError::CapabilityUnavailable(
            "camera API not available".into(),
        ));
    }

    camera
        .request_access(&config.camera)
        .await
        .map_err(|e| escalate(e, TryOnError::AcquisitionFailed))?;
    if !liveness.is_alive() {
        debug!("Revoked after permission request");
        return Ok(None);
    }

    if !detector.is_available() {
        return Err(TryOnError::CapabilityUnavailable(
            "hand detector not available".into(),
        ));
    }
    detector
        .initialize(&config.detector)
        .await
        .map_err(|e| escalate(e, TryOnError::DetectorInitFailed))?;
    if !liveness.is_alive() {
        debug!("Revoked after detector initialization");
        return Ok(None);
    }

    let frames = camera
        .start(&config.camera)
        .await
        .map_err(|e| escalate(e, TryOnError::AcquisitionFailed))?;
    if !liveness.is_alive() {
        debug!("Revoked while camera was starting, stopping it again");
        if let Err(e) = camera.stop() {
            debug!("Ignoring camera stop failure: {}", e);
        }
        return Ok(None);
    }

    Ok(Some(frames))
}

/// Keep establishment errors as they are, wrap anything else
fn escalate(error: TryOnError, wrap: fn(String) -> TryOnError) -> TryOnError {
    if error.is_session_fatal() {
        error
    } else {
        wrap(error.to_string())
    }
}

/// Per-frame callback for one session
pub(crate) struct FrameProcessor<S> {
    pub(crate) detector: Arc<dyn HandDetector>,
    pub(crate) pipeline: FramePipeline,
    pub(crate) compositor: Compositor,
    pub(crate) surface: Arc<Mutex<S>>,
    pub(crate) overlay: OverlaySlot,
    pub(crate) manual_scale: ManualScale,
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) liveness: Liveness,
    pub(crate) status: StatusHandle,
    pub(crate) on_rendered: Option<FrameCallback<S>>,
}

impl<S: DrawingSurface> FrameProcessor<S> {
    /// Process one frame; never fails
    ///
    /// Faults are counted and logged and the next frame proceeds normally.
    pub(crate) fn on_frame(&self, frame: &VideoFrame) {
        if !self.liveness.is_alive() {
            return;
        }

        match self.process(frame) {
            Ok(Some(hand_detected)) => {
                self.state.lock().stats.update(frame, hand_detected);
                self.status.frame(hand_detected);
            }
            Ok(None) => {}
            Err(e) => {
                let streak = {
                    let mut state = self.state.lock();
                    state.stats.record_fault();
                    state.stats.consecutive_faults
                };
                if streak == 1 {
                    warn!("Skipping frame {}: {}", frame.frame_id, e);
                } else {
                    debug!("Skipping frame {} ({} in a row): {}", frame.frame_id, streak, e);
                }
            }
        }
    }

    /// Returns whether a hand was present, or `None` if revoked mid-frame
    fn process(&self, frame: &VideoFrame) -> Result<Option<bool>> {
        let results = HandResults {
            image: frame.clone(),
            hands: self.detector.detect(frame)?,
        };
        let hand = results.primary_hand();

        let mut surface = self.surface.lock();
        if !self.liveness.is_alive() {
            return Ok(None);
        }

        let width = f64::from(surface.width());
        let height = f64::from(surface.height());
        let placement = {
            let mut state = self.state.lock();
            let placement = self.pipeline.step(
                &mut state.smoothing,
                hand,
                width,
                height,
                self.manual_scale.get(),
            );
            state.last_placement = placement;
            placement
        };

        let overlay = self.overlay.current();
        let outcome = self.compositor.render(
            &mut *surface,
            &results.image,
            placement.as_ref(),
            overlay.as_deref(),
        )?;
        trace!(frame_id = frame.frame_id, ?outcome, "Frame rendered");

        if let Some(callback) = &self.on_rendered {
            callback(frame.frame_id, &*surface);
        }

        Ok(Some(hand.is_some()))
    }
}

/// Everything a session task needs
pub(crate) struct SessionContext<S> {
    pub(crate) camera: Arc<dyn Camera>,
    pub(crate) config: Arc<Config>,
    pub(crate) processor: FrameProcessor<S>,
}

/// Session task body
pub(crate) async fn run_session<S: DrawingSurface>(ctx: SessionContext<S>) {
    let SessionContext {
        camera,
        config,
        processor,
    } = ctx;
    let liveness = processor.liveness.clone();
    let status = processor.status.clone();

    info!("Acquiring camera and hand detector");
    let mut frames = match acquire(
        camera.as_ref(),
        processor.detector.as_ref(),
        &config,
        &liveness,
    )
    .await
    {
        Ok(Some(frames)) => frames,
        Ok(None) => {
            debug!("Session cancelled during acquisition");
            return;
        }
        Err(e) => {
            if liveness.is_alive() {
                warn!("Try-on could not start: {}", e);
                status.fail(&e);
            }
            return;
        }
    };

    info!("Camera streaming, waiting for frames");
    while let Some(frame) = frames.recv().await {
        if !liveness.is_alive() {
            break;
        }
        processor.on_frame(&frame);
    }

    if liveness.is_alive() {
        let stats = processor.state.lock().stats.clone();
        info!(
            "Camera stream ended after {} frames ({} with a hand, {} faulted)",
            stats.frames_processed, stats.frames_with_hand, stats.frames_faulted
        );
        status.fail(&TryOnError::StreamEnded);
    } else {
        debug!("Session revoked, frame loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{MockCamera, MockHandDetector};
    use crate::compositor::RecordingSurface;
    use crate::landmarks::test_hand;
    use crate::session::state::{SessionPhase, TryOnStatus};
    use tokio::sync::{mpsc, watch};

    fn processor(
        detector: MockHandDetector,
    ) -> (FrameProcessor<RecordingSurface>, watch::Receiver<TryOnStatus>) {
        let liveness = Liveness::new();
        let (tx, rx) = watch::channel(TryOnStatus {
            phase: SessionPhase::Initializing,
            ..Default::default()
        });
        let processor = FrameProcessor {
            detector: Arc::new(detector),
            pipeline: FramePipeline::default(),
            compositor: Compositor::default(),
            surface: Arc::new(Mutex::new(RecordingSurface::new(100, 100))),
            overlay: OverlaySlot::new(),
            manual_scale: ManualScale::default(),
            state: Arc::new(Mutex::new(SessionState::new())),
            liveness: liveness.clone(),
            status: StatusHandle::new(tx, liveness),
            on_rendered: None,
        };
        (processor, rx)
    }

    fn frame(id: u64) -> VideoFrame {
        VideoFrame::solid(id, 16, 16, [0, 0, 0, 255])
    }

    #[tokio::test]
    async fn test_acquire_happy_path() {
        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera.expect_request_access().times(1).returning(|_| Ok(()));
        camera.expect_start().times(1).returning(|_| {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        });
        camera.expect_stop().never();

        let mut detector = MockHandDetector::new();
        detector.expect_is_available().return_const(true);
        detector.expect_initialize().times(1).returning(|_| Ok(()));

        let result = acquire(&camera, &detector, &Config::default(), &Liveness::new()).await;
        assert!(matches!(result, Ok(Some(_))));
    }

    #[tokio::test]
    async fn test_acquire_missing_camera() {
        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(false);
        camera.expect_request_access().never();
        let detector = MockHandDetector::new();

        let err = acquire(&camera, &detector, &Config::default(), &Liveness::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::CapabilityUnavailable(_)));
    }

    #[tokio::test]
    async fn test_acquire_wraps_detector_failure() {
        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera.expect_request_access().returning(|_| Ok(()));
        camera.expect_start().never();

        let mut detector = MockHandDetector::new();
        detector.expect_is_available().return_const(true);
        detector
            .expect_initialize()
            .returning(|_| Err(TryOnError::Io(std::io::Error::other("model missing"))));

        let err = acquire(&camera, &detector, &Config::default(), &Liveness::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::DetectorInitFailed(_)));
        assert!(err.is_session_fatal());
    }

    #[tokio::test]
    async fn test_revoked_during_permission_request() {
        let liveness = Liveness::new();
        let revoke = liveness.clone();

        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera.expect_request_access().returning(move |_| {
            // Unmount lands while the request is pending
            revoke.revoke();
            Ok(())
        });
        camera.expect_start().never();

        let mut detector = MockHandDetector::new();
        detector.expect_is_available().never();
        detector.expect_initialize().never();

        let result = acquire(&camera, &detector, &Config::default(), &liveness).await;
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_revoked_while_starting_stops_camera() {
        let liveness = Liveness::new();
        let revoke = liveness.clone();

        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera.expect_request_access().returning(|_| Ok(()));
        camera.expect_start().return_once(move |_| {
            revoke.revoke();
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        });
        camera.expect_stop().times(1).returning(|| Ok(()));

        let mut detector = MockHandDetector::new();
        detector.expect_is_available().return_const(true);
        detector.expect_initialize().returning(|_| Ok(()));

        let result = acquire(&camera, &detector, &Config::default(), &liveness).await;
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_frame_fault_is_swallowed() {
        let mut detector = MockHandDetector::new();
        let mut calls = 0;
        detector.expect_detect().times(3).returning(move |_| {
            calls += 1;
            if calls == 2 {
                Err(TryOnError::FrameProcessing("corrupt".into()))
            } else {
                Ok(vec![test_hand((0.4, 0.5), (0.42, 0.45))])
            }
        });

        let (processor, rx) = processor(detector);
        for id in 0..3 {
            processor.on_frame(&frame(id));
        }

        let state = processor.state.lock();
        assert_eq!(state.stats.frames_processed, 2);
        assert_eq!(state.stats.frames_faulted, 1);
        assert_eq!(state.stats.consecutive_faults, 0);
        assert_eq!(state.smoothing.frame_count(), 2);
        assert_eq!(rx.borrow().phase, SessionPhase::Tracking);
        assert!(rx.borrow().failure.is_none());
    }

    #[test]
    fn test_hand_loss_moves_to_hand_lost() {
        let mut detector = MockHandDetector::new();
        let mut calls = 0;
        detector.expect_detect().returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(vec![test_hand((0.4, 0.5), (0.42, 0.45))])
            } else {
                Ok(Vec::new())
            }
        });

        let (processor, rx) = processor(detector);
        processor.on_frame(&frame(0));
        assert!(processor.state.lock().smoothing.previous_size() > 0.0);

        processor.on_frame(&frame(1));
        assert_eq!(rx.borrow().phase, SessionPhase::HandLost);
        assert!(!rx.borrow().hand_detected);
        assert_eq!(processor.state.lock().smoothing.previous_size(), 0.0);
        assert!(processor.state.lock().last_placement.is_none());
    }

    #[test]
    fn test_revoked_processor_writes_nothing() {
        let mut detector = MockHandDetector::new();
        detector.expect_detect().never();

        let (processor, rx) = processor(detector);
        processor.liveness.revoke();
        processor.on_frame(&frame(0));

        assert_eq!(processor.state.lock().smoothing.frame_count(), 0);
        assert!(processor.surface.lock().ops().is_empty());
        assert_eq!(rx.borrow().phase, SessionPhase::Initializing);
    }

    #[test]
    fn test_frame_callback_sees_rendered_surface() {
        let mut detector = MockHandDetector::new();
        detector.expect_detect().returning(|_| Ok(Vec::new()));

        let (mut processor, _rx) = processor(detector);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        processor.on_rendered = Some(Arc::new(move |id: u64, surface: &RecordingSurface| {
            sink.lock().push((id, surface.draw_count()));
        }));

        processor.on_frame(&frame(7));
        assert_eq!(*seen.lock(), vec![(7, 1)]);
    }
}
