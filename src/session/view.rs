//! Try-on view
//!
//! The component a page embeds. It owns the manual scale, the overlay
//! artwork and at most one live session at a time.

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

use super::processor::{run_session, FrameCallback, FrameProcessor, SessionContext};
use super::state::{Liveness, SessionPhase, SessionState, StatusHandle, TryOnStatus};
use crate::capture::{Camera, HandDetector};
use crate::compositor::{Compositor, DrawingSurface};
use crate::config::Config;
use crate::overlay::{FramePipeline, ManualScale, OverlaySlot};

/// Properties supplied by the embedding page
pub struct TryOnProps {
    /// Ring artwork (local path or `file://` URI)
    pub overlay_image_url: String,
    /// Invoked on explicit close only, never on error
    pub on_close: Box<dyn Fn() + Send + Sync>,
}

impl TryOnProps {
    pub fn new(overlay_image_url: impl Into<String>) -> Self {
        Self {
            overlay_image_url: overlay_image_url.into(),
            on_close: Box::new(|| {}),
        }
    }

    pub fn with_on_close(mut self, on_close: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Box::new(on_close);
        self
    }
}

impl std::fmt::Debug for TryOnProps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryOnProps")
            .field("overlay_image_url", &self.overlay_image_url)
            .finish_non_exhaustive()
    }
}

struct ActiveSession {
    id: Uuid,
    liveness: Liveness,
    state: Arc<Mutex<SessionState>>,
    task: JoinHandle<()>,
}

/// Try-on view
///
/// `mount`, `retry` and `set_overlay_image_url` spawn onto the current tokio
/// runtime and must be called from within one.
pub struct TryOnView<S: DrawingSurface + Send + 'static> {
    props: TryOnProps,
    config: Arc<Config>,
    camera: Arc<dyn Camera>,
    detector: Arc<dyn HandDetector>,
    surface: Arc<Mutex<S>>,
    overlay: OverlaySlot,
    manual_scale: ManualScale,
    status: watch::Sender<TryOnStatus>,
    on_rendered: Option<FrameCallback<S>>,
    active: Option<ActiveSession>,
    overlay_task: Option<JoinHandle<()>>,
}

impl<S: DrawingSurface + Send + 'static> TryOnView<S> {
    pub fn new(
        props: TryOnProps,
        camera: Arc<dyn Camera>,
        detector: Arc<dyn HandDetector>,
        surface: Arc<Mutex<S>>,
        config: Arc<Config>,
    ) -> Self {
        let (status, _) = watch::channel(TryOnStatus::default());
        Self {
            props,
            manual_scale: ManualScale::new(config.manual_scale.clone()),
            config,
            camera,
            detector,
            surface,
            overlay: OverlaySlot::new(),
            status,
            on_rendered: None,
            active: None,
            overlay_task: None,
        }
    }

    /// Observe every rendered frame
    pub fn with_frame_callback(mut self, callback: FrameCallback<S>) -> Self {
        self.on_rendered = Some(callback);
        self
    }

    /// Load the artwork and start a session
    pub fn mount(&mut self) {
        if self.active.is_some() {
            debug!("Already mounted");
            return;
        }
        info!("Mounting try-on view for {}", self.props.overlay_image_url);
        self.load_overlay();
        self.start_session();
    }

    /// Release everything; safe in any phase
    pub fn unmount(&mut self) {
        self.teardown();
        if let Some(task) = self.overlay_task.take() {
            task.abort();
        }
        // Not tied to any session
        StatusHandle::new(self.status.clone(), Liveness::new()).transition(SessionPhase::Idle);
        info!("Try-on view unmounted");
    }

    /// Restart from scratch with fresh session state
    pub fn retry(&mut self) {
        self.teardown();
        self.status.send_modify(|status| status.retry_count += 1);
        info!("Retrying try-on (attempt {})", self.status.borrow().retry_count);
        self.start_session();
    }

    /// Explicit user close
    pub fn close(&self) {
        (self.props.on_close)();
    }

    /// Swap the artwork; a mounted view restarts its session
    pub fn set_overlay_image_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if url == self.props.overlay_image_url {
            return;
        }
        self.props.overlay_image_url = url;

        if self.active.is_some() {
            self.load_overlay();
            self.teardown();
            self.start_session();
        }
    }

    pub fn overlay_image_url(&self) -> &str {
        &self.props.overlay_image_url
    }

    /// Manual size controls
    pub fn controls(&self) -> ManualScale {
        self.manual_scale.clone()
    }

    pub fn status(&self) -> watch::Receiver<TryOnStatus> {
        self.status.subscribe()
    }

    pub fn current_status(&self) -> TryOnStatus {
        self.status.borrow().clone()
    }

    /// Snapshot of the live session's state
    pub fn session_state(&self) -> Option<SessionState> {
        self.active.as_ref().map(|session| session.state.lock().clone())
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|session| session.id)
    }

    pub fn is_mounted(&self) -> bool {
        self.active.is_some()
    }

    pub fn surface(&self) -> Arc<Mutex<S>> {
        Arc::clone(&self.surface)
    }

    pub fn overlay(&self) -> &OverlaySlot {
        &self.overlay
    }

    fn load_overlay(&mut self) {
        if let Some(task) = self.overlay_task.take() {
            task.abort();
        }

        let load = self.overlay.load(&self.props.overlay_image_url);
        let slot = self.overlay.clone();
        let status = self.status.clone();
        status.send_modify(|s| s.overlay_loaded = slot.is_loaded());

        self.overlay_task = Some(tokio::spawn(async move {
            if let Ok(true) = load.await {
                status.send_modify(|s| s.overlay_loaded = true);
            }
        }));
    }

    fn start_session(&mut self) {
        let id = Uuid::new_v4();
        let liveness = Liveness::new();
        let state = Arc::new(Mutex::new(SessionState::new()));
        let status = StatusHandle::new(self.status.clone(), liveness.clone());

        status.transition(SessionPhase::Initializing);

        let processor = FrameProcessor {
            detector: Arc::clone(&self.detector),
            pipeline: FramePipeline::new(&self.config),
            compositor: Compositor::new(&self.config),
            surface: Arc::clone(&self.surface),
            overlay: self.overlay.clone(),
            manual_scale: self.manual_scale.clone(),
            state: Arc::clone(&state),
            liveness: liveness.clone(),
            status,
            on_rendered: self.on_rendered.clone(),
        };
        let ctx = SessionContext {
            camera: Arc::clone(&self.camera),
            config: Arc::clone(&self.config),
            processor,
        };

        let span = info_span!("tryon_session", id = %id);
        let task = tokio::spawn(run_session(ctx).instrument(span));
        debug!("Session {} started", id);

        self.active = Some(ActiveSession {
            id,
            liveness,
            state,
            task,
        });
    }

    /// Revoke first, then release resources; faults are swallowed
    fn teardown(&mut self) {
        let Some(session) = self.active.take() else {
            return;
        };

        session.liveness.revoke();
        if let Err(e) = self.camera.stop() {
            debug!("Ignoring camera stop failure: {}", e);
        }
        if let Err(e) = self.detector.close() {
            debug!("Ignoring detector close failure: {}", e);
        }
        session.task.abort();
        debug!("Session {} torn down", session.id);
    }
}

impl<S: DrawingSurface + Send + 'static> Drop for TryOnView<S> {
    fn drop(&mut self) {
        self.teardown();
        if let Some(task) = self.overlay_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{FrameReceiver, MockCamera, MockHandDetector, VideoFrame};
    use crate::compositor::RecordingSurface;
    use crate::error::TryOnError;
    use crate::landmarks::test_hand;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    type Feed = Arc<Mutex<Option<mpsc::Sender<VideoFrame>>>>;

    fn feeding_camera(feed: Feed) -> MockCamera {
        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera.expect_request_access().returning(|_| Ok(()));
        camera.expect_start().returning(move |_| {
            let (tx, rx) = mpsc::channel(4);
            *feed.lock() = Some(tx);
            Ok::<FrameReceiver, TryOnError>(rx)
        });
        camera.expect_stop().returning(|| Ok(()));
        camera
    }

    fn tracking_detector() -> MockHandDetector {
        let mut detector = MockHandDetector::new();
        detector.expect_is_available().return_const(true);
        detector.expect_initialize().returning(|_| Ok(()));
        detector
            .expect_detect()
            .returning(|_| Ok(vec![test_hand((0.4, 0.5), (0.42, 0.45))]));
        detector.expect_close().returning(|| Ok(()));
        detector
    }

    fn view(camera: MockCamera, detector: MockHandDetector) -> TryOnView<RecordingSurface> {
        TryOnView::new(
            TryOnProps::new("missing-ring.png"),
            Arc::new(camera),
            Arc::new(detector),
            Arc::new(Mutex::new(RecordingSurface::new(720, 720))),
            Arc::new(Config::default()),
        )
    }

    async fn wait_for(
        rx: &mut watch::Receiver<TryOnStatus>,
        f: impl FnMut(&TryOnStatus) -> bool,
    ) -> TryOnStatus {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
            .await
            .expect("status timeout")
            .expect("status channel closed")
            .clone()
    }

    async fn feed_frame(feed: &Feed, id: u64) {
        let tx = loop {
            if let Some(tx) = feed.lock().clone() {
                break tx;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        };
        tx.send(VideoFrame::solid(id, 32, 32, [0, 0, 0, 255]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_permission_denied_surfaces_error() {
        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera
            .expect_request_access()
            .returning(|_| Err(TryOnError::PermissionDenied));
        camera.expect_stop().returning(|| Ok(()));

        let mut detector = MockHandDetector::new();
        detector.expect_close().returning(|| Ok(()));

        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);
        let mut view = TryOnView::new(
            TryOnProps::new("ring.png").with_on_close(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            Arc::new(camera),
            Arc::new(detector),
            Arc::new(Mutex::new(RecordingSurface::new(64, 64))),
            Arc::new(Config::default()),
        );
        let mut rx = view.status();

        view.mount();
        let status = wait_for(&mut rx, |s| s.phase == SessionPhase::Error).await;

        let failure = status.failure.unwrap();
        assert_eq!(
            failure.message,
            "Camera cannot be accessed. Please check your access permissions."
        );
        // Errors never close the view on their own
        assert_eq!(closed.load(Ordering::SeqCst), 0);

        view.close();
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_frame_enters_tracking() {
        let feed: Feed = Arc::default();
        let mut view = view(feeding_camera(Arc::clone(&feed)), tracking_detector());
        let mut rx = view.status();

        view.mount();
        assert!(view.current_status().is_loading());

        feed_frame(&feed, 0).await;
        let status = wait_for(&mut rx, |s| s.phase == SessionPhase::Tracking).await;
        assert!(status.hand_detected);
        assert_eq!(view.session_state().unwrap().smoothing.frame_count(), 1);
    }

    #[tokio::test]
    async fn test_manual_scale_applies_next_frame() {
        let feed: Feed = Arc::default();
        let mut view = view(feeding_camera(Arc::clone(&feed)), tracking_detector());
        let mut rx = view.status();
        view.mount();

        feed_frame(&feed, 0).await;
        wait_for(&mut rx, |s| s.phase == SessionPhase::Tracking).await;
        let first = view.session_state().unwrap().last_placement.unwrap();

        view.controls().set(1.5);
        feed_frame(&feed, 1).await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while view.session_state().unwrap().smoothing.frame_count() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let second = view.session_state().unwrap().last_placement.unwrap();
        assert!((second.target_size - first.raw_size * 1.5).abs() < 1e-9);
        // Still inside warm-up, so the size follows the target
        assert_eq!(second.size, second.target_size);
    }

    #[tokio::test]
    async fn test_retry_resets_session_state() {
        let feed: Feed = Arc::default();
        let mut view = view(feeding_camera(Arc::clone(&feed)), tracking_detector());
        let mut rx = view.status();
        view.mount();

        for id in 0..12 {
            feed_frame(&feed, id).await;
        }
        drop(feed.lock().take());
        let status = wait_for(&mut rx, |s| s.phase == SessionPhase::Error).await;
        assert!(status.failure.unwrap().stream_ended);

        let before = view.session_id();
        view.retry();
        assert_ne!(view.session_id(), before);
        assert_eq!(view.current_status().retry_count, 1);
        assert_eq!(view.current_status().phase, SessionPhase::Initializing);

        let state = view.session_state().unwrap();
        assert_eq!(state.smoothing.frame_count(), 0);
        assert_eq!(state.smoothing.previous_size(), 0.0);

        feed_frame(&feed, 100).await;
        wait_for(&mut rx, |s| s.phase == SessionPhase::Tracking).await;
        let placement = view.session_state().unwrap().last_placement.unwrap();
        assert_eq!(placement.size, placement.target_size);
    }

    #[tokio::test]
    async fn test_unmount_releases_and_goes_idle() {
        let feed: Feed = Arc::default();
        let mut camera = MockCamera::new();
        camera.expect_is_available().return_const(true);
        camera.expect_request_access().returning(|_| Ok(()));
        let sink = Arc::clone(&feed);
        camera.expect_start().returning(move |_| {
            let (tx, rx) = mpsc::channel(4);
            *sink.lock() = Some(tx);
            Ok(rx)
        });
        camera.expect_stop().times(1).returning(|| Ok(()));

        let mut detector = MockHandDetector::new();
        detector.expect_is_available().return_const(true);
        detector.expect_initialize().returning(|_| Ok(()));
        detector.expect_detect().returning(|_| Ok(Vec::new()));
        detector
            .expect_close()
            .times(1)
            .returning(|| Err(TryOnError::Teardown("already closed".into())));

        let mut view = view(camera, detector);
        let mut rx = view.status();
        view.mount();
        feed_frame(&feed, 0).await;
        wait_for(&mut rx, |s| s.phase == SessionPhase::HandLost).await;

        view.unmount();
        assert!(!view.is_mounted());
        assert_eq!(view.current_status().phase, SessionPhase::Idle);
        assert!(view.session_state().is_none());
    }

    #[tokio::test]
    async fn test_overlay_url_change_restarts_session() {
        let feed: Feed = Arc::default();
        let mut view = view(feeding_camera(Arc::clone(&feed)), tracking_detector());
        view.mount();
        let first = view.session_id();

        view.set_overlay_image_url("missing-ring.png");
        assert_eq!(view.session_id(), first);

        view.set_overlay_image_url("other-ring.png");
        assert_ne!(view.session_id(), first);
        assert_eq!(view.overlay_image_url(), "other-ring.png");
        assert_eq!(view.current_status().phase, SessionPhase::Initializing);
    }
}
