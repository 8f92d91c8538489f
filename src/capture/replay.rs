//! Recorded-session capabilities
//!
//! A recording is a JSON file describing a captured try-on session:
//!
//! ```json
//! {
//!   "width": 1280,
//!   "height": 720,
//!   "frame_rate": 30,
//!   "frames": [
//!     { "image": "frames/0001.png", "hands": [[{"x": 0.4, "y": 0.5}, ...]] },
//!     { "hands": [] }
//!   ]
//! }
//! ```
//!
//! [`ReplayCamera`] plays the frames back as a live stream (frame ids are the
//! frame indices) and [`ReplayDetector`] answers `detect()` with the hands
//! recorded for that index. Frames without an image are synthesized as a flat
//! gray picture of the recording size.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::{Camera, FrameReceiver, HandDetector, VideoFrame};
use crate::config::{CameraSettings, DetectorSettings};
use crate::error::{Result, TryOnError};
use crate::landmarks::{HandLandmark, LandmarkSet};

const SYNTHETIC_GRAY: [u8; 4] = [96, 96, 96, 255];

fn default_frame_rate() -> u32 {
    30
}

/// A recorded try-on session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Playback rate when pacing in real time
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,

    /// Frames in capture order
    pub frames: Vec<RecordedFrame>,
}

/// One recorded frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Camera picture, relative to the recording file
    #[serde(default)]
    pub image: Option<PathBuf>,

    /// Hands reported by the detector, 21 points each
    #[serde(default)]
    pub hands: Vec<Vec<HandLandmark>>,
}

impl Recording {
    /// Parse a recording from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let recording: Recording = serde_json::from_str(json)
            .map_err(|e| TryOnError::Recording(format!("invalid recording: {}", e)))?;
        recording.validate()?;
        Ok(recording)
    }

    /// Load a recording file, resolving image paths against its directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            TryOnError::Recording(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut recording = Self::from_json(&json)?;

        if let Some(base) = path.parent() {
            for frame in &mut recording.frames {
                if let Some(image) = frame.image.as_mut() {
                    if image.is_relative() {
                        *image = base.join(&*image);
                    }
                }
            }
        }

        info!(
            "Loaded recording {}: {} frames at {}x{}",
            path.display(),
            recording.frames.len(),
            recording.width,
            recording.height
        );
        Ok(recording)
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TryOnError::Recording(format!(
                "invalid frame size {}x{}",
                self.width, self.height
            )));
        }
        if self.frame_rate == 0 {
            return Err(TryOnError::Recording("frame rate must be positive".into()));
        }
        Ok(())
    }

    /// Number of recorded frames
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

fn load_frame(recording: &Recording, index: usize) -> Result<VideoFrame> {
    let frame_id = index as u64;
    match recording.frames[index].image.as_deref() {
        Some(path) => {
            let image = image::open(path)?.to_rgba8();
            Ok(VideoFrame::from_rgba(frame_id, image))
        }
        None => Ok(VideoFrame::solid(
            frame_id,
            recording.width,
            recording.height,
            SYNTHETIC_GRAY,
        )),
    }
}

/// Camera that streams a recording
pub struct ReplayCamera {
    recording: Arc<Recording>,
    realtime: bool,
    deny_access: bool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReplayCamera {
    /// Camera that streams as fast as the consumer drains the queue
    pub fn new(recording: Arc<Recording>) -> Self {
        Self {
            recording,
            realtime: false,
            deny_access: false,
            task: Mutex::new(None),
        }
    }

    /// Pace frames at the recording's frame rate
    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Refuse the permission request
    pub fn with_access_denied(mut self) -> Self {
        self.deny_access = true;
        self
    }

    /// Whether a playback task is currently running
    pub fn is_streaming(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

#[async_trait]
impl Camera for ReplayCamera {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_access(&self, settings: &CameraSettings) -> Result<()> {
        if self.deny_access {
            return Err(TryOnError::PermissionDenied);
        }
        if settings.width != self.recording.width || settings.height != self.recording.height {
            debug!(
                "Requested {}x{}, recording provides {}x{}",
                settings.width, settings.height, self.recording.width, self.recording.height
            );
        }
        Ok(())
    }

    async fn start(&self, settings: &CameraSettings) -> Result<FrameReceiver> {
        if self.deny_access {
            return Err(TryOnError::PermissionDenied);
        }

        // Restarting replaces the previous stream
        self.stop()?;

        let (tx, rx) = mpsc::channel(settings.frame_queue.max(1));
        let recording = Arc::clone(&self.recording);
        let period = self
            .realtime
            .then(|| Duration::from_secs_f64(1.0 / f64::from(recording.frame_rate)));

        let handle = tokio::spawn(async move {
            let mut ticker = period.map(tokio::time::interval);

            for index in 0..recording.len() {
                if let Some(ticker) = ticker.as_mut() {
                    ticker.tick().await;
                }

                let source = Arc::clone(&recording);
                let frame = match tokio::task::spawn_blocking(move || load_frame(&source, index))
                    .await
                {
                    Ok(Ok(frame)) => frame,
                    Ok(Err(e)) => {
                        warn!("Skipping recorded frame {}: {}", index, e);
                        continue;
                    }
                    Err(e) => {
                        warn!("Frame loader for {} panicked: {}", index, e);
                        continue;
                    }
                };

                trace!("Replaying frame {}", index);
                if tx.send(frame).await.is_err() {
                    debug!("Frame receiver dropped, stopping replay");
                    return;
                }
            }

            debug!("Replay finished after {} frames", recording.len());
        });

        *self.task.lock() = Some(handle);
        Ok(rx)
    }

    fn stop(&self) -> Result<()> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            debug!("Replay camera stopped");
        }
        Ok(())
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

/// Detector that answers with the hands recorded for each frame
pub struct ReplayDetector {
    recording: Arc<Recording>,
    initialized: AtomicBool,
}

impl ReplayDetector {
    pub fn new(recording: Arc<Recording>) -> Self {
        Self {
            recording,
            initialized: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl HandDetector for ReplayDetector {
    fn is_available(&self) -> bool {
        true
    }

    async fn initialize(&self, settings: &DetectorSettings) -> Result<()> {
        debug!(
            max_num_hands = settings.max_num_hands,
            model_complexity = settings.model_complexity,
            "Replay detector initialized"
        );
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    fn detect(&self, frame: &VideoFrame) -> Result<Vec<LandmarkSet>> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(TryOnError::FrameProcessing(
                "detector used before initialization".into(),
            ));
        }

        let Some(recorded) = self.recording.frames.get(frame.frame_id as usize) else {
            return Ok(Vec::new());
        };

        let mut hands = recorded.hands.iter();
        let Some(primary) = hands.next() else {
            return Ok(Vec::new());
        };

        // Only the primary hand drives the overlay; a bad extra hand is dropped
        let mut detected = vec![LandmarkSet::from_points(primary.clone())?];
        for (index, points) in hands.enumerate() {
            match LandmarkSet::from_points(points.clone()) {
                Ok(hand) => detected.push(hand),
                Err(e) => debug!(
                    "Dropping hand {} on frame {}: {}",
                    index + 1,
                    frame.frame_id,
                    e
                ),
            }
        }
        Ok(detected)
    }

    fn close(&self) -> Result<()> {
        self.initialized.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::LANDMARK_COUNT;

    fn hand_json() -> String {
        let point = r#"{"x": 0.5, "y": 0.5}"#;
        format!("[{}]", vec![point; LANDMARK_COUNT].join(","))
    }

    fn recording() -> Arc<Recording> {
        let json = format!(
            r#"{{"width": 8, "height": 6, "frames": [{{"hands": [{}]}}, {{}}, {{"hands": []}}]}}"#,
            hand_json()
        );
        Arc::new(Recording::from_json(&json).unwrap())
    }

    #[test]
    fn test_recording_defaults() {
        let rec = recording();
        assert_eq!(rec.frame_rate, 30);
        assert_eq!(rec.len(), 3);
        assert!(rec.frames[1].image.is_none());
    }

    #[test]
    fn test_recording_rejects_zero_size() {
        let err = Recording::from_json(r#"{"width": 0, "height": 6, "frames": []}"#).unwrap_err();
        assert!(matches!(err, TryOnError::Recording(_)));
    }

    #[test]
    fn test_load_resolves_relative_images() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(
            &path,
            r#"{"width": 4, "height": 4, "frames": [{"image": "f0.png"}]}"#,
        )
        .unwrap();

        let rec = Recording::load(&path).unwrap();
        assert_eq!(rec.frames[0].image.as_deref(), Some(dir.path().join("f0.png").as_path()));
    }

    #[tokio::test]
    async fn test_camera_streams_all_frames_in_order() {
        let camera = ReplayCamera::new(recording());
        let mut rx = camera.start(&CameraSettings::default()).await.unwrap();

        let mut ids = Vec::new();
        while let Some(frame) = rx.recv().await {
            assert_eq!((frame.width, frame.height), (8, 6));
            ids.push(frame.frame_id);
        }
        assert_eq!(ids, vec![0, 1, 2]);
        camera.stop().unwrap();
        camera.stop().unwrap();
    }

    #[tokio::test]
    async fn test_stop_ends_paced_replay() {
        let camera = ReplayCamera::new(recording()).with_realtime(true);
        let _rx = camera.start(&CameraSettings::default()).await.unwrap();
        assert!(camera.is_streaming());

        camera.stop().unwrap();
        assert!(!camera.is_streaming());
    }

    #[tokio::test]
    async fn test_camera_access_denied() {
        let camera = ReplayCamera::new(recording()).with_access_denied();
        let err = camera
            .request_access(&CameraSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TryOnError::PermissionDenied));
        assert!(camera.stop().is_ok());
    }

    #[tokio::test]
    async fn test_detector_answers_per_frame() {
        let rec = recording();
        let detector = ReplayDetector::new(Arc::clone(&rec));
        let frame = VideoFrame::solid(0, 8, 6, [0, 0, 0, 255]);

        assert!(detector.detect(&frame).is_err());

        detector
            .initialize(&DetectorSettings::default())
            .await
            .unwrap();
        assert_eq!(detector.detect(&frame).unwrap().len(), 1);
        assert!(detector
            .detect(&VideoFrame::solid(1, 8, 6, [0; 4]))
            .unwrap()
            .is_empty());
        assert!(detector
            .detect(&VideoFrame::solid(99, 8, 6, [0; 4]))
            .unwrap()
            .is_empty());

        detector.close().unwrap();
        detector.close().unwrap();
    }

    #[tokio::test]
    async fn test_detector_drops_malformed_extra_hand() {
        let json = format!(
            r#"{{"width": 8, "height": 6, "frames": [
                {{"hands": [{hand}, [{{"x": 0.1, "y": 0.1}}]]}},
                {{"hands": [[{{"x": 0.1, "y": 0.1}}], {hand}]}}
            ]}}"#,
            hand = hand_json()
        );
        let detector = ReplayDetector::new(Arc::new(Recording::from_json(&json).unwrap()));
        detector
            .initialize(&DetectorSettings::default())
            .await
            .unwrap();

        let hands = detector
            .detect(&VideoFrame::solid(0, 8, 6, [0; 4]))
            .unwrap();
        assert_eq!(hands.len(), 1);

        let err = detector
            .detect(&VideoFrame::solid(1, 8, 6, [0; 4]))
            .unwrap_err();
        assert!(matches!(err, TryOnError::InvalidLandmarks(_)));
    }
}
