//! Hand landmark types
//!
//! One detected hand is a fixed set of 21 keypoints in normalized image
//! coordinates (x and y in [0, 1] relative to frame width and height). The
//! index convention is the one used by the MediaPipe hand landmarker.
//!
//! ```text
//!            8   12  16  20
//!            |   |   |   |
//!            7   11  15  19
//!       4    |   |   |   |
//!       |    6   10  14  18
//!       3    |   |   |   |
//!        \   5---9---13--17
//!         2   \         /
//!          \   \       /
//!           1---0-----'
//! ```

use serde::{Deserialize, Serialize};

use crate::capture::VideoFrame;
use crate::error::{Result, TryOnError};

/// Number of landmarks in one hand
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_FINGER_MCP: usize = 5;
pub const INDEX_FINGER_PIP: usize = 6;
pub const INDEX_FINGER_DIP: usize = 7;
pub const INDEX_FINGER_TIP: usize = 8;
pub const MIDDLE_FINGER_MCP: usize = 9;
pub const MIDDLE_FINGER_PIP: usize = 10;
pub const MIDDLE_FINGER_DIP: usize = 11;
pub const MIDDLE_FINGER_TIP: usize = 12;
/// Ring finger base joint, where the band rests
pub const RING_FINGER_MCP: usize = 13;
/// Ring finger middle joint
pub const RING_FINGER_PIP: usize = 14;
pub const RING_FINGER_DIP: usize = 15;
pub const RING_FINGER_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// A single hand landmark (normalized coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HandLandmark {
    /// 0-1 normalized to frame width
    pub x: f64,
    /// 0-1 normalized to frame height
    pub y: f64,
    /// Relative depth (unused by the overlay)
    #[serde(default)]
    pub z: f64,
}

impl HandLandmark {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// The 21 landmarks of one detected hand
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [HandLandmark; LANDMARK_COUNT],
}

impl LandmarkSet {
    /// Build a set from detector output, rejecting malformed results
    pub fn from_points(points: Vec<HandLandmark>) -> Result<Self> {
        let count = points.len();
        let points: [HandLandmark; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            TryOnError::InvalidLandmarks(format!(
                "expected {} points, got {}",
                LANDMARK_COUNT, count
            ))
        })?;

        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(TryOnError::InvalidLandmarks(format!(
                "landmark {} has non-finite coordinates",
                index
            )));
        }

        Ok(Self { points })
    }

    /// Landmark at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index >= LANDMARK_COUNT`. Configured indices are
    /// validated at load time.
    pub fn point(&self, index: usize) -> HandLandmark {
        self.points[index]
    }

    pub fn points(&self) -> &[HandLandmark; LANDMARK_COUNT] {
        &self.points
    }

    /// Select the two joints that place the ring
    pub fn anchor_points(&self, base_index: usize, joint_index: usize) -> HandAnchorPoints {
        HandAnchorPoints {
            base: self.point(base_index),
            joint: self.point(joint_index),
        }
    }
}

/// Ring-finger base and middle joint of one hand
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandAnchorPoints {
    pub base: HandLandmark,
    pub joint: HandLandmark,
}

/// One frame as delivered by the landmark source
#[derive(Debug, Clone)]
pub struct HandResults {
    /// The camera frame the landmarks were detected on
    pub image: VideoFrame,
    /// Detected hands, in detector order
    pub hands: Vec<LandmarkSet>,
}

impl HandResults {
    /// The hand the overlay follows: the detector's first, if any
    pub fn primary_hand(&self) -> Option<&LandmarkSet> {
        self.hands.first()
    }
}

#[cfg(test)]
pub(crate) fn test_hand(base: (f64, f64), joint: (f64, f64)) -> LandmarkSet {
    let mut points = vec![HandLandmark::new(0.5, 0.5); LANDMARK_COUNT];
    points[RING_FINGER_MCP] = HandLandmark::new(base.0, base.1);
    points[RING_FINGER_PIP] = HandLandmark::new(joint.0, joint.1);
    LandmarkSet::from_points(points).unwrap()
}
