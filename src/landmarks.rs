//! Hand landmark frames as supplied by the external detector.

use serde::Deserialize;
use thiserror::Error;

/// Number of keypoints in one detected hand.
pub const LANDMARK_COUNT: usize = 21;

pub const INDEX_MCP: usize = 5;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_TIP: usize = 20;

/// One keypoint, normalized to the camera frame. `z` is optional on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    #[error("expected 21 landmarks, got {0}")]
    WrongCount(usize),
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
}

/// A validated single-hand frame: exactly 21 finite points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn from_points(points: &[Landmark]) -> Result<Self, FrameError> {
        let points: [Landmark; LANDMARK_COUNT] = points
            .try_into()
            .map_err(|_| FrameError::WrongCount(points.len()))?;
        if let Some(index) = points.iter().position(|p| !p.is_finite()) {
            return Err(FrameError::NonFinite { index });
        }
        Ok(Self { points })
    }

    pub fn get(&self, index: usize) -> Landmark {
        self.points[index]
    }

    pub fn index_tip(&self) -> Landmark {
        self.points[INDEX_TIP]
    }

    pub fn middle_tip(&self) -> Landmark {
        self.points[MIDDLE_TIP]
    }
}

/// One line of the frame stream. Missing `landmarks` means no hand was seen.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrameRecord {
    #[serde(default, rename = "t")]
    pub timestamp_ms: Option<u64>,
    #[serde(default)]
    pub landmarks: Option<Vec<Landmark>>,
}

impl FrameRecord {
    /// Landmarks of the detected hand, `None` when the detector saw nothing.
    pub fn hand(&self) -> Option<&[Landmark]> {
        match self.landmarks.as_deref() {
            Some([]) | None => None,
            Some(points) => Some(points),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_count() {
        let pts = vec![Landmark::default(); 20];
        assert_eq!(
            HandLandmarks::from_points(&pts),
            Err(FrameError::WrongCount(20))
        );
    }

    #[test]
    fn rejects_nan() {
        let mut pts = vec![Landmark::default(); LANDMARK_COUNT];
        pts[INDEX_TIP].y = f32::NAN;
        assert_eq!(
            HandLandmarks::from_points(&pts),
            Err(FrameError::NonFinite { index: INDEX_TIP })
        );
    }

    #[test]
    fn parses_record_without_z_or_time() {
        let rec: FrameRecord =
            serde_json::from_str(r#"{"landmarks":[{"x":0.1,"y":0.2}]}"#).unwrap();
        assert_eq!(rec.timestamp_ms, None);
        let hand = rec.hand().unwrap();
        assert_eq!(hand[0], Landmark::new(0.1, 0.2, 0.0));
    }

    #[test]
    fn empty_landmarks_mean_no_hand() {
        let rec: FrameRecord = serde_json::from_str(r#"{"t":5,"landmarks":[]}"#).unwrap();
        assert!(rec.hand().is_none());
        let rec: FrameRecord = serde_json::from_str(r#"{"t":5,"landmarks":null}"#).unwrap();
        assert!(rec.hand().is_none());
    }
}
