//! Keypoint detector seam.
//!
//! A [`Detector`] wraps whatever pose-estimation backend is in use. It is
//! owned by exactly one pose loop, which awaits [`Detector::estimate`] once
//! per tick and calls [`Detector::dispose`] exactly once when the detector is
//! replaced or the loop stops.
//!
//! Backends usually report joints by name. [`RawKeypoint`] is that wire form;
//! [`parse_keypoints`] converts it to typed [`Keypoint`]s once, here at the
//! seam, so nothing downstream ever compares joint strings.

use async_trait::async_trait;
use posefit_types::{JointId, Keypoint, PoseError};
use serde::{Deserialize, Serialize};

use crate::video::VideoFrame;

/// Single-person keypoint detector.
#[async_trait]
pub trait Detector: Send {
    /// Stable identifier, e.g. `"movenet-lightning"`.
    fn name(&self) -> &str;

    /// Estimate the keypoints visible in `frame`. An empty vector means no
    /// person was found.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::DetectorFailure`] when the backend fails.
    async fn estimate(&mut self, frame: &VideoFrame) -> Result<Vec<Keypoint>, PoseError>;

    /// Release backend resources. Called once; the detector is dropped after.
    async fn dispose(&mut self);
}

/// A keypoint as reported by a detector backend, joint still named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawKeypoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl TryFrom<RawKeypoint> for Keypoint {
    type Error = PoseError;

    fn try_from(raw: RawKeypoint) -> Result<Self, Self::Error> {
        let joint: JointId = raw.name.parse()?;
        Ok(Keypoint::new(joint, raw.x, raw.y, raw.score))
    }
}

/// Convert a backend's named keypoints into typed ones.
///
/// # Errors
///
/// Fails with [`PoseError::UnknownJoint`] on the first unrecognised name.
pub fn parse_keypoints(raw: Vec<RawKeypoint>) -> Result<Vec<Keypoint>, PoseError> {
    raw.into_iter().map(Keypoint::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detector_json() {
        let json = r#"[
            {"name": "left_shoulder", "x": 100.0, "y": 200.0, "score": 0.9},
            {"name": "right_shoulder", "x": 300.0, "y": 200.0, "score": 0.8}
        ]"#;
        let raw: Vec<RawKeypoint> = serde_json::from_str(json).unwrap();
        let kps = parse_keypoints(raw).unwrap();
        assert_eq!(kps.len(), 2);
        assert_eq!(kps[0].joint, JointId::LeftShoulder);
        assert_eq!(kps[1].score, 0.8);
    }

    #[test]
    fn unknown_joint_fails_parse() {
        let raw = vec![RawKeypoint {
            name: "tail".to_string(),
            x: 0.0,
            y: 0.0,
            score: 1.0,
        }];
        assert_eq!(
            parse_keypoints(raw).unwrap_err(),
            PoseError::UnknownJoint("tail".to_string())
        );
    }
}
