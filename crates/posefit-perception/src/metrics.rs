//! Pose Metrics Extractor.
//!
//! Reduces one [`PoseFrame`] to the handful of torso measurements the fitter
//! needs. Only the shoulders are mandatory; the nose refines the anchor and
//! the hips refine the torso height when they are confident enough.
//!
//! # Example
//!
//! ```rust
//! use posefit_perception::metrics::PoseMetricsExtractor;
//! use posefit_types::{FrameSize, JointId, Keypoint, PoseFrame};
//!
//! let frame = PoseFrame::new(vec![
//!     Keypoint::new(JointId::LeftShoulder, 100.0, 200.0, 0.9),
//!     Keypoint::new(JointId::RightShoulder, 300.0, 200.0, 0.9),
//! ]);
//!
//! let extractor = PoseMetricsExtractor::default();
//! let m = extractor.extract(&frame, FrameSize::new(640, 480), 0.1).unwrap();
//! assert!((m.shoulder_width_px - 200.0).abs() < 1e-4);
//! // No hips: torso height falls back to 2.2 × shoulder width.
//! assert!((m.torso_height_px - 440.0).abs() < 1e-3);
//! ```

use posefit_types::{FrameSize, JointId, Keypoint, PoseFrame, PoseMetrics};
use tracing::trace;

use crate::angle::wrap_angle;
use crate::constants::FitConstants;
use crate::depth::DepthEstimator;

/// Computes [`PoseMetrics`] from raw keypoints.
#[derive(Debug, Clone)]
pub struct PoseMetricsExtractor {
    constants: FitConstants,
    depth: DepthEstimator,
}

impl PoseMetricsExtractor {
    pub fn new(constants: FitConstants) -> Self {
        Self {
            depth: DepthEstimator::new(&constants),
            constants,
        }
    }

    /// Extract torso metrics, or `None` when either shoulder is missing or
    /// scores below the shoulder threshold.
    pub fn extract(
        &self,
        frame: &PoseFrame,
        size: FrameSize,
        depth_offset: f32,
    ) -> Option<PoseMetrics> {
        let c = &self.constants;

        let left = confident(frame, JointId::LeftShoulder, c.shoulder_min_score)?;
        let right = confident(frame, JointId::RightShoulder, c.shoulder_min_score)?;

        let dx = right.x - left.x;
        let dy = right.y - left.y;
        let shoulder_width_px = (dx * dx + dy * dy).sqrt();
        let shoulder_angle_rad = wrap_angle(dy.atan2(dx));

        let center_x = (left.x + right.x) / 2.0;
        let mut center_y = (left.y + right.y) / 2.0;
        match frame.get(JointId::Nose) {
            Some(nose) if nose.score > c.nose_min_score => {
                center_y += (nose.y - center_y) * c.nose_pull;
            }
            _ => center_y += shoulder_width_px * c.neck_offset_ratio,
        }

        let left_hip = frame.get(JointId::LeftHip);
        let right_hip = frame.get(JointId::RightHip);
        let torso_height_px = match (left_hip, right_hip) {
            (Some(lh), Some(rh)) if lh.score > c.hip_min_score && rh.score > c.hip_min_score => {
                let hip_x = (lh.x + rh.x) / 2.0;
                let hip_y = (lh.y + rh.y) / 2.0;
                ((hip_x - center_x).powi(2) + (hip_y - center_y).powi(2)).sqrt()
            }
            _ => shoulder_width_px * c.torso_ratio,
        };

        let scores: Vec<f32> = [Some(left), Some(right), left_hip, right_hip]
            .into_iter()
            .flatten()
            .map(|kp| kp.score)
            .collect();
        let confidence = (scores.iter().sum::<f32>() / scores.len() as f32).clamp(0.0, 1.0);

        let depth = self
            .depth
            .estimate(shoulder_width_px, size.width, depth_offset);

        let metrics = PoseMetrics {
            shoulder_width_px,
            torso_height_px,
            shoulder_angle_rad,
            center_x,
            center_y,
            confidence,
            depth,
        };

        if !all_finite(&metrics) {
            trace!("discarding non-finite pose metrics");
            return None;
        }
        Some(metrics)
    }
}

impl Default for PoseMetricsExtractor {
    fn default() -> Self {
        Self::new(FitConstants::default())
    }
}

fn confident(frame: &PoseFrame, joint: JointId, min_score: f32) -> Option<&Keypoint> {
    frame.get(joint).filter(|kp| kp.score >= min_score)
}

fn all_finite(m: &PoseMetrics) -> bool {
    [
        m.shoulder_width_px,
        m.torso_height_px,
        m.shoulder_angle_rad,
        m.center_x,
        m.center_y,
        m.confidence,
        m.depth,
    ]
    .iter()
    .all(|v| v.is_finite())
}
