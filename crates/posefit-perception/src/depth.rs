//! Monocular depth estimation.
//!
//! A person's shoulders span a roughly constant physical width, so their
//! apparent width in the frame is inversely proportional to distance:
//!
//! ```text
//! normalized = shoulder_width_px / frame_width
//! depth      = (reference / normalized) × gain + depth_offset
//! ```
//!
//! The result is clamped to `[depth_min, depth_max]`. Degenerate inputs
//! (zero frame width, vanishing or non-finite shoulder width) resolve to the
//! far bound rather than an error.
//!
//! # Example
//!
//! ```rust
//! use posefit_perception::depth::DepthEstimator;
//!
//! let estimator = DepthEstimator::default();
//! let d = estimator.estimate(200.0, 640, 0.1);
//! assert!((d - 1.3).abs() < 1e-4);
//! ```

use crate::constants::FitConstants;

/// Shoulder-width based depth estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthEstimator {
    reference_width: f32,
    gain: f32,
    min: f32,
    max: f32,
}

impl DepthEstimator {
    pub fn new(constants: &FitConstants) -> Self {
        Self {
            reference_width: constants.reference_shoulder_width,
            gain: constants.depth_gain,
            min: constants.depth_min,
            max: constants.depth_max,
        }
    }

    /// Estimated camera distance for a torso whose shoulders span
    /// `shoulder_width_px` in a frame `frame_width` pixels wide.
    pub fn estimate(&self, shoulder_width_px: f32, frame_width: u32, depth_offset: f32) -> f32 {
        if frame_width == 0 || !shoulder_width_px.is_finite() {
            return self.max;
        }
        let normalized = shoulder_width_px / frame_width as f32;
        if normalized <= f32::EPSILON {
            return self.max;
        }
        let depth = (self.reference_width / normalized) * self.gain + depth_offset;
        if depth.is_finite() {
            depth.clamp(self.min, self.max)
        } else {
            self.max
        }
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.min, self.max)
    }
}

impl Default for DepthEstimator {
    fn default() -> Self {
        Self::new(&FitConstants::default())
    }
}
