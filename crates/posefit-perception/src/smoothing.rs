//! Temporal Smoother.
//!
//! Exponential smoothing of successive [`PoseMetrics`], one persisted value.
//! Each field class blends with its own coefficient:
//!
//! ```text
//! alpha    = clamp(S × weight, 0, 1)
//! smoothed = prev × alpha + raw × (1 − alpha)
//! ```
//!
//! where `S` is the global smoothing factor. Position fields (`center_x`,
//! `center_y`, `depth`) weigh 0.5, scale fields (`shoulder_width_px`,
//! `torso_height_px`) 0.4 and the shoulder angle 0.3. The angle blends along
//! the shortest arc. Confidence is never smoothed.
//!
//! # Example
//!
//! ```rust
//! use posefit_perception::smoothing::TemporalSmoother;
//! use posefit_types::PoseMetrics;
//!
//! let raw = PoseMetrics {
//!     shoulder_width_px: 200.0, torso_height_px: 215.0, shoulder_angle_rad: 0.0,
//!     center_x: 200.0, center_y: 185.0, confidence: 0.85, depth: 1.3,
//! };
//!
//! let mut smoother = TemporalSmoother::new(0.65);
//! let first = smoother.update(&raw);
//! assert_eq!(first, raw); // the first frame seeds the filter as-is
//! ```

use posefit_types::PoseMetrics;

use crate::angle::{shortest_delta, wrap_angle};
use crate::constants::FitConstants;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Weights {
    position: f32,
    scale: f32,
    rotation: f32,
}

/// Per-field exponential smoother for [`PoseMetrics`].
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    smoothing_factor: f32,
    weights: Weights,
    state: Option<PoseMetrics>,
}

impl TemporalSmoother {
    /// Smoother with the default field weights. `smoothing_factor` is clamped
    /// to `[0, 1]`.
    pub fn new(smoothing_factor: f32) -> Self {
        Self::with_constants(smoothing_factor, &FitConstants::default())
    }

    pub fn with_constants(smoothing_factor: f32, constants: &FitConstants) -> Self {
        Self {
            smoothing_factor: clamp_unit(smoothing_factor),
            weights: Weights {
                position: constants.position_weight,
                scale: constants.scale_weight,
                rotation: constants.rotation_weight,
            },
            state: None,
        }
    }

    /// Blend `raw` into the persisted value and return the new smoothed
    /// metrics. The first call after construction or [`reset`](Self::reset)
    /// adopts `raw` unchanged.
    pub fn update(&mut self, raw: &PoseMetrics) -> PoseMetrics {
        let next = match self.state {
            None => PoseMetrics {
                shoulder_angle_rad: wrap_angle(raw.shoulder_angle_rad),
                ..*raw
            },
            Some(prev) => {
                let pos = self.alpha(self.weights.position);
                let scale = self.alpha(self.weights.scale);
                let rot = self.alpha(self.weights.rotation);
                PoseMetrics {
                    shoulder_width_px: blend(prev.shoulder_width_px, raw.shoulder_width_px, scale),
                    torso_height_px: blend(prev.torso_height_px, raw.torso_height_px, scale),
                    shoulder_angle_rad: wrap_angle(
                        prev.shoulder_angle_rad
                            + shortest_delta(prev.shoulder_angle_rad, raw.shoulder_angle_rad)
                                * (1.0 - rot),
                    ),
                    center_x: blend(prev.center_x, raw.center_x, pos),
                    center_y: blend(prev.center_y, raw.center_y, pos),
                    confidence: raw.confidence,
                    depth: blend(prev.depth, raw.depth, pos),
                }
            }
        };
        self.state = Some(next);
        next
    }

    /// Forget the persisted value; the next update seeds afresh.
    pub fn reset(&mut self) {
        self.state = None;
    }

    pub fn current(&self) -> Option<&PoseMetrics> {
        self.state.as_ref()
    }

    /// Multiply the persisted confidence by `factor` and return the result,
    /// or `None` if nothing has been smoothed yet.
    pub fn decay_confidence(&mut self, factor: f32) -> Option<f32> {
        let state = self.state.as_mut()?;
        state.confidence = clamp_unit(state.confidence * factor);
        Some(state.confidence)
    }

    pub fn smoothing_factor(&self) -> f32 {
        self.smoothing_factor
    }

    pub fn set_smoothing_factor(&mut self, factor: f32) {
        self.smoothing_factor = clamp_unit(factor);
    }

    fn alpha(&self, weight: f32) -> f32 {
        clamp_unit(self.smoothing_factor * weight)
    }
}

fn blend(prev: f32, raw: f32, alpha: f32) -> f32 {
    prev * alpha + raw * (1.0 - alpha)
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
