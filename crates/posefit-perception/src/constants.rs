//! Empirical fitting constants.
//!
//! These values were tuned by hand against webcam footage of a person
//! standing roughly two metres from the camera. They are grouped here so that
//! every stage of the pipeline reads them from a single source, and so that
//! tests can construct deliberately skewed variants.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitConstants {
    // ── Keypoint gating ─────────────────────────────────────────────────────
    /// Minimum score for each shoulder; below it the frame yields no metrics.
    pub shoulder_min_score: f32,
    /// Minimum score for each hip before the hip center is trusted.
    pub hip_min_score: f32,
    /// Nose score above which the anchor is pulled toward the nose.
    pub nose_min_score: f32,

    // ── Anchor and torso geometry ───────────────────────────────────────────
    /// Fraction of the way the anchor Y moves from the shoulder midpoint to
    /// the nose.
    pub nose_pull: f32,
    /// Downward anchor offset, as a fraction of shoulder width, when the nose
    /// is not usable.
    pub neck_offset_ratio: f32,
    /// Torso height as a multiple of shoulder width when the hips are not
    /// usable.
    pub torso_ratio: f32,

    // ── Depth ───────────────────────────────────────────────────────────────
    /// Normalized shoulder width (fraction of frame width) at the reference
    /// distance.
    pub reference_shoulder_width: f32,
    /// Gain applied to the reference/observed width ratio.
    pub depth_gain: f32,
    pub depth_min: f32,
    pub depth_max: f32,

    // ── Temporal smoothing weights (multiplied by the smoothing factor) ────
    pub position_weight: f32,
    pub scale_weight: f32,
    pub rotation_weight: f32,

    // ── Transform fitting ───────────────────────────────────────────────────
    /// Gain on the vertical calibration offset (fraction of frame height).
    pub offset_y_gain: f32,
    /// Garment width relative to the world-space shoulder width.
    pub width_fit: f32,
    /// Garment height relative to the world-space torso height.
    pub height_fit: f32,
    /// Depth scale relative to the mean of the X and Y scales.
    pub depth_scale_ratio: f32,
    pub position_lerp: f32,
    pub scale_lerp: f32,
    pub rotation_lerp: f32,
    /// Idle vertical bob amplitude (world units).
    pub bob_amplitude: f32,
    /// Idle vertical bob angular frequency (rad/s).
    pub bob_frequency: f32,

    // ── Tracking regulation ─────────────────────────────────────────────────
    /// Per-tick scale multiplier while tracking is lost.
    pub fade_factor: f32,
    /// Scale below which the fade stops.
    pub visibility_floor: f32,
    /// Per-tick multiplier on the held confidence while degraded.
    pub hold_decay: f32,
    /// Held confidence at or below which a degraded pose is dropped.
    pub hold_floor: f32,
    /// Number of smoothed poses retained for prediction.
    pub history_capacity: usize,
}

impl Default for FitConstants {
    fn default() -> Self {
        Self {
            shoulder_min_score: 0.5,
            hip_min_score: 0.3,
            nose_min_score: 0.3,

            nose_pull: 0.3,
            neck_offset_ratio: 0.15,
            torso_ratio: 2.2,

            reference_shoulder_width: 0.15,
            depth_gain: 2.5,
            depth_min: 0.3,
            depth_max: 10.0,

            position_weight: 0.5,
            scale_weight: 0.4,
            rotation_weight: 0.3,

            offset_y_gain: 1.3,
            width_fit: 1.6,
            height_fit: 1.3,
            depth_scale_ratio: 0.5,
            position_lerp: 0.3,
            scale_lerp: 0.2,
            rotation_lerp: 0.25,
            bob_amplitude: 0.005,
            bob_frequency: 2.0,

            fade_factor: 0.9,
            visibility_floor: 0.1,
            hold_decay: 0.95,
            hold_floor: 0.3,
            history_capacity: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoothing_weights_stay_below_one_at_max_factor() {
        let c = FitConstants::default();
        for w in [c.position_weight, c.scale_weight, c.rotation_weight] {
            assert!(w > 0.0 && w < 1.0);
        }
    }

    #[test]
    fn depth_bounds_are_ordered() {
        let c = FitConstants::default();
        assert!(c.depth_min < c.depth_max);
    }

    #[test]
    fn constants_roundtrip_through_json() {
        let c = FitConstants::default();
        let json = serde_json::to_string(&c).unwrap();
        let back: FitConstants = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
