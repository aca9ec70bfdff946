//! [`TransformApplier`] – fits the garment model onto smoothed pose metrics.
//!
//! Each call to [`TransformApplier::apply`] eases the model toward the pose:
//!
//! 1. **Position** – the anchor point (mirrored for a selfie view, shifted by
//!    the calibration offsets) is mapped onto the plane `z = −depth` and the
//!    base position moves 30 % of the way there.
//! 2. **Scale** – shoulder width and torso height are converted to world
//!    units at the same depth and divided by the model's bounding box, with
//!    garment fit margins; each axis moves 20 % of the way.
//! 3. **Rotation** – the shoulder angle plus the calibration offset, eased
//!    25 % along the shorter arc.
//! 4. **Bob** – a small sinusoidal lift added to the published Y only; the
//!    base position never accumulates it.
//!
//! Every intermediate value is computed before any state is touched, so a
//! degenerate mapping leaves the applier exactly as it was.

use posefit_perception::angle::{lerp_angle, wrap_angle};
use posefit_perception::constants::FitConstants;
use posefit_perception::projection::{Camera, pixel_to_world};
use posefit_types::{Calibration, FrameSize, ObjectTransform, PoseError, PoseMetrics, Vec3};
use tracing::trace;

/// Smallest model dimension the fitter will divide by.
const MIN_MODEL_EXTENT: f32 = 1e-6;

/// Everything besides the metrics that a fit depends on.
pub struct FitContext<'a> {
    pub calibration: &'a Calibration,
    /// Model-space bounding-box size of the garment.
    pub model_size: Vec3,
    pub camera: &'a dyn Camera,
    pub frame: FrameSize,
    /// Wall-clock seconds, drives the idle bob.
    pub time_s: f32,
}

/// Owns the model's base (un-bobbed) transform and derives the published one.
#[derive(Debug, Clone)]
pub struct TransformApplier {
    constants: FitConstants,
    base: ObjectTransform,
    published: ObjectTransform,
}

impl TransformApplier {
    pub fn new(constants: FitConstants) -> Self {
        Self {
            constants,
            base: ObjectTransform::default(),
            published: ObjectTransform::default(),
        }
    }

    /// Ease the model toward `metrics` and return the transform to publish.
    ///
    /// # Errors
    ///
    /// [`PoseError::DegenerateGeometry`] when the model has a zero X or Y
    /// extent or any coordinate mapping fails. State is left untouched.
    pub fn apply(
        &mut self,
        metrics: &PoseMetrics,
        ctx: &FitContext<'_>,
    ) -> Result<ObjectTransform, PoseError> {
        let c = &self.constants;
        let cal = ctx.calibration;

        if !(ctx.model_size.x > MIN_MODEL_EXTENT && ctx.model_size.y > MIN_MODEL_EXTENT) {
            return Err(PoseError::DegenerateGeometry(format!(
                "model bounding box too small: {:?}",
                ctx.model_size
            )));
        }

        let (w, h) = (ctx.frame.width as f32, ctx.frame.height as f32);
        let depth = -metrics.depth;
        let map = |x: f32, y: f32| pixel_to_world(ctx.camera, ctx.frame, x, y, depth);

        // Position target.
        let target_x = w - metrics.center_x - cal.offset_x * w;
        let target_y = metrics.center_y + cal.offset_y * c.offset_y_gain * h;
        let target_position = map(target_x, target_y)?;

        // Scale target.
        let origin = map(0.0, 0.0)?;
        let world_width = (origin.x - map(metrics.shoulder_width_px, 0.0)?.x).abs();
        let world_height = (origin.y - map(0.0, metrics.torso_height_px)?.y).abs();

        let scale_x = world_width / ctx.model_size.x * c.width_fit * cal.scale_multiplier;
        let scale_y = if cal.uniform_scale {
            scale_x
        } else {
            world_height / ctx.model_size.y * c.height_fit * cal.scale_multiplier
        };
        let scale_z = (scale_x + scale_y) / 2.0 * c.depth_scale_ratio;
        let target_scale = Vec3::new(scale_x, scale_y, scale_z);

        let target_rotation = wrap_angle(metrics.shoulder_angle_rad + cal.rotation_offset);

        if !target_scale.is_finite() || !target_rotation.is_finite() {
            return Err(PoseError::DegenerateGeometry(
                "non-finite fit target".to_string(),
            ));
        }

        self.base = ObjectTransform {
            position: self.base.position.lerp(target_position, c.position_lerp),
            scale: self.base.scale.lerp(target_scale, c.scale_lerp),
            rotation_z: lerp_angle(self.base.rotation_z, target_rotation, c.rotation_lerp),
        };

        let bob = (ctx.time_s * c.bob_frequency).sin() * c.bob_amplitude;
        let mut published = self.base;
        published.position.y += bob;
        self.published = published;

        trace!(
            x = published.position.x,
            y = published.position.y,
            z = published.position.z,
            scale_x = published.scale.x,
            "fitted transform"
        );
        Ok(published)
    }

    /// Shrink the model one step while tracking is lost.
    ///
    /// Returns the transform to publish, or `None` once the scale is already
    /// at or below the visibility floor (nothing to write).
    pub fn fade(&mut self) -> Option<ObjectTransform> {
        if self.base.scale.x <= self.constants.visibility_floor {
            return None;
        }
        self.base.scale = self.base.scale * self.constants.fade_factor;
        self.published.scale = self.base.scale;
        Some(self.published)
    }

    /// The transform most recently returned by [`apply`](Self::apply) or
    /// [`fade`](Self::fade).
    pub fn published(&self) -> &ObjectTransform {
        &self.published
    }

    /// The un-bobbed base transform.
    pub fn base(&self) -> &ObjectTransform {
        &self.base
    }
}

impl Default for TransformApplier {
    fn default() -> Self {
        Self::new(FitConstants::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posefit_perception::projection::PerspectiveCamera;
    use std::f32::consts::PI;

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };
    const MODEL: Vec3 = Vec3 {
        x: 0.3,
        y: 0.4,
        z: 0.1,
    };

    fn metrics() -> PoseMetrics {
        PoseMetrics {
            shoulder_width_px: 200.0,
            torso_height_px: 215.0,
            shoulder_angle_rad: 0.0,
            center_x: 200.0,
            center_y: 185.0,
            confidence: 0.85,
            depth: 1.3,
        }
    }

    fn fit(
        applier: &mut TransformApplier,
        m: &PoseMetrics,
        cal: &Calibration,
        time_s: f32,
    ) -> Result<ObjectTransform, PoseError> {
        let camera = PerspectiveCamera::default().with_frame(FRAME);
        applier.apply(
            m,
            &FitContext {
                calibration: cal,
                model_size: MODEL,
                camera: &camera,
                frame: FRAME,
                time_s,
            },
        )
    }

    #[test]
    fn converges_onto_mirrored_anchor() {
        let mut applier = TransformApplier::default();
        let cal = Calibration {
            offset_y: 0.0,
            ..Calibration::default()
        };
        let mut t = ObjectTransform::default();
        for _ in 0..60 {
            t = fit(&mut applier, &metrics(), &cal, 0.0).unwrap();
        }
        let camera = PerspectiveCamera::default().with_frame(FRAME);
        // Anchor x=200 mirrors to 440 px.
        let expected = pixel_to_world(&camera, FRAME, 440.0, 185.0, -1.3).unwrap();
        assert!((t.position.x - expected.x).abs() < 1e-3);
        assert!((t.position.y - expected.y).abs() < 1e-3);
        assert!((t.position.z + 1.3).abs() < 1e-3);
        assert!(t.position.x > 0.0, "mirrored anchor should sit right of center");
    }

    #[test]
    fn first_step_moves_thirty_percent() {
        let mut applier = TransformApplier::default();
        let cal = Calibration::default();
        let t = fit(&mut applier, &metrics(), &cal, 0.0).unwrap();
        let camera = PerspectiveCamera::default().with_frame(FRAME);
        let target = pixel_to_world(&camera, FRAME, 440.0, 185.0 + 0.05 * 1.3 * 480.0, -1.3)
            .unwrap();
        assert!((t.position.x - target.x * 0.3).abs() < 1e-4);
        assert!((t.position.z - target.z * 0.3).abs() < 1e-4);
        // Scale eases 20 % from unit scale.
        assert!(t.scale.x > 0.0);
    }

    #[test]
    fn uniform_scale_and_depth_ratio() {
        let mut applier = TransformApplier::default();
        let cal = Calibration {
            uniform_scale: true,
            ..Calibration::default()
        };
        let mut t = ObjectTransform::default();
        for _ in 0..80 {
            t = fit(&mut applier, &metrics(), &cal, 0.0).unwrap();
        }
        assert!((t.scale.x - t.scale.y).abs() < 1e-4);
        assert!((t.scale.z - t.scale.x * 0.5).abs() < 1e-4);
    }

    #[test]
    fn scale_multiplier_scales_target() {
        let converge = |mult: f32| {
            let mut applier = TransformApplier::default();
            let cal = Calibration {
                scale_multiplier: mult,
                ..Calibration::default()
            };
            let mut t = ObjectTransform::default();
            for _ in 0..80 {
                t = fit(&mut applier, &metrics(), &cal, 0.0).unwrap();
            }
            t.scale.x
        };
        let one = converge(1.0);
        let two = converge(2.0);
        assert!((two / one - 2.0).abs() < 1e-3);
    }

    #[test]
    fn rotation_eases_along_short_arc() {
        let mut applier = TransformApplier::default();
        let cal = Calibration::default();
        let m = PoseMetrics {
            shoulder_angle_rad: PI - 0.05,
            ..metrics()
        };
        let mut t = ObjectTransform::default();
        for _ in 0..40 {
            t = fit(&mut applier, &m, &cal, 0.0).unwrap();
        }
        let m2 = PoseMetrics {
            shoulder_angle_rad: -PI + 0.05,
            ..metrics()
        };
        let after = fit(&mut applier, &m2, &cal, 0.0).unwrap();
        // Crossing the seam moves 0.025 rad, not ~1.5 rad the long way.
        assert!((after.rotation_z.abs() - t.rotation_z.abs()).abs() < 0.1);
        assert!(after.rotation_z.abs() > 3.0);
    }

    #[test]
    fn bob_is_not_accumulated() {
        let mut applier = TransformApplier::default();
        let cal = Calibration::default();
        for _ in 0..60 {
            fit(&mut applier, &metrics(), &cal, 0.0).unwrap();
        }
        let rest = *applier.base();
        let quarter = PI / 4.0; // sin(2t) = 1
        let mut peak = ObjectTransform::default();
        for _ in 0..50 {
            peak = fit(&mut applier, &metrics(), &cal, quarter).unwrap();
        }
        assert!((peak.position.y - rest.position.y - 0.005).abs() < 1e-4);
        assert!((applier.base().position.y - rest.position.y).abs() < 1e-4);
    }

    #[test]
    fn zero_model_size_is_degenerate_and_untouched() {
        let mut applier = TransformApplier::default();
        let cal = Calibration::default();
        fit(&mut applier, &metrics(), &cal, 0.0).unwrap();
        let before = *applier.published();

        let camera = PerspectiveCamera::default();
        let err = applier
            .apply(
                &metrics(),
                &FitContext {
                    calibration: &cal,
                    model_size: Vec3::new(0.0, 0.4, 0.1),
                    camera: &camera,
                    frame: FRAME,
                    time_s: 0.0,
                },
            )
            .unwrap_err();
        assert!(matches!(err, PoseError::DegenerateGeometry(_)));
        assert_eq!(*applier.published(), before);
    }

    #[test]
    fn empty_frame_is_degenerate() {
        let mut applier = TransformApplier::default();
        let cal = Calibration::default();
        let camera = PerspectiveCamera::default();
        let result = applier.apply(
            &metrics(),
            &FitContext {
                calibration: &cal,
                model_size: MODEL,
                camera: &camera,
                frame: FrameSize::new(0, 0),
                time_s: 0.0,
            },
        );
        assert!(result.is_err());
        assert_eq!(*applier.base(), ObjectTransform::default());
    }

    #[test]
    fn fade_decays_until_floor() {
        let mut applier = TransformApplier::default();
        let mut steps = 0;
        let mut last = 1.0;
        while let Some(t) = applier.fade() {
            assert!((t.scale.x - last * 0.9).abs() < 1e-5);
            last = t.scale.x;
            steps += 1;
            assert!(steps < 100);
        }
        // 0.9ⁿ ≤ 0.1 first holds at n = 22.
        assert_eq!(steps, 22);
        assert!(applier.published().scale.x <= 0.1);
        assert!(applier.fade().is_none());
    }
}
