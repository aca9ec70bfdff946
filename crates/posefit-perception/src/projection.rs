//! Coordinate Mapper.
//!
//! Converts between video pixels and world coordinates through a perspective
//! [`Camera`]. Pixels are first mapped to normalized device coordinates (NDC,
//! `[-1, 1]` on both axes, Y up), unprojected to a world-space point, and the
//! ray from the camera through that point is intersected with the plane
//! `z = depth`.
//!
//! # Example
//!
//! ```rust
//! use posefit_perception::projection::{PerspectiveCamera, pixel_to_world, world_to_pixel};
//! use posefit_types::FrameSize;
//!
//! let camera = PerspectiveCamera::default();
//! let frame = FrameSize::new(640, 480);
//!
//! // The frame center lands on the camera axis.
//! let p = pixel_to_world(&camera, frame, 320.0, 240.0, -1.3).unwrap();
//! assert!(p.x.abs() < 1e-4);
//! assert!((p.y - 0.15).abs() < 1e-4);
//! assert!((p.z + 1.3).abs() < 1e-4);
//!
//! let (x, y) = world_to_pixel(&camera, frame, p).unwrap();
//! assert!((x - 320.0).abs() < 1e-2 && (y - 240.0).abs() < 1e-2);
//! ```

use posefit_types::{FrameSize, PoseError, Vec3};

const RAY_EPSILON: f32 = 1e-4;

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle` radians around `axis`. A zero axis yields identity.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        match axis.normalized() {
            Some(a) => {
                let (s, c) = (angle / 2.0).sin_cos();
                Self::new(c, a.x * s, a.y * s, a.z * s)
            }
            None => Self::identity(),
        }
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let r = self.mul(p).mul(self.conjugate());
        Vec3::new(r.x, r.y, r.z)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Camera seam
// ────────────────────────────────────────────────────────────────────────────

/// Projective camera as seen by the fitter.
///
/// Implemented by [`PerspectiveCamera`] and by whatever scene graph hosts the
/// real renderer.
pub trait Camera: Send + Sync {
    /// World-space camera origin.
    fn position(&self) -> Vec3;

    /// Map an NDC point (`z ∈ [-1, 1]`, near to far) to world space.
    fn unproject(&self, ndc: Vec3) -> Vec3;

    /// Map a world-space point to NDC. Points at or behind the camera plane
    /// produce non-finite components.
    fn project(&self, world: Vec3) -> Vec3;
}

/// Standard OpenGL-style perspective camera looking down its local −Z axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view (degrees).
    pub fov_deg: f32,
    /// Viewport width / height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov_deg,
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quaternion) -> Self {
        self.orientation = orientation;
        self
    }

    /// Match the aspect ratio of `frame`; an empty frame leaves it unchanged.
    pub fn with_frame(mut self, frame: FrameSize) -> Self {
        if !frame.is_empty() {
            self.aspect = frame.width as f32 / frame.height as f32;
        }
        self
    }

    fn focal(&self) -> f32 {
        1.0 / (self.fov_deg.to_radians() / 2.0).tan()
    }

    /// Depth terms of the projection matrix: `z_clip = a·z + b`.
    fn depth_terms(&self) -> (f32, f32) {
        let range = self.far - self.near;
        let a = -(self.far + self.near) / range;
        let b = -2.0 * self.far * self.near / range;
        (a, b)
    }
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            aspect: 4.0 / 3.0,
            near: 0.01,
            far: 100.0,
            position: Vec3::new(0.0, 0.15, 2.2),
            orientation: Quaternion::identity(),
        }
    }
}

impl Camera for PerspectiveCamera {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn unproject(&self, ndc: Vec3) -> Vec3 {
        let (a, b) = self.depth_terms();
        let f = self.focal();
        // ndc.z = -a - b / vz  ⇒  vz = -b / (ndc.z + a)
        let vz = -b / (ndc.z + a);
        let w = -vz;
        let view = Vec3::new(ndc.x * w * self.aspect / f, ndc.y * w / f, vz);
        self.position + self.orientation.rotate(view)
    }

    fn project(&self, world: Vec3) -> Vec3 {
        let view = self.orientation.conjugate().rotate(world - self.position);
        let (a, b) = self.depth_terms();
        let f = self.focal();
        let w = -view.z;
        Vec3::new(
            (f / self.aspect) * view.x / w,
            f * view.y / w,
            (a * view.z + b) / w,
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pixel ↔ world
// ────────────────────────────────────────────────────────────────────────────

/// NDC depth used to build the picking ray.
pub const UNPROJECT_NDC_Z: f32 = 0.5;

/// Map pixel `(x, y)` onto the world plane `z = depth`.
///
/// Fails with [`PoseError::DegenerateGeometry`] for an empty frame, a ray
/// parallel to the plane, or a non-finite intersection.
pub fn pixel_to_world(
    camera: &dyn Camera,
    frame: FrameSize,
    x: f32,
    y: f32,
    depth: f32,
) -> Result<Vec3, PoseError> {
    if frame.is_empty() {
        return Err(PoseError::DegenerateGeometry(
            "frame has zero size".to_string(),
        ));
    }
    let ndc_x = (x / frame.width as f32) * 2.0 - 1.0;
    let ndc_y = -((y / frame.height as f32) * 2.0 - 1.0);

    let origin = camera.position();
    let point = camera.unproject(Vec3::new(ndc_x, ndc_y, UNPROJECT_NDC_Z));
    let ray = (point - origin).normalized().ok_or_else(|| {
        PoseError::DegenerateGeometry("picking ray has zero length".to_string())
    })?;

    if ray.z.abs() < RAY_EPSILON {
        return Err(PoseError::DegenerateGeometry(
            "picking ray is parallel to the target plane".to_string(),
        ));
    }
    let t = (depth - origin.z) / ray.z;
    let hit = origin + ray * t;
    if !t.is_finite() || !hit.is_finite() {
        return Err(PoseError::DegenerateGeometry(format!(
            "non-finite intersection (t = {t})"
        )));
    }
    Ok(hit)
}

/// Project a world point back to pixel coordinates.
pub fn world_to_pixel(
    camera: &dyn Camera,
    frame: FrameSize,
    world: Vec3,
) -> Result<(f32, f32), PoseError> {
    if frame.is_empty() {
        return Err(PoseError::DegenerateGeometry(
            "frame has zero size".to_string(),
        ));
    }
    let ndc = camera.project(world);
    let x = (ndc.x + 1.0) / 2.0 * frame.width as f32;
    let y = (1.0 - ndc.y) / 2.0 * frame.height as f32;
    if !x.is_finite() || !y.is_finite() {
        return Err(PoseError::DegenerateGeometry(
            "point projects to infinity".to_string(),
        ));
    }
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    #[test]
    fn unproject_then_project_is_identity() {
        let cam = PerspectiveCamera::default();
        for ndc in [
            Vec3::new(0.0, 0.0, 0.5),
            Vec3::new(-0.8, 0.4, 0.2),
            Vec3::new(0.3, -0.9, 0.9),
        ] {
            let back = cam.project(cam.unproject(ndc));
            assert!((back.x - ndc.x).abs() < 1e-3, "x {} vs {}", back.x, ndc.x);
            assert!((back.y - ndc.y).abs() < 1e-3, "y {} vs {}", back.y, ndc.y);
        }
    }

    #[test]
    fn pixel_world_pixel_roundtrip() {
        let cam = PerspectiveCamera::default().with_frame(FRAME);
        for (px, py, depth) in [
            (100.0, 50.0, -1.3),
            (600.0, 400.0, -0.5),
            (320.0, 10.0, -4.0),
        ] {
            let world = pixel_to_world(&cam, FRAME, px, py, depth).unwrap();
            assert!((world.z - depth).abs() < 1e-3);
            let (x, y) = world_to_pixel(&cam, FRAME, world).unwrap();
            assert!((x - px).abs() < 0.05, "x {x} vs {px}");
            assert!((y - py).abs() < 0.05, "y {y} vs {py}");
        }
    }

    #[test]
    fn world_pixel_world_roundtrip() {
        let cam = PerspectiveCamera::default().with_frame(FRAME);
        for world in [Vec3::new(0.2, -0.1, -1.3), Vec3::new(-0.5, 0.4, -3.0)] {
            let (px, py) = world_to_pixel(&cam, FRAME, world).unwrap();
            let back = pixel_to_world(&cam, FRAME, px, py, world.z).unwrap();
            assert!((back - world).length() < 1e-4, "{back:?} vs {world:?}");
        }
    }

    #[test]
    fn pixel_y_grows_downward() {
        let cam = PerspectiveCamera::default();
        let top = pixel_to_world(&cam, FRAME, 320.0, 0.0, -1.0).unwrap();
        let bottom = pixel_to_world(&cam, FRAME, 320.0, 480.0, -1.0).unwrap();
        assert!(top.y > bottom.y);
    }

    #[test]
    fn farther_plane_spreads_wider() {
        let cam = PerspectiveCamera::default();
        let near_l = pixel_to_world(&cam, FRAME, 0.0, 240.0, 0.0).unwrap();
        let near_r = pixel_to_world(&cam, FRAME, 640.0, 240.0, 0.0).unwrap();
        let far_l = pixel_to_world(&cam, FRAME, 0.0, 240.0, -5.0).unwrap();
        let far_r = pixel_to_world(&cam, FRAME, 640.0, 240.0, -5.0).unwrap();
        assert!((far_r.x - far_l.x) > (near_r.x - near_l.x));
    }

    #[test]
    fn empty_frame_is_degenerate() {
        let cam = PerspectiveCamera::default();
        let err = pixel_to_world(&cam, FrameSize::new(0, 480), 1.0, 1.0, -1.0).unwrap_err();
        assert!(matches!(err, PoseError::DegenerateGeometry(_)));
    }

    #[test]
    fn ray_parallel_to_plane_is_degenerate() {
        // Yawed 90°: the center ray runs along −X, parallel to any z-plane.
        let cam = PerspectiveCamera::default()
            .with_orientation(Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2));
        let err = pixel_to_world(&cam, FRAME, 320.0, 240.0, -1.0).unwrap_err();
        assert!(matches!(err, PoseError::DegenerateGeometry(_)));
    }

    #[test]
    fn point_on_camera_plane_does_not_project() {
        let cam = PerspectiveCamera::default();
        let on_plane = Vec3::new(0.5, 0.15, 2.2);
        assert!(world_to_pixel(&cam, FRAME, on_plane).is_err());
    }

    #[test]
    fn quaternion_yaw_rotates_forward_axis() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), FRAC_PI_2);
        let r = q.rotate(Vec3::new(0.0, 0.0, -1.0));
        assert!((r.x + 1.0).abs() < 1e-5, "x = {}", r.x);
        assert!(r.z.abs() < 1e-5);
        let id = q.mul(q.conjugate());
        assert!((id.w - 1.0).abs() < 1e-5);
    }
}
