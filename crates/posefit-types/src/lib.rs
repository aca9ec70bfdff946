//! `posefit-types` – shared vocabulary for every posefit crate.
//!
//! Detections ([`Keypoint`], [`PoseFrame`]), the geometric summary derived
//! from them ([`PoseMetrics`]), the placement the render loop consumes
//! ([`ObjectTransform`]), the externally supplied [`Calibration`] surface and
//! the workspace-wide [`PoseError`].

use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Joints and keypoints
// ────────────────────────────────────────────────────────────────────────────

/// The fixed 17-joint vocabulary emitted by single-person keypoint detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointId {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl JointId {
    pub const COUNT: usize = 17;

    /// Every joint, in detector output order.
    pub const ALL: [JointId; Self::COUNT] = [
        JointId::Nose,
        JointId::LeftEye,
        JointId::RightEye,
        JointId::LeftEar,
        JointId::RightEar,
        JointId::LeftShoulder,
        JointId::RightShoulder,
        JointId::LeftElbow,
        JointId::RightElbow,
        JointId::LeftWrist,
        JointId::RightWrist,
        JointId::LeftHip,
        JointId::RightHip,
        JointId::LeftKnee,
        JointId::RightKnee,
        JointId::LeftAnkle,
        JointId::RightAnkle,
    ];

    /// Position of this joint in [`JointId::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// The detector's wire name, e.g. `"left_shoulder"`.
    pub fn name(self) -> &'static str {
        match self {
            JointId::Nose => "nose",
            JointId::LeftEye => "left_eye",
            JointId::RightEye => "right_eye",
            JointId::LeftEar => "left_ear",
            JointId::RightEar => "right_ear",
            JointId::LeftShoulder => "left_shoulder",
            JointId::RightShoulder => "right_shoulder",
            JointId::LeftElbow => "left_elbow",
            JointId::RightElbow => "right_elbow",
            JointId::LeftWrist => "left_wrist",
            JointId::RightWrist => "right_wrist",
            JointId::LeftHip => "left_hip",
            JointId::RightHip => "right_hip",
            JointId::LeftKnee => "left_knee",
            JointId::RightKnee => "right_knee",
            JointId::LeftAnkle => "left_ankle",
            JointId::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JointId {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JointId::ALL
            .into_iter()
            .find(|joint| joint.name() == s)
            .ok_or_else(|| PoseError::UnknownJoint(s.to_string()))
    }
}

/// A named anatomical landmark in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub joint: JointId,
    /// Horizontal pixel coordinate.
    pub x: f32,
    /// Vertical pixel coordinate (grows downward).
    pub y: f32,
    /// Detector confidence in `[0, 1]`.
    pub score: f32,
}

impl Keypoint {
    pub fn new(joint: JointId, x: f32, y: f32, score: f32) -> Self {
        Self { joint, x, y, score }
    }
}

/// All keypoints from one detection pass, with constant-time joint lookup.
///
/// Duplicated joints keep their first occurrence.
#[derive(Debug, Clone, Default)]
pub struct PoseFrame {
    keypoints: Vec<Keypoint>,
    lookup: [Option<usize>; JointId::COUNT],
}

impl PoseFrame {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        let mut lookup = [None; JointId::COUNT];
        for (i, kp) in keypoints.iter().enumerate() {
            let slot = &mut lookup[kp.joint.index()];
            if slot.is_none() {
                *slot = Some(i);
            }
        }
        Self { keypoints, lookup }
    }

    pub fn get(&self, joint: JointId) -> Option<&Keypoint> {
        self.lookup[joint.index()].map(|i| &self.keypoints[i])
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

impl FromIterator<Keypoint> for PoseFrame {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry primitives
// ────────────────────────────────────────────────────────────────────────────

/// Pixel dimensions of the video feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either dimension is zero (video metadata not loaded).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// A 3-D vector in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a (near-)zero vector.
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return None;
        }
        Some(self * (1.0 / len))
    }

    /// Move `factor` of the way from `self` toward `target`.
    pub fn lerp(self, target: Self, factor: f32) -> Self {
        self + (target - self) * factor
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Derived pose data
// ────────────────────────────────────────────────────────────────────────────

/// Geometric summary of one detected torso.
///
/// The smoothed variant owned by the temporal smoother has the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMetrics {
    pub shoulder_width_px: f32,
    pub torso_height_px: f32,
    /// Shoulder line angle in `(-π, π]`.
    pub shoulder_angle_rad: f32,
    /// Anchor point X (pixels).
    pub center_x: f32,
    /// Anchor point Y (pixels).
    pub center_y: f32,
    /// Mean score of the keypoints that contributed, in `[0, 1]`.
    pub confidence: f32,
    /// Camera-space distance estimate (world units).
    pub depth: f32,
}

/// Tracking quality, as decided by the state machine each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackingPhase {
    /// No usable detection; the overlay fades out.
    Lost,
    /// A detection exists but its confidence is too low to trust.
    Degraded,
    /// Fresh, confident detections drive the overlay.
    Tracking,
}

impl fmt::Display for TrackingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingPhase::Lost => write!(f, "lost"),
            TrackingPhase::Degraded => write!(f, "degraded"),
            TrackingPhase::Tracking => write!(f, "tracking"),
        }
    }
}

/// Current phase plus the (possibly decaying) confidence backing it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackingState {
    pub phase: TrackingPhase,
    pub confidence: f32,
}

impl Default for TrackingState {
    fn default() -> Self {
        Self {
            phase: TrackingPhase::Lost,
            confidence: 0.0,
        }
    }
}

/// Placement of the garment model; the only state the render loop reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectTransform {
    pub position: Vec3,
    pub scale: Vec3,
    /// Roll around the camera axis (radians).
    pub rotation_z: f32,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            scale: Vec3::splat(1.0),
            rotation_z: 0.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Calibration surface
// ────────────────────────────────────────────────────────────────────────────

/// Operator-tunable knobs consumed (never computed) by the engine.
///
/// `Default` matches the viewer's "reset all controls" values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Global temporal smoothing factor `S`, `0 < S < 1`.
    pub smoothing_factor: f32,
    /// Confidence at or below which a detection counts as degraded.
    pub min_confidence: f32,
    /// Manual scale multiplier applied on top of the fitted scale.
    pub scale_multiplier: f32,
    /// Horizontal offset as a fraction of frame width.
    pub offset_x: f32,
    /// Vertical offset as a fraction of frame height.
    pub offset_y: f32,
    /// Added to the shoulder angle (radians).
    pub rotation_offset: f32,
    /// Force `scale.y = scale.x`.
    pub uniform_scale: bool,
    /// Added to the estimated depth (world units).
    pub depth_offset: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            smoothing_factor: 0.65,
            min_confidence: 0.4,
            scale_multiplier: 1.15,
            offset_x: 0.0,
            offset_y: 0.05,
            rotation_offset: 0.0,
            uniform_scale: false,
            depth_offset: 0.1,
        }
    }
}

impl Calibration {
    /// Copy with factors clamped into their legal ranges and non-finite
    /// values replaced by defaults.
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
        Self {
            smoothing_factor: finite_or(self.smoothing_factor, defaults.smoothing_factor)
                .clamp(0.0, 1.0),
            min_confidence: finite_or(self.min_confidence, defaults.min_confidence)
                .clamp(0.0, 1.0),
            scale_multiplier: finite_or(self.scale_multiplier, defaults.scale_multiplier).max(0.0),
            offset_x: finite_or(self.offset_x, defaults.offset_x),
            offset_y: finite_or(self.offset_y, defaults.offset_y),
            rotation_offset: finite_or(self.rotation_offset, defaults.rotation_offset),
            uniform_scale: self.uniform_scale,
            depth_offset: finite_or(self.depth_offset, defaults.depth_offset),
        }
    }
}

/// Which keypoint model the detector collaborator should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorModel {
    /// Fast, lower-accuracy single-pose model.
    #[default]
    Lightning,
    /// Slower, higher-accuracy single-pose model.
    Thunder,
    /// Tracking disabled.
    Off,
}

impl fmt::Display for DetectorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorModel::Lightning => write!(f, "lightning"),
            DetectorModel::Thunder => write!(f, "thunder"),
            DetectorModel::Off => write!(f, "off"),
        }
    }
}

impl FromStr for DetectorModel {
    type Err = PoseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lightning" => Ok(DetectorModel::Lightning),
            "thunder" => Ok(DetectorModel::Thunder),
            "off" => Ok(DetectorModel::Off),
            other => Err(PoseError::ResourceUnavailable(format!(
                "unknown detector model '{other}'"
            ))),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Status indicator
// ────────────────────────────────────────────────────────────────────────────

/// Severity shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Good,
    Warning,
    Error,
}

/// One update for the user-visible status indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"posefit-runtime::pose_loop"`
    pub source: String,
    pub level: StatusLevel,
    pub message: String,
    pub tracking: TrackingState,
}

impl StatusEvent {
    pub fn new(
        source: impl Into<String>,
        level: StatusLevel,
        message: impl Into<String>,
        tracking: TrackingState,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            level,
            message: message.into(),
            tracking,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every failure the engine can observe. All of them are locally recoverable.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PoseError {
    #[error("Detector failure in {detector}: {details}")]
    DetectorFailure { detector: String, details: String },

    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Unknown joint name: {0}")]
    UnknownJoint(String),
}
