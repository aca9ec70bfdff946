//! In-process simulation for CI/CD testing without a webcam, model or GPU.
//!
//! - [`SimDetector`] – scripted responses, or a synthetic figure gently
//!   swaying in front of the camera. Configurable latency and periodic
//!   failures.
//! - [`SimFrameSource`] – a blank feed of fixed size, optionally "loading"
//!   for a number of polls.
//! - [`SimScene`] – the default perspective camera plus the fallback
//!   0.3 × 0.4 × 0.1 box model.
//! - [`SimRenderer`] – records every drawn transform.
//!
//! Every stub exposes a cloneable handle so tests can inspect it after it has
//! been moved into a loop.
//!
//! # Example
//!
//! ```rust
//! use posefit_hal::sim::{SimDetector, SimFrameSource};
//! use posefit_hal::{Detector, FrameSource};
//! use posefit_types::FrameSize;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut feed = SimFrameSource::new(FrameSize::new(640, 480));
//! let mut detector = SimDetector::swaying("sim");
//! let frame = feed.current_frame().unwrap();
//! let keypoints = detector.estimate(&frame).await.unwrap();
//! assert_eq!(keypoints.len(), 5);
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use posefit_perception::projection::{Camera, PerspectiveCamera};
use posefit_types::{DetectorModel, FrameSize, Keypoint, ObjectTransform, PoseError, Vec3};
use tracing::debug;

use crate::detector::{Detector, RawKeypoint, parse_keypoints};
use crate::scene::{Renderer, Scene};
use crate::video::{FrameSource, VideoFrame};

/// Bounding box of the fallback garment model (world units).
pub const FALLBACK_MODEL_SIZE: Vec3 = Vec3 {
    x: 0.3,
    y: 0.4,
    z: 0.1,
};

// ────────────────────────────────────────────────────────────────────────────
// Detector
// ────────────────────────────────────────────────────────────────────────────

enum Mode {
    Script(VecDeque<Result<Vec<Keypoint>, PoseError>>),
    Swaying { tick: u64 },
}

/// Counters shared with a [`SimDetector`] after it has been moved.
#[derive(Debug, Clone, Default)]
pub struct SimDetectorHandle {
    calls: Arc<AtomicUsize>,
    disposals: Arc<AtomicUsize>,
}

impl SimDetectorHandle {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn disposals(&self) -> usize {
        self.disposals.load(Ordering::SeqCst)
    }
}

/// A simulated keypoint detector.
pub struct SimDetector {
    name: String,
    mode: Mode,
    latency: Duration,
    failure_every: Option<usize>,
    handle: SimDetectorHandle,
}

impl SimDetector {
    /// Replay `responses` in order; once exhausted every call reports no
    /// person.
    pub fn scripted(
        name: impl Into<String>,
        responses: impl IntoIterator<Item = Result<Vec<Keypoint>, PoseError>>,
    ) -> Self {
        Self::with_mode(name, Mode::Script(responses.into_iter().collect()))
    }

    /// A synthetic upper body swaying side to side with a slight roll.
    pub fn swaying(name: impl Into<String>) -> Self {
        Self::with_mode(name, Mode::Swaying { tick: 0 })
    }

    fn with_mode(name: impl Into<String>, mode: Mode) -> Self {
        Self {
            name: name.into(),
            mode,
            latency: Duration::ZERO,
            failure_every: None,
            handle: SimDetectorHandle::default(),
        }
    }

    /// Simulated inference time per call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every `n`-th call with [`PoseError::DetectorFailure`].
    pub fn with_failure_every(mut self, n: usize) -> Self {
        self.failure_every = (n > 0).then_some(n);
        self
    }

    pub fn handle(&self) -> SimDetectorHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Detector for SimDetector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn estimate(&mut self, frame: &VideoFrame) -> Result<Vec<Keypoint>, PoseError> {
        let call = self.handle.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(n) = self.failure_every
            && call % n == 0
        {
            return Err(PoseError::DetectorFailure {
                detector: self.name.clone(),
                details: format!("simulated failure on call {call}"),
            });
        }

        match &mut self.mode {
            Mode::Script(responses) => responses.pop_front().unwrap_or_else(|| Ok(Vec::new())),
            Mode::Swaying { tick } => {
                *tick += 1;
                parse_keypoints(swaying_figure(frame.size, *tick))
            }
        }
    }

    async fn dispose(&mut self) {
        self.handle.disposals.fetch_add(1, Ordering::SeqCst);
        debug!(detector = %self.name, "sim detector disposed");
    }
}

fn swaying_figure(size: FrameSize, tick: u64) -> Vec<RawKeypoint> {
    let (w, h) = (size.width as f32, size.height as f32);
    let phase = tick as f32 * 0.1;
    let cx = w * 0.5 + phase.sin() * w * 0.08;
    let roll = (phase * 0.7).sin() * 0.08;
    let half = w * 0.16;
    let sy = h * 0.4;
    let (dx, dy) = (half * roll.cos(), half * roll.sin());

    let point = |name: &str, x: f32, y: f32, score: f32| RawKeypoint {
        name: name.to_string(),
        x,
        y,
        score,
    };
    vec![
        point("nose", cx, sy - h * 0.12, 0.85),
        point("left_shoulder", cx - dx, sy - dy, 0.9),
        point("right_shoulder", cx + dx, sy + dy, 0.9),
        point("left_hip", cx - dx * 0.8, sy + h * 0.38, 0.75),
        point("right_hip", cx + dx * 0.8, sy + h * 0.38, 0.75),
    ]
}

/// Simulated detector standing in for `model`, or `None` for
/// [`DetectorModel::Off`].
pub fn sim_detector_for(model: DetectorModel) -> Option<SimDetector> {
    match model {
        DetectorModel::Lightning => {
            Some(SimDetector::swaying("sim-lightning").with_latency(Duration::from_millis(8)))
        }
        DetectorModel::Thunder => {
            Some(SimDetector::swaying("sim-thunder").with_latency(Duration::from_millis(25)))
        }
        DetectorModel::Off => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Video feed
// ────────────────────────────────────────────────────────────────────────────

/// A blank video feed of fixed size.
pub struct SimFrameSource {
    size: FrameSize,
    warmup: AtomicU32,
    sequence: u64,
}

impl SimFrameSource {
    pub fn new(size: FrameSize) -> Self {
        Self::loading(size, 0)
    }

    /// Report no metadata for the first `polls` calls to `frame_size`.
    pub fn loading(size: FrameSize, polls: u32) -> Self {
        Self {
            size,
            warmup: AtomicU32::new(polls),
            sequence: 0,
        }
    }
}

impl FrameSource for SimFrameSource {
    fn frame_size(&self) -> Option<FrameSize> {
        let warming = self
            .warmup
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        (!warming).then_some(self.size)
    }

    fn current_frame(&mut self) -> Option<VideoFrame> {
        self.sequence += 1;
        Some(VideoFrame {
            size: self.size,
            sequence: self.sequence,
            data: Vec::new(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scene
// ────────────────────────────────────────────────────────────────────────────

/// Default camera plus the fallback box model. Both can be withheld to
/// simulate assets that are still loading.
pub struct SimScene {
    camera: RwLock<Option<Arc<dyn Camera>>>,
    model_size: RwLock<Option<Vec3>>,
}

impl SimScene {
    pub fn new(frame: FrameSize) -> Self {
        let camera: Arc<dyn Camera> = Arc::new(PerspectiveCamera::default().with_frame(frame));
        Self {
            camera: RwLock::new(Some(camera)),
            model_size: RwLock::new(Some(FALLBACK_MODEL_SIZE)),
        }
    }

    /// A scene whose model has not loaded yet.
    pub fn without_model(self) -> Self {
        self.set_model_size(None);
        self
    }

    /// A scene whose camera has not been created yet.
    pub fn without_camera(self) -> Self {
        self.set_camera(None);
        self
    }

    pub fn set_model_size(&self, size: Option<Vec3>) {
        if let Ok(mut guard) = self.model_size.write() {
            *guard = size;
        }
    }

    pub fn set_camera(&self, camera: Option<Arc<dyn Camera>>) {
        if let Ok(mut guard) = self.camera.write() {
            *guard = camera;
        }
    }
}

impl Scene for SimScene {
    fn camera(&self) -> Option<Arc<dyn Camera>> {
        self.camera.read().ok().and_then(|guard| guard.clone())
    }

    fn model_size(&self) -> Option<Vec3> {
        self.model_size.read().ok().and_then(|guard| *guard)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Renderer
// ────────────────────────────────────────────────────────────────────────────

/// Shared view of what a [`SimRenderer`] has drawn.
#[derive(Debug, Clone, Default)]
pub struct SimRendererHandle {
    draws: Arc<Mutex<Vec<ObjectTransform>>>,
    released: Arc<AtomicBool>,
}

impl SimRendererHandle {
    pub fn draws(&self) -> Vec<ObjectTransform> {
        self.draws
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn draw_count(&self) -> usize {
        self.draws.lock().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// A renderer that records every transform it is asked to draw.
#[derive(Default)]
pub struct SimRenderer {
    handle: SimRendererHandle,
}

impl SimRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SimRendererHandle {
        self.handle.clone()
    }
}

impl Renderer for SimRenderer {
    fn draw(&mut self, transform: &ObjectTransform) -> Result<(), PoseError> {
        if self.handle.released() {
            return Err(PoseError::Renderer("draw after release".to_string()));
        }
        self.handle
            .draws
            .lock()
            .map_err(|e| PoseError::Renderer(e.to_string()))?
            .push(*transform);
        Ok(())
    }

    fn release(&mut self) {
        self.handle.released.store(true, Ordering::SeqCst);
    }
}
