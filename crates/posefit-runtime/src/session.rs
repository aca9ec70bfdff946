//! [`Session`] – one pose loop and one render loop sharing a transform
//! channel and a stop latch.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use posefit_hal::sim::{SimDetector, SimFrameSource, SimRenderer, SimScene};
//! use posefit_runtime::session::{Session, SessionConfig, SessionParts};
//! use posefit_types::FrameSize;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let frame = FrameSize::new(640, 480);
//! let session = Session::start(
//!     SessionConfig::default(),
//!     SessionParts {
//!         detector: Some(Box::new(SimDetector::swaying("sim"))),
//!         source: Box::new(SimFrameSource::new(frame)),
//!         scene: Arc::new(SimScene::new(frame)),
//!         renderer: Box::new(SimRenderer::new()),
//!     },
//! );
//! session.stop();
//! let summary = session.shutdown().await.unwrap();
//! assert!(summary.render_draws <= 1);
//! # }
//! ```

use std::sync::Arc;

use posefit_hal::{Detector, FrameSource, Renderer, Scene};
use posefit_middleware::{StatusBus, StatusSubscriber, TransformReader, transform_channel};
use posefit_perception::constants::FitConstants;
use posefit_types::{Calibration, ObjectTransform, PoseError};
use tracing::info;

use crate::lifecycle::{LoopHandle, StopSignal};
use crate::pose_loop::{PoseControl, PoseLoop, PoseLoopConfig};
use crate::render_loop::RenderLoop;

/// Rates and tuning for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub pose_hz: f32,
    pub render_hz: f32,
    pub calibration: Calibration,
    pub constants: FitConstants,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pose_hz: 30.0,
            render_hz: 60.0,
            calibration: Calibration::default(),
            constants: FitConstants::default(),
        }
    }
}

/// Injected collaborators. The session owns them until shutdown.
pub struct SessionParts {
    pub detector: Option<Box<dyn Detector>>,
    pub source: Box<dyn FrameSource>,
    pub scene: Arc<dyn Scene>,
    pub renderer: Box<dyn Renderer>,
}

/// Tick and draw counts reported at shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub pose_ticks: u64,
    pub render_draws: u64,
}

pub struct Session {
    signal: StopSignal,
    control: PoseControl,
    reader: TransformReader,
    status: StatusBus,
    pose: LoopHandle<u64>,
    render: LoopHandle<u64>,
}

impl Session {
    /// Spawn both loops on the current Tokio runtime.
    pub fn start(config: SessionConfig, parts: SessionParts) -> Self {
        let signal = StopSignal::new();
        let status = StatusBus::default();
        let (publisher, reader) = transform_channel(ObjectTransform::default());

        let (pose_loop, control) = PoseLoop::new(
            PoseLoopConfig {
                rate_hz: config.pose_hz,
                calibration: config.calibration,
                constants: config.constants,
            },
            parts.detector,
            parts.source,
            parts.scene,
            publisher,
            status.clone(),
        );
        let render_loop = RenderLoop::new(parts.renderer, reader.clone(), config.render_hz);

        let pose = LoopHandle::spawn("pose loop", signal.clone(), |stop| pose_loop.run(stop));
        let render = LoopHandle::spawn("render loop", signal.clone(), |stop| {
            render_loop.run(stop)
        });
        info!(
            pose_hz = config.pose_hz,
            render_hz = config.render_hz,
            "session started"
        );

        Self {
            signal,
            control,
            reader,
            status,
            pose,
            render,
        }
    }

    pub fn control(&self) -> &PoseControl {
        &self.control
    }

    pub fn reader(&self) -> TransformReader {
        self.reader.clone()
    }

    pub fn subscribe_status(&self) -> StatusSubscriber {
        self.status.subscribe()
    }

    /// The latch both loops watch. Clone it into signal handlers.
    pub fn stop_signal(&self) -> StopSignal {
        self.signal.clone()
    }

    /// Request both loops to stop. Idempotent.
    pub fn stop(&self) {
        if self.signal.trigger() {
            info!("session stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_triggered()
    }

    /// Stop (if not already) and wait for both loops to finish.
    ///
    /// # Errors
    ///
    /// [`PoseError::Channel`] if either loop task panicked.
    pub async fn shutdown(self) -> Result<SessionSummary, PoseError> {
        self.stop();
        let pose_ticks = self.pose.join().await?;
        let render_draws = self.render.join().await?;
        info!(pose_ticks, render_draws, "session shut down");
        Ok(SessionSummary {
            pose_ticks,
            render_draws,
        })
    }
}
