//! [`PoseLoop`] – the detection and fitting orchestrator.
//!
//! Each tick:
//!
//! 1. **Control** – drain pending [`PoseCommand`]s and pick up calibration
//!    changes.
//! 2. **Readiness** – no-op with [`PoseError::ResourceUnavailable`] until a
//!    detector, the video metadata, the camera and the model are all present.
//! 3. **Detect** – await the [`Detector`]. This is the only suspension point
//!    inside a tick. Detector errors are logged, reported on the status bus
//!    and treated as "no person".
//! 4. **Measure** – extract raw [`PoseMetrics`][posefit_types::PoseMetrics].
//! 5. **Regulate** – step the [`TrackingStateMachine`], which smooths and
//!    classifies the measurement.
//! 6. **Fit & publish** – carry out the [`TrackingDecision`] with the
//!    [`TransformApplier`] and publish the result through the single
//!    [`TransformPublisher`].
//! 7. **Report** – publish a [`StatusEvent`] when the displayed status
//!    changes.
//!
//! [`PoseLoop::run`] drives ticks from a [`tokio::time::interval`] with
//! [`MissedTickBehavior::Delay`], so the effective rate is bounded by
//! detector throughput. The stop signal is only observed between ticks; a
//! detection in flight always completes. The detector is disposed exactly
//! once on exit.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use posefit_hal::{Detector, FrameSource, Scene};
use posefit_kernel::{TrackingDecision, TrackingStateMachine};
use posefit_middleware::{StatusBus, TransformPublisher};
use posefit_perception::constants::FitConstants;
use posefit_perception::metrics::PoseMetricsExtractor;
use posefit_types::{
    Calibration, PoseError, PoseFrame, StatusEvent, StatusLevel, TrackingPhase, TrackingState,
};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::fit::{FitContext, TransformApplier};
use crate::history::PoseHistory;
use crate::lifecycle::{stopped, tick_period};

const STATUS_SOURCE: &str = "posefit-runtime::pose_loop";

/// Confidence above which tracking is reported as good rather than a warning.
const GOOD_CONFIDENCE: f32 = 0.6;

// ─────────────────────────────────────────────────────────────────────────────
// Control surface
// ─────────────────────────────────────────────────────────────────────────────

/// Commands accepted by a running [`PoseLoop`].
pub enum PoseCommand {
    /// Forget the smoothed pose and history; return to Lost.
    Reset,
    /// Dispose the current detector and adopt this one. `None` disables
    /// tracking.
    ReplaceDetector(Option<Box<dyn Detector>>),
}

impl fmt::Debug for PoseCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoseCommand::Reset => write!(f, "Reset"),
            PoseCommand::ReplaceDetector(Some(d)) => write!(f, "ReplaceDetector({})", d.name()),
            PoseCommand::ReplaceDetector(None) => write!(f, "ReplaceDetector(off)"),
        }
    }
}

/// Sending half of a pose loop's command and calibration channels.
#[derive(Debug, Clone)]
pub struct PoseControl {
    commands: mpsc::Sender<PoseCommand>,
    calibration: Arc<watch::Sender<Calibration>>,
}

impl PoseControl {
    /// # Errors
    ///
    /// [`PoseError::Channel`] once the pose loop has exited.
    pub async fn send(&self, command: PoseCommand) -> Result<(), PoseError> {
        self.commands
            .send(command)
            .await
            .map_err(|e| PoseError::Channel(format!("pose loop gone: {e}")))
    }

    pub async fn reset(&self) -> Result<(), PoseError> {
        self.send(PoseCommand::Reset).await
    }

    pub async fn replace_detector(
        &self,
        detector: Option<Box<dyn Detector>>,
    ) -> Result<(), PoseError> {
        self.send(PoseCommand::ReplaceDetector(detector)).await
    }

    /// Publish new calibration values; picked up at the start of the next
    /// tick.
    pub fn set_calibration(&self, calibration: Calibration) {
        self.calibration.send_replace(calibration.sanitized());
    }

    pub fn calibration(&self) -> Calibration {
        *self.calibration.borrow()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration bundle for [`PoseLoop`].
#[derive(Debug, Clone)]
pub struct PoseLoopConfig {
    /// Target detection rate. The detector may be slower.
    pub rate_hz: f32,
    pub calibration: Calibration,
    pub constants: FitConstants,
}

impl Default for PoseLoopConfig {
    fn default() -> Self {
        Self {
            rate_hz: 30.0,
            calibration: Calibration::default(),
            constants: FitConstants::default(),
        }
    }
}

/// Outcome of one successful tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tracking: TrackingState,
    /// Sequence number of the snapshot published this tick, if any.
    pub published: Option<u64>,
}

/// What the detector produced this tick, as far as the status line cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Detection {
    /// Usable shoulders were found, whatever their confidence.
    Present,
    Absent,
    Failed,
}

// ─────────────────────────────────────────────────────────────────────────────
// PoseLoop
// ─────────────────────────────────────────────────────────────────────────────

pub struct PoseLoop {
    detector: Option<Box<dyn Detector>>,
    source: Box<dyn FrameSource>,
    scene: Arc<dyn Scene>,
    extractor: PoseMetricsExtractor,
    tracker: TrackingStateMachine,
    applier: TransformApplier,
    history: PoseHistory,
    publisher: TransformPublisher,
    status: StatusBus,
    commands: mpsc::Receiver<PoseCommand>,
    calibration_rx: watch::Receiver<Calibration>,
    calibration: Calibration,
    period: Duration,
    epoch: Instant,
    last_status: Option<(StatusLevel, String)>,
}

impl PoseLoop {
    /// Build a pose loop and the control handle that steers it.
    pub fn new(
        config: PoseLoopConfig,
        detector: Option<Box<dyn Detector>>,
        source: Box<dyn FrameSource>,
        scene: Arc<dyn Scene>,
        publisher: TransformPublisher,
        status: StatusBus,
    ) -> (Self, PoseControl) {
        let calibration = config.calibration.sanitized();
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (cal_tx, cal_rx) = watch::channel(calibration);

        let pose_loop = Self {
            detector,
            source,
            scene,
            extractor: PoseMetricsExtractor::new(config.constants),
            tracker: TrackingStateMachine::with_constants(&calibration, &config.constants),
            applier: TransformApplier::new(config.constants),
            history: PoseHistory::new(config.constants.history_capacity),
            publisher,
            status,
            commands: cmd_rx,
            calibration_rx: cal_rx,
            calibration,
            period: tick_period(config.rate_hz, PoseLoopConfig::default().rate_hz),
            epoch: Instant::now(),
            last_status: None,
        };
        let control = PoseControl {
            commands: cmd_tx,
            calibration: Arc::new(cal_tx),
        };
        (pose_loop, control)
    }

    /// Run until `stop` is latched, then dispose the detector. Returns the
    /// number of ticks executed.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_ms = self.period.as_millis() as u64, "pose loop started");
        self.announce_detector();

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = stopped(&mut stop) => break,
                _ = interval.tick() => {}
            }
            // Re-check: a stop may have landed while the tick was pending.
            if *stop.borrow() {
                break;
            }
            ticks += 1;
            match self.tick().await {
                Ok(report) => debug!(
                    phase = %report.tracking.phase,
                    published = ?report.published,
                    "pose tick"
                ),
                Err(PoseError::ResourceUnavailable(what)) => {
                    debug!(%what, "pose loop waiting for resources");
                }
                Err(e) => warn!(error = %e, "pose tick skipped"),
            }
        }

        self.shutdown().await;
        info!(ticks, "pose loop stopped");
        ticks
    }

    /// Execute one tick.
    ///
    /// # Errors
    ///
    /// [`PoseError::ResourceUnavailable`] while a collaborator is not ready.
    /// [`PoseError::DegenerateGeometry`] when the fit could not be computed;
    /// the published transform is left as it was.
    pub async fn tick(&mut self) -> Result<TickReport, PoseError> {
        self.drain_commands().await;
        self.refresh_calibration();

        let Some(detector) = self.detector.as_mut() else {
            self.report(StatusLevel::Warning, "Tracking disabled".to_string());
            return Err(PoseError::ResourceUnavailable("no detector".to_string()));
        };
        let frame_size = self
            .source
            .frame_size()
            .filter(|size| !size.is_empty())
            .ok_or_else(|| PoseError::ResourceUnavailable("video metadata".to_string()))?;
        let camera = self
            .scene
            .camera()
            .ok_or_else(|| PoseError::ResourceUnavailable("camera".to_string()))?;
        let model_size = self
            .scene
            .model_size()
            .ok_or_else(|| PoseError::ResourceUnavailable("garment model".to_string()))?;
        let frame = self
            .source
            .current_frame()
            .ok_or_else(|| PoseError::ResourceUnavailable("video frame".to_string()))?;

        let (keypoints, detector_failed) = match detector.estimate(&frame).await {
            Ok(keypoints) => (keypoints, false),
            Err(e) => {
                warn!(detector = %detector.name(), error = %e, "detector failed; treating as no detection");
                (Vec::new(), true)
            }
        };

        let pose = PoseFrame::new(keypoints);
        let raw = self
            .extractor
            .extract(&pose, frame_size, self.calibration.depth_offset);
        let decision = self.tracker.step(raw.as_ref());

        let ctx = FitContext {
            calibration: &self.calibration,
            model_size,
            camera: camera.as_ref(),
            frame: frame_size,
            time_s: self.epoch.elapsed().as_secs_f32(),
        };
        let fitted = match decision {
            TrackingDecision::Apply(smoothed) => self.applier.apply(&smoothed, &ctx).map(|t| {
                self.history.push(smoothed);
                Some(t)
            }),
            TrackingDecision::Hold(last) => self.applier.apply(&last, &ctx).map(Some),
            TrackingDecision::Fade => Ok(self.applier.fade()),
        };

        let tracking = self.tracker.state();
        let detection = if detector_failed {
            Detection::Failed
        } else if raw.is_some() {
            Detection::Present
        } else {
            Detection::Absent
        };
        self.report_tracking(tracking, detection);

        let published = fitted?.map(|t| self.publisher.publish(t));
        Ok(TickReport {
            tracking,
            published,
        })
    }

    pub fn tracking(&self) -> TrackingState {
        self.tracker.state()
    }

    pub fn history(&self) -> &PoseHistory {
        &self.history
    }

    async fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            info!(?command, "pose command");
            match command {
                PoseCommand::Reset => {
                    self.tracker.reset();
                    self.history.clear();
                }
                PoseCommand::ReplaceDetector(next) => {
                    if let Some(mut old) = self.detector.take() {
                        old.dispose().await;
                        info!(detector = %old.name(), "detector disposed");
                    }
                    self.detector = next;
                    self.tracker.reset();
                    self.history.clear();
                    self.announce_detector();
                }
            }
        }
    }

    fn refresh_calibration(&mut self) {
        if self.calibration_rx.has_changed().unwrap_or(false) {
            self.calibration = self.calibration_rx.borrow_and_update().sanitized();
            self.tracker.configure(&self.calibration);
            debug!(calibration = ?self.calibration, "calibration updated");
        }
    }

    fn announce_detector(&mut self) {
        match self.detector.as_ref().map(|d| d.name().to_string()) {
            Some(name) => {
                info!(detector = %name, "pose detector ready");
                self.report(StatusLevel::Good, "Pose detector ready".to_string());
            }
            None => {
                info!("tracking disabled");
                self.report(StatusLevel::Warning, "Tracking disabled".to_string());
            }
        }
    }

    fn report_tracking(&mut self, tracking: TrackingState, detection: Detection) {
        let (level, message) = match tracking.phase {
            TrackingPhase::Tracking => {
                let level = if tracking.confidence > GOOD_CONFIDENCE {
                    StatusLevel::Good
                } else {
                    StatusLevel::Warning
                };
                let percent = (tracking.confidence * 100.0).round() as u32;
                (level, format!("Tracking ({percent}% confidence)"))
            }
            TrackingPhase::Degraded => (
                StatusLevel::Warning,
                "Poor tracking - adjust position".to_string(),
            ),
            // A weak detection whose held confidence ran out still has a
            // person in view.
            TrackingPhase::Lost if detection == Detection::Present => (
                StatusLevel::Warning,
                "Poor tracking - adjust position".to_string(),
            ),
            TrackingPhase::Lost if detection == Detection::Failed => {
                (StatusLevel::Error, "Tracking error".to_string())
            }
            TrackingPhase::Lost => (
                StatusLevel::Error,
                "No pose detected - step into view".to_string(),
            ),
        };
        self.report(level, message);
    }

    /// Publish a status event if it differs from the last one shown.
    fn report(&mut self, level: StatusLevel, message: String) {
        let unchanged = self
            .last_status
            .as_ref()
            .is_some_and(|(l, m)| *l == level && *m == message);
        if unchanged {
            return;
        }
        let event = StatusEvent::new(STATUS_SOURCE, level, message.clone(), self.tracker.state());
        // Nobody listening is fine.
        let _ = self.status.publish(event);
        self.last_status = Some((level, message));
    }

    async fn shutdown(&mut self) {
        if let Some(mut detector) = self.detector.take() {
            detector.dispose().await;
            info!(detector = %detector.name(), "detector disposed");
        }
    }
}
