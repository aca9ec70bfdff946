//! [`TrackingStateMachine`] – per-tick tracking quality regulation.
//!
//! ```text
//!                 confidence > min
//!     ┌──────────────────────────────────────────┐
//!     ▼                                          │
//! Tracking ──confidence ≤ min──▶ Degraded ──held confidence ≤ floor──▶ Lost
//!     ▲                              │                                  │
//!     └────────confidence > min──────┘◀─────────────────────────────────┘
//! ```
//!
//! Each call to [`TrackingStateMachine::step`] returns the decision the
//! runtime must carry out:
//!
//! - [`TrackingDecision::Apply`] – fit the overlay to the smoothed metrics.
//! - [`TrackingDecision::Hold`] – re-fit to the last smoothed metrics (frozen
//!   extrapolation) while the held confidence decays.
//! - [`TrackingDecision::Fade`] – no usable pose; shrink the overlay.

use posefit_perception::constants::FitConstants;
use posefit_perception::smoothing::TemporalSmoother;
use posefit_types::{Calibration, PoseMetrics, TrackingPhase, TrackingState};
use tracing::{debug, info};

/// What the runtime should do with the overlay this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingDecision {
    Apply(PoseMetrics),
    Hold(PoseMetrics),
    Fade,
}

/// Classifies detections and owns the temporal smoother.
///
/// # Example
///
/// ```
/// use posefit_kernel::tracking::{TrackingDecision, TrackingStateMachine};
/// use posefit_types::{Calibration, PoseMetrics, TrackingPhase};
///
/// let mut sm = TrackingStateMachine::new(&Calibration::default());
/// assert!(matches!(sm.step(None), TrackingDecision::Fade));
///
/// let m = PoseMetrics {
///     shoulder_width_px: 200.0, torso_height_px: 215.0, shoulder_angle_rad: 0.0,
///     center_x: 200.0, center_y: 185.0, confidence: 0.85, depth: 1.3,
/// };
/// assert!(matches!(sm.step(Some(&m)), TrackingDecision::Apply(_)));
/// assert_eq!(sm.state().phase, TrackingPhase::Tracking);
/// ```
#[derive(Debug, Clone)]
pub struct TrackingStateMachine {
    smoother: TemporalSmoother,
    min_confidence: f32,
    hold_decay: f32,
    hold_floor: f32,
    state: TrackingState,
}

impl TrackingStateMachine {
    pub fn new(calibration: &Calibration) -> Self {
        Self::with_constants(calibration, &FitConstants::default())
    }

    pub fn with_constants(calibration: &Calibration, constants: &FitConstants) -> Self {
        let calibration = calibration.sanitized();
        Self {
            smoother: TemporalSmoother::with_constants(calibration.smoothing_factor, constants),
            min_confidence: calibration.min_confidence,
            hold_decay: constants.hold_decay,
            hold_floor: constants.hold_floor,
            state: TrackingState::default(),
        }
    }

    /// Adopt new calibration values. The smoothed state is kept.
    pub fn configure(&mut self, calibration: &Calibration) {
        let calibration = calibration.sanitized();
        self.smoother
            .set_smoothing_factor(calibration.smoothing_factor);
        self.min_confidence = calibration.min_confidence;
    }

    /// Advance one tick with the raw metrics extracted from the latest frame
    /// (`None` when nothing usable was detected).
    pub fn step(&mut self, metrics: Option<&PoseMetrics>) -> TrackingDecision {
        let (next, decision) = match metrics {
            Some(raw) if raw.confidence > self.min_confidence => {
                let smoothed = self.smoother.update(raw);
                (
                    TrackingState {
                        phase: TrackingPhase::Tracking,
                        confidence: raw.confidence,
                    },
                    TrackingDecision::Apply(smoothed),
                )
            }
            Some(_) => self.hold(),
            None => (
                TrackingState {
                    phase: TrackingPhase::Lost,
                    confidence: 0.0,
                },
                TrackingDecision::Fade,
            ),
        };

        if next.phase != self.state.phase {
            info!(
                from = %self.state.phase,
                to = %next.phase,
                confidence = next.confidence,
                "tracking phase transition"
            );
        } else {
            debug!(phase = %next.phase, confidence = next.confidence, "tracking tick");
        }
        self.state = next;
        decision
    }

    fn hold(&mut self) -> (TrackingState, TrackingDecision) {
        match self.smoother.decay_confidence(self.hold_decay) {
            Some(held) if held > self.hold_floor => {
                let last = self.smoother.current().copied();
                match last {
                    Some(last) => (
                        TrackingState {
                            phase: TrackingPhase::Degraded,
                            confidence: held,
                        },
                        TrackingDecision::Hold(last),
                    ),
                    None => lost(held),
                }
            }
            Some(held) => lost(held),
            None => lost(0.0),
        }
    }

    /// Explicit session reset: forget the smoothed pose and return to Lost.
    pub fn reset(&mut self) {
        self.smoother.reset();
        if self.state.phase != TrackingPhase::Lost {
            info!(from = %self.state.phase, "tracking reset");
        }
        self.state = TrackingState::default();
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn smoothed(&self) -> Option<&PoseMetrics> {
        self.smoother.current()
    }
}

fn lost(confidence: f32) -> (TrackingState, TrackingDecision) {
    (
        TrackingState {
            phase: TrackingPhase::Lost,
            confidence,
        },
        TrackingDecision::Fade,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(confidence: f32) -> PoseMetrics {
        PoseMetrics {
            shoulder_width_px: 200.0,
            torso_height_px: 215.0,
            shoulder_angle_rad: 0.0,
            center_x: 200.0,
            center_y: 185.0,
            confidence,
            depth: 1.3,
        }
    }

    fn machine() -> TrackingStateMachine {
        TrackingStateMachine::new(&Calibration::default())
    }

    #[test]
    fn starts_lost() {
        let sm = machine();
        assert_eq!(sm.state().phase, TrackingPhase::Lost);
        assert!(sm.smoothed().is_none());
    }

    #[test]
    fn confident_frames_enter_tracking() {
        let mut sm = machine();
        for _ in 0..3 {
            assert!(matches!(sm.step(Some(&metrics(0.85))), TrackingDecision::Apply(_)));
        }
        let state = sm.state();
        assert_eq!(state.phase, TrackingPhase::Tracking);
        assert!((state.confidence - 0.85).abs() < 1e-6);
    }

    #[test]
    fn lost_to_tracking_takes_one_frame() {
        let mut sm = machine();
        sm.step(None);
        sm.step(Some(&metrics(0.9)));
        assert_eq!(sm.state().phase, TrackingPhase::Tracking);
    }

    #[test]
    fn no_detection_fades() {
        let mut sm = machine();
        sm.step(Some(&metrics(0.85)));
        assert_eq!(sm.step(None), TrackingDecision::Fade);
        assert_eq!(sm.state().phase, TrackingPhase::Lost);
        // Smoothed state survives a lost tick.
        assert!(sm.smoothed().is_some());
    }

    #[test]
    fn confidence_at_threshold_is_degraded() {
        let mut sm = machine();
        sm.step(Some(&metrics(0.85)));
        assert!(matches!(sm.step(Some(&metrics(0.4))), TrackingDecision::Hold(_)));
        assert_eq!(sm.state().phase, TrackingPhase::Degraded);
    }

    #[test]
    fn degraded_holds_last_smoothed_and_decays() {
        let mut sm = machine();
        let tracked = match sm.step(Some(&metrics(0.85))) {
            TrackingDecision::Apply(m) => m,
            other => panic!("expected Apply, got {other:?}"),
        };

        let mut holds = 0;
        let mut last_confidence = 1.0;
        loop {
            match sm.step(Some(&metrics(0.2))) {
                TrackingDecision::Hold(m) => {
                    assert_eq!(m.center_x, tracked.center_x);
                    let c = sm.state().confidence;
                    assert!(c < last_confidence);
                    last_confidence = c;
                    holds += 1;
                }
                TrackingDecision::Fade => break,
                TrackingDecision::Apply(_) => panic!("low confidence must not apply"),
            }
            assert!(holds < 100, "hold never expired");
        }
        // 0.85 × 0.95ⁿ stays above 0.3 for 20 ticks.
        assert_eq!(holds, 20);
        assert_eq!(sm.state().phase, TrackingPhase::Lost);
    }

    #[test]
    fn degraded_without_history_is_lost() {
        let mut sm = machine();
        assert_eq!(sm.step(Some(&metrics(0.1))), TrackingDecision::Fade);
        assert_eq!(sm.state().phase, TrackingPhase::Lost);
    }

    #[test]
    fn recovers_from_degraded() {
        let mut sm = machine();
        sm.step(Some(&metrics(0.85)));
        sm.step(Some(&metrics(0.2)));
        assert!(matches!(sm.step(Some(&metrics(0.8))), TrackingDecision::Apply(_)));
        assert_eq!(sm.state().phase, TrackingPhase::Tracking);
    }

    #[test]
    fn reset_clears_smoother() {
        let mut sm = machine();
        sm.step(Some(&metrics(0.85)));
        sm.reset();
        assert_eq!(sm.state(), TrackingState::default());
        assert!(sm.smoothed().is_none());
    }

    #[test]
    fn configure_changes_threshold() {
        let mut sm = machine();
        sm.configure(&Calibration {
            min_confidence: 0.9,
            ..Calibration::default()
        });
        sm.step(Some(&metrics(0.85)));
        assert_eq!(sm.state().phase, TrackingPhase::Lost);
    }
}
