//! `posefit-kernel` – Tracking regulation
//!
//! Decides, frame by frame, how much the latest detection should be trusted.
//! It does not fit anything; it gates what reaches the fitter.
//!
//! # Modules
//!
//! - [`tracking`] – [`TrackingStateMachine`][tracking::TrackingStateMachine]:
//!   classifies each tick as Tracking, Degraded or Lost, owns the
//!   [`TemporalSmoother`][posefit_perception::smoothing::TemporalSmoother] and
//!   returns the [`TrackingDecision`][tracking::TrackingDecision] the runtime
//!   must carry out.

pub mod tracking;

pub use tracking::{TrackingDecision, TrackingStateMachine};
