//! `posefit-perception` – geometry and filtering.
//!
//! Turns noisy 2-D keypoints into stable, camera-consistent measurements of
//! the detected torso.
//!
//! # Modules
//!
//! - [`constants`] – [`FitConstants`][constants::FitConstants]: every
//!   empirical tuning constant of the fitting pipeline in one place.
//! - [`metrics`] – [`PoseMetricsExtractor`][metrics::PoseMetricsExtractor]:
//!   shoulder width, torso height, shoulder angle and anchor point from a
//!   [`PoseFrame`][posefit_types::PoseFrame].
//! - [`depth`] – [`DepthEstimator`][depth::DepthEstimator]: monocular depth
//!   from apparent shoulder width.
//! - [`projection`] – [`Camera`][projection::Camera] seam plus
//!   [`PerspectiveCamera`][projection::PerspectiveCamera] and the pixel/world
//!   coordinate mapper.
//! - [`smoothing`] – [`TemporalSmoother`][smoothing::TemporalSmoother]:
//!   per-field exponential smoothing with circular angle handling.
//! - [`angle`] – wrap-around helpers shared by the modules above.

pub mod angle;
pub mod constants;
pub mod depth;
pub mod metrics;
pub mod projection;
pub mod smoothing;
