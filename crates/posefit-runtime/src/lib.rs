//! `posefit-runtime` – the two concurrent loops and their wiring.
//!
//! # Modules
//!
//! - [`pose_loop`] – [`PoseLoop`][pose_loop::PoseLoop]: detect, measure,
//!   regulate, fit and publish, once per detection tick.
//! - [`render_loop`] – [`RenderLoop`][render_loop::RenderLoop]: draws the
//!   latest published transform at display rate, never waiting on detection.
//! - [`fit`] – [`TransformApplier`][fit::TransformApplier]: maps smoothed
//!   metrics to a world-space transform with easing, idle bob and fade.
//! - [`history`] – [`PoseHistory`][history::PoseHistory]: bounded ring of the
//!   most recent applied poses.
//! - [`lifecycle`] – [`StopSignal`][lifecycle::StopSignal] and
//!   [`LoopHandle`][lifecycle::LoopHandle]: idempotent stop and task joins.
//! - [`session`] – [`Session`][session::Session]: spawns both loops around one
//!   transform channel and one stop latch.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: `tracing`
//!   subscriber with an optional OTLP span exporter.
//!
//! # Ownership
//!
//! The pose loop holds the only
//! [`TransformPublisher`][posefit_middleware::TransformPublisher]; the render
//! loop only ever holds a reader, so it never observes a half-written
//! transform.

pub mod fit;
pub mod history;
pub mod lifecycle;
pub mod pose_loop;
pub mod render_loop;
pub mod session;
pub mod telemetry;

pub use fit::{FitContext, TransformApplier};
pub use lifecycle::{LoopHandle, StopSignal};
pub use pose_loop::{PoseCommand, PoseControl, PoseLoop, PoseLoopConfig, TickReport};
pub use render_loop::RenderLoop;
pub use session::{Session, SessionConfig, SessionParts, SessionSummary};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
