//! `posefit-middleware` – the hand-off between the loops
//!
//! Moves state between the pose loop and its consumers without either side
//! caring about the other's timing.
//!
//! # Modules
//!
//! - [`publication`] – single-writer [`ObjectTransform`][posefit_types::ObjectTransform]
//!   double buffer built on [`tokio::sync::watch`]: the pose loop swaps whole
//!   snapshots in, the render loop copies the latest one out.
//! - [`status`] – broadcast bus carrying
//!   [`StatusEvent`][posefit_types::StatusEvent]s to the status indicator.

pub mod publication;
pub mod status;

pub use publication::{TransformPublisher, TransformReader, TransformSnapshot, transform_channel};
pub use status::{StatusBus, StatusSubscriber};
